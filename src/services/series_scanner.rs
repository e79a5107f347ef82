// src/services/series_scanner.rs
//
// Batch Scanner and Implicit Series Grouper
//
// CRITICAL RULES:
// - Books are processed strictly one at a time, with a fixed pause between
//   them to respect catalog rate limits
// - One book's failure never aborts the scan
// - The grouper is advisory: it reads, it never writes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::config::ScanSettings;
use crate::domain::Book;
use crate::error::AppResult;
use crate::events::{EventBus, SeriesScanCompleted};
use crate::repositories::BookRepository;
use crate::services::series_registry::SeriesRegistry;

const LEADING_ARTICLES: &[&str] = &["the", "a", "an"];
const MAX_PREFIX_WORDS: usize = 3;

// ============================================================================
// SCAN TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanItemStatus {
    /// Gate passed, membership written
    Linked,

    /// Something was detected, but not enough to link
    Skipped,

    /// Nothing detected, or the book errored
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanItemOutcome {
    pub book_id: Uuid,
    pub title: String,
    pub status: ScanItemStatus,
    pub series_name: Option<String>,
    pub confidence: f64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scanned: usize,
    pub linked: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub items: Vec<ScanItemOutcome>,
}

impl ScanSummary {
    fn record(&mut self, item: ScanItemOutcome) {
        self.scanned += 1;
        match item.status {
            ScanItemStatus::Linked => self.linked += 1,
            ScanItemStatus::Skipped => self.skipped += 1,
            ScanItemStatus::Failed => self.failed += 1,
        }
        self.items.push(item);
    }
}

/// A group of an author's unlinked books sharing a leading title prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplicitSeriesSuggestion {
    pub series_name: String,
    pub book_count: usize,
    pub book_ids: Vec<Uuid>,
    pub titles: Vec<String>,
}

// ============================================================================
// SERIES SCANNER
// ============================================================================

pub struct SeriesScanner {
    book_repo: Arc<dyn BookRepository>,
    registry: Arc<SeriesRegistry>,
    event_bus: Arc<EventBus>,
    delay: Duration,
}

impl SeriesScanner {
    pub fn new(
        book_repo: Arc<dyn BookRepository>,
        registry: Arc<SeriesRegistry>,
        event_bus: Arc<EventBus>,
        settings: &ScanSettings,
    ) -> Self {
        Self {
            book_repo,
            registry,
            event_bus,
            delay: Duration::from_millis(settings.delay_ms),
        }
    }

    /// Resolve and link every book that has no series yet
    pub async fn scan_all_books_for_series(
        &self,
        use_ai: bool,
        min_confidence: f64,
    ) -> AppResult<ScanSummary> {
        let start_time = Instant::now();
        let books = self.book_repo.list_unlinked()?;
        let total = books.len();

        log::info!("Series scan started: {} unlinked book(s)", total);

        let mut summary = ScanSummary::default();

        for (index, book) in books.iter().enumerate() {
            let item = self.scan_book(book, use_ai, min_confidence).await;
            log::debug!(
                "[{}/{}] '{}' -> {:?}",
                index + 1,
                total,
                book.title,
                item.status
            );
            summary.record(item);

            if index + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        log::info!(
            "Series scan finished: {} scanned, {} linked, {} skipped, {} failed in {} ms",
            summary.scanned,
            summary.linked,
            summary.skipped,
            summary.failed,
            summary.duration_ms
        );

        self.event_bus.emit(SeriesScanCompleted::new(
            summary.scanned,
            summary.linked,
            summary.failed,
            summary.skipped,
            summary.duration_ms,
        ));

        Ok(summary)
    }

    async fn scan_book(&self, book: &Book, use_ai: bool, min_confidence: f64) -> ScanItemOutcome {
        let result = self
            .registry
            .auto_detect_and_link_series(
                book.id,
                &book.title,
                &book.author,
                book.isbn.as_deref(),
                use_ai,
                min_confidence,
            )
            .await;

        match result {
            Ok(outcome) => {
                let status = if outcome.success {
                    ScanItemStatus::Linked
                } else if outcome.detection.confidence.is_zero() {
                    ScanItemStatus::Failed
                } else {
                    ScanItemStatus::Skipped
                };

                ScanItemOutcome {
                    book_id: book.id,
                    title: book.title.clone(),
                    status,
                    series_name: outcome.series_name.or(outcome.detection.series_name.clone()),
                    confidence: outcome.detection.score(),
                    error: None,
                }
            }
            Err(e) => {
                log::warn!("Series scan failed for '{}' ({}): {}", book.title, book.id, e);
                ScanItemOutcome {
                    book_id: book.id,
                    title: book.title.clone(),
                    status: ScanItemStatus::Failed,
                    series_name: None,
                    confidence: 0.0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    // ========================================================================
    // IMPLICIT GROUPING
    // ========================================================================

    /// Groups an author's unlinked books by shared 1..=3 word title prefixes
    pub fn detect_implicit_series_by_author(
        &self,
        author: &str,
        min_books: usize,
    ) -> AppResult<Vec<ImplicitSeriesSuggestion>> {
        let books = self.book_repo.list_unlinked_by_author(author)?;
        Ok(group_by_title_prefix(&books, min_books.max(1)))
    }
}

// ============================================================================
// PREFIX GROUPING
// ============================================================================

struct PrefixGroup {
    display: String,
    word_count: usize,
    members: Vec<usize>,
}

fn title_words(title: &str) -> Vec<String> {
    title
        .split_whitespace()
        .map(|w| w.trim_end_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Candidate prefixes of one title: leading 1..=3 words, excluding a lone
/// leading article and the whole title itself
fn candidate_prefixes(title: &str) -> Vec<(String, usize)> {
    let words = title_words(title);
    let longest = MAX_PREFIX_WORDS.min(words.len().saturating_sub(1));

    (1..=longest)
        .filter(|&n| !(n == 1 && LEADING_ARTICLES.contains(&words[0].to_lowercase().as_str())))
        .map(|n| (words[..n].join(" "), n))
        .collect()
}

fn group_by_title_prefix(books: &[Book], min_books: usize) -> Vec<ImplicitSeriesSuggestion> {
    let mut groups: BTreeMap<String, PrefixGroup> = BTreeMap::new();

    for (index, book) in books.iter().enumerate() {
        for (prefix, word_count) in candidate_prefixes(&book.title) {
            let group = groups
                .entry(prefix.to_lowercase())
                .or_insert_with(|| PrefixGroup {
                    display: prefix.clone(),
                    word_count,
                    members: Vec::new(),
                });
            if !group.members.contains(&index) {
                group.members.push(index);
            }
        }
    }

    let qualifying: Vec<&PrefixGroup> = groups
        .values()
        .filter(|g| g.members.len() >= min_books)
        .collect();

    // A shorter prefix covering exactly the same books as a longer one adds nothing
    let mut suggestions: Vec<ImplicitSeriesSuggestion> = qualifying
        .iter()
        .filter(|g| {
            !qualifying
                .iter()
                .any(|other| other.word_count > g.word_count && other.members == g.members)
        })
        .map(|g| ImplicitSeriesSuggestion {
            series_name: g.display.clone(),
            book_count: g.members.len(),
            book_ids: g.members.iter().map(|&i| books[i].id).collect(),
            titles: g.members.iter().map(|&i| books[i].title.clone()).collect(),
        })
        .collect();

    suggestions.sort_by(|a, b| {
        b.book_count
            .cmp(&a.book_count)
            .then_with(|| a.series_name.to_lowercase().cmp(&b.series_name.to_lowercase()))
    });

    suggestions
}
