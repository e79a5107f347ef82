// src/services/series_registry.rs
//
// Series Registry
//
// Owns Series and SeriesMembership persistence: deduplicating
// find-or-create, idempotent linking, guarded deletes, and the
// resolve-then-link entry point used by the scanner.
//
// CRITICAL RULES:
// - Series names are unique up to normalization; races are settled by the
//   UNIQUE name_key constraint, never by locks
// - Near-duplicate names (trigram similarity above the threshold) reuse the
//   existing series
// - A series with members is never deleted
// - Auto-linking gates on confidence and name BEFORE any write
// - Every mutation emits an event

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ResolverThresholds;
use crate::domain::{
    normalize_series_name, trigram_similarity, validate_membership, validate_series,
    DetectionMethod, DetectionResult, DomainError, Series, SeriesBook, SeriesMembership,
    SeriesSummary,
};
use crate::error::AppResult;
use crate::events::{
    BookLinkedToSeries, BookUnlinkedFromSeries, EventBus, SeriesCoalesced, SeriesCreated,
    SeriesDeleted, SeriesMerged,
};
use crate::repositories::SeriesRepository;
use crate::services::series_resolver::SeriesResolver;

// ============================================================================
// LINK OUTCOME
// ============================================================================

/// Result of one resolve-then-link attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub success: bool,
    pub series_id: Option<Uuid>,
    pub series_name: Option<String>,
    pub detection: DetectionResult,
}

impl LinkOutcome {
    fn linked(series_id: Uuid, series_name: String, detection: DetectionResult) -> Self {
        Self {
            success: true,
            series_id: Some(series_id),
            series_name: Some(series_name),
            detection,
        }
    }

    fn not_linked(detection: DetectionResult) -> Self {
        Self {
            success: false,
            series_id: None,
            series_name: None,
            detection,
        }
    }
}

// ============================================================================
// SERIES REGISTRY
// ============================================================================

pub struct SeriesRegistry {
    series_repo: Arc<dyn SeriesRepository>,
    resolver: Arc<SeriesResolver>,
    event_bus: Arc<EventBus>,
    fuzzy_similarity: f64,
}

impl SeriesRegistry {
    pub fn new(
        series_repo: Arc<dyn SeriesRepository>,
        resolver: Arc<SeriesResolver>,
        event_bus: Arc<EventBus>,
        thresholds: ResolverThresholds,
    ) -> Self {
        Self {
            series_repo,
            resolver,
            event_bus,
            fuzzy_similarity: thresholds.fuzzy_similarity,
        }
    }

    // ========================================================================
    // FIND OR CREATE
    // ========================================================================

    /// Exact (normalized) match, then best fuzzy match above the threshold,
    /// then insert
    pub fn find_or_create_series(&self, name: &str) -> AppResult<Uuid> {
        let candidate = Series::new(name);
        validate_series(&candidate)?;

        if let Some(existing) = self.series_repo.find_by_name_key(&candidate.name_key())? {
            return Ok(existing.id);
        }

        if let Some((similarity, existing)) = self.closest_existing(&candidate.name)? {
            log::info!(
                "Series '{}' coalesced into existing '{}' (similarity {:.3})",
                candidate.name,
                existing.name,
                similarity
            );
            self.event_bus.emit(SeriesCoalesced::new(
                existing.id,
                existing.name.clone(),
                candidate.name.clone(),
                similarity,
            ));
            return Ok(existing.id);
        }

        let (stored, created) = self.series_repo.insert_or_get(&candidate)?;
        if created {
            log::info!("Series '{}' created", stored.name);
            self.event_bus.emit(SeriesCreated::new(stored.id, stored.name.clone()));
        }

        Ok(stored.id)
    }

    /// Most similar existing series strictly above the fuzzy threshold;
    /// the first of equally similar names wins
    fn closest_existing(&self, name: &str) -> AppResult<Option<(f64, Series)>> {
        let mut best: Option<(f64, Series)> = None;

        for series in self.series_repo.list_all()? {
            let similarity = trigram_similarity(&series.name, name);
            if similarity <= self.fuzzy_similarity {
                continue;
            }
            match &best {
                Some((held, _)) if similarity <= *held => {}
                _ => best = Some((similarity, series)),
            }
        }

        Ok(best)
    }

    // ========================================================================
    // MEMBERSHIP
    // ========================================================================

    /// Upsert on (book, series); a second call overwrites position, method
    /// and confidence
    pub fn link_book_to_series(
        &self,
        book_id: Uuid,
        series_id: Uuid,
        position_in_series: Option<f64>,
        detection_method: DetectionMethod,
        confidence: f64,
    ) -> AppResult<()> {
        self.require_series(series_id)?;

        let membership = SeriesMembership::new(
            book_id,
            series_id,
            position_in_series,
            detection_method,
            confidence,
        );
        validate_membership(&membership)?;

        self.series_repo.upsert_membership(&membership)?;

        self.event_bus.emit(BookLinkedToSeries::new(
            book_id,
            series_id,
            membership.position_in_series,
            detection_method.to_string(),
            membership.confidence_score.score(),
        ));

        Ok(())
    }

    /// Removes every membership of the book and deletes series left empty.
    /// Returns the number of memberships removed.
    pub fn unlink_book_from_series(&self, book_id: Uuid) -> AppResult<usize> {
        let affected = self.series_repo.delete_memberships_for_book(book_id)?;
        if affected.is_empty() {
            return Ok(0);
        }

        self.event_bus
            .emit(BookUnlinkedFromSeries::new(book_id, affected.clone()));

        for series_id in &affected {
            let Some(series) = self.series_repo.get_by_id(*series_id)? else {
                continue;
            };
            // Still has members, or another book linked in the meantime
            if !self.series_repo.delete_if_empty(series.id)? {
                continue;
            }
            log::info!("Series '{}' removed after its last book was unlinked", series.name);
            self.event_bus.emit(SeriesDeleted::new(series.id, series.name));
        }

        Ok(affected.len())
    }

    // ========================================================================
    // DELETION
    // ========================================================================

    pub fn delete_series(&self, series_id: Uuid) -> AppResult<()> {
        let series = self.require_series(series_id)?;

        let members = self.series_repo.count_members(series_id)?;
        if members > 0 {
            return Err(DomainError::SeriesNotEmpty {
                name: series.name,
                members,
            }
            .into());
        }

        if !self.series_repo.delete_if_empty(series_id)? {
            // A link landed between the count and the delete, or the row is gone
            self.require_series(series_id)?;
            return Err(DomainError::SeriesNotEmpty {
                name: series.name,
                members: self.series_repo.count_members(series_id)?,
            }
            .into());
        }
        self.event_bus.emit(SeriesDeleted::new(series.id, series.name));

        Ok(())
    }

    /// Case-insensitive name lookup, then the same guard as `delete_series`
    pub fn delete_series_by_name(&self, name: &str) -> AppResult<()> {
        let series = self
            .series_repo
            .find_by_name_key(&normalize_series_name(name))?
            .ok_or_else(|| DomainError::NotFound(format!("Series '{}'", name.trim())))?;

        self.delete_series(series.id)
    }

    // ========================================================================
    // RESOLVE AND LINK
    // ========================================================================

    pub async fn auto_detect_and_link_series(
        &self,
        book_id: Uuid,
        title: &str,
        author: &str,
        isbn: Option<&str>,
        use_ai: bool,
        min_confidence: f64,
    ) -> AppResult<LinkOutcome> {
        let detection = self
            .resolver
            .resolve_comprehensive(title, author, isbn, use_ai)
            .await;

        let series_name = match &detection.series_name {
            Some(name) if detection.confidence.meets(min_confidence) => name.clone(),
            _ => {
                log::debug!(
                    "'{}' not linked: {} at {} (needs {:.2} and a series name)",
                    title,
                    detection.detection_method,
                    detection.confidence,
                    min_confidence
                );
                return Ok(LinkOutcome::not_linked(detection));
            }
        };

        let series_id = self.find_or_create_series(&series_name)?;
        self.link_book_to_series(
            book_id,
            series_id,
            detection.position_in_series,
            detection.detection_method,
            detection.score(),
        )?;

        Ok(LinkOutcome::linked(series_id, series_name, detection))
    }

    // ========================================================================
    // QUERIES AND MAINTENANCE
    // ========================================================================

    pub fn get_series(&self, series_id: Uuid) -> AppResult<Series> {
        self.require_series(series_id)
    }

    /// All series with their member counts, ordered by name
    pub fn list_series(&self) -> AppResult<Vec<SeriesSummary>> {
        self.series_repo.list_summaries()
    }

    /// Books of a series ordered by position, unknown positions last
    pub fn list_series_books(&self, series_id: Uuid) -> AppResult<Vec<SeriesBook>> {
        self.require_series(series_id)?;
        self.series_repo.list_series_books(series_id)
    }

    pub fn update_series_details(
        &self,
        series_id: Uuid,
        description: Option<String>,
        total_books: Option<u32>,
    ) -> AppResult<Series> {
        let mut series = self.require_series(series_id)?;

        series.description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        series.total_books = total_books;
        series.updated_at = chrono::Utc::now();
        validate_series(&series)?;

        self.series_repo.update(&series)?;
        Ok(series)
    }

    /// Moves every membership of `source_id` into `target_id`, then deletes
    /// the emptied source. Returns the number of memberships moved.
    pub fn merge_series(&self, source_id: Uuid, target_id: Uuid) -> AppResult<usize> {
        if source_id == target_id {
            return Err(DomainError::InvariantViolation(
                "Cannot merge a series into itself".to_string(),
            )
            .into());
        }

        let source = self.require_series(source_id)?;
        let target = self.require_series(target_id)?;

        let moved = self.series_repo.reassign_memberships(source.id, target.id)?;
        if !self.series_repo.delete_if_empty(source.id)? {
            log::warn!(
                "Series '{}' kept after merge: books were linked to it during the merge",
                source.name
            );
        }

        log::info!(
            "Series '{}' merged into '{}' ({} membership(s) moved)",
            source.name,
            target.name,
            moved
        );
        self.event_bus
            .emit(SeriesMerged::new(source.id, target.id, moved));

        Ok(moved)
    }

    fn require_series(&self, series_id: Uuid) -> AppResult<Series> {
        self.series_repo
            .get_by_id(series_id)?
            .ok_or_else(|| DomainError::NotFound(format!("Series {}", series_id)).into())
    }
}
