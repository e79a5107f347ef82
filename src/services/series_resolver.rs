// src/services/series_resolver.rs
//
// Resolution Orchestrator
//
// Cheapest and most deterministic signal first, costlier signals only when
// the held result is not already good enough.
//
// CRITICAL RULES:
// - Parser -> Catalog A -> Catalog B -> AI (optional), in that order
// - A later result replaces the held one only if strictly more confident
// - Stop as soon as the held result reaches the short-circuit threshold
// - Holds no per-call state; safe to share across tasks

use std::sync::Arc;

use crate::config::{EngineConfig, ResolverThresholds};
use crate::domain::{BookQuery, DetectionResult};
use crate::error::AppResult;
use crate::integrations::{GoogleBooksClient, OpenAiCompatibleClient, OpenLibraryClient};
use crate::services::lookup::{AiSeriesLookup, GoogleBooksLookup, OpenLibraryLookup, SeriesLookup};
use crate::services::title_patterns::parse_title;

pub struct SeriesResolver {
    /// Catalog adapters in cascade order
    catalogs: Vec<Arc<dyn SeriesLookup>>,
    ai: Option<Arc<dyn SeriesLookup>>,
    short_circuit: f64,
}

impl SeriesResolver {
    pub fn new(
        catalogs: Vec<Arc<dyn SeriesLookup>>,
        ai: Option<Arc<dyn SeriesLookup>>,
        thresholds: ResolverThresholds,
    ) -> Self {
        Self {
            catalogs,
            ai,
            short_circuit: thresholds.short_circuit,
        }
    }

    /// Title parser only
    pub fn pattern_only(thresholds: ResolverThresholds) -> Self {
        Self::new(Vec::new(), None, thresholds)
    }

    /// Catalog A and Catalog B over HTTP; the AI adapter only when an API key is configured
    pub fn from_config(config: &EngineConfig) -> AppResult<Self> {
        let catalogs: Vec<Arc<dyn SeriesLookup>> = vec![
            Arc::new(GoogleBooksLookup::new(GoogleBooksClient::new(&config.google_books)?)),
            Arc::new(OpenLibraryLookup::new(OpenLibraryClient::new(&config.open_library)?)),
        ];

        let ai: Option<Arc<dyn SeriesLookup>> = if config.llm.is_enabled() {
            let generator = Arc::new(OpenAiCompatibleClient::new(&config.llm)?);
            Some(Arc::new(AiSeriesLookup::new(
                generator,
                config.thresholds.ai_min_confidence,
            )))
        } else {
            log::info!("No LLM api key configured; AI series lookup disabled");
            None
        };

        Ok(Self::new(catalogs, ai, config.thresholds))
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    pub async fn resolve_comprehensive(
        &self,
        title: &str,
        author: &str,
        isbn: Option<&str>,
        use_ai: bool,
    ) -> DetectionResult {
        self.resolve(&BookQuery::new(title, author, isbn), use_ai).await
    }

    pub async fn resolve(&self, query: &BookQuery, use_ai: bool) -> DetectionResult {
        let mut best = parse_title(&query.title);
        if self.is_conclusive(&best) {
            log::debug!("'{}' resolved by title pattern ({})", query.title, best.confidence);
            return best;
        }

        for lookup in &self.catalogs {
            let candidate = lookup.resolve(query).await;
            best = Self::keep_better(best, candidate);

            if self.is_conclusive(&best) {
                log::debug!("'{}' resolved by {} ({})", query.title, best.detection_method, best.confidence);
                return best;
            }
        }

        if use_ai {
            if let Some(ai) = &self.ai {
                let candidate = ai.resolve(query).await;
                best = Self::keep_better(best, candidate);
            }
        }

        log::debug!(
            "'{}' cascade finished: {} ({})",
            query.title,
            best.detection_method,
            best.confidence
        );
        best
    }

    fn is_conclusive(&self, result: &DetectionResult) -> bool {
        result.confidence.meets(self.short_circuit)
    }

    /// Ties keep the held result
    fn keep_better(held: DetectionResult, candidate: DetectionResult) -> DetectionResult {
        if candidate.confidence > held.confidence {
            candidate
        } else {
            held
        }
    }
}
