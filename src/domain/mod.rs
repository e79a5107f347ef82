// src/domain/mod.rs
//
// Domain Root - The Single Source of Truth for Domain API
//
// All other modules import from `crate::domain::*`

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod book;
pub mod detection;
pub mod series;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Book (read-only collaborator)
pub use book::Book;

// Detection (value objects, never persisted)
pub use detection::{BookQuery, Confidence, DetectionMethod, DetectionResult};

// Series Domain
pub use series::{
    normalize_series_name, trigram_similarity, validate_membership, validate_series, Series,
    SeriesBook, SeriesMembership, SeriesSummary,
};

// ============================================================================
// DOMAIN ERROR TYPES
// ============================================================================

use thiserror::Error;

/// Domain-level errors
/// These represent violations of business rules and invariants
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Series '{name}' still has {members} linked book(s)")]
    SeriesNotEmpty { name: String, members: u32 },

    #[error("Entity not found: {0}")]
    NotFound(String),
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;
