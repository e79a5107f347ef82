use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Book, Confidence, DetectionMethod};

use super::similarity::normalize_series_name;

/// A named, ordered collection of books.
/// Created lazily by the registry; never speculatively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Internal immutable identifier
    pub id: Uuid,

    /// Display name, as first resolved
    pub name: String,

    pub description: Option<String>,

    /// Known length of the series (if any source reported it)
    pub total_books: Option<u32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            description: None,
            total_books: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Key that carries the storage-level uniqueness constraint
    pub fn name_key(&self) -> String {
        normalize_series_name(&self.name)
    }
}

/// Association of one book to one series.
/// At most one per (book_id, series_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMembership {
    pub book_id: Uuid,
    pub series_id: Uuid,
    pub position_in_series: Option<f64>,
    pub detection_method: DetectionMethod,
    pub confidence_score: Confidence,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SeriesMembership {
    pub fn new(
        book_id: Uuid,
        series_id: Uuid,
        position_in_series: Option<f64>,
        detection_method: DetectionMethod,
        confidence: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            book_id,
            series_id,
            position_in_series,
            detection_method,
            confidence_score: Confidence::new(confidence),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Series listing row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub series: Series,
    pub member_count: u32,
}

/// A member book together with its membership details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesBook {
    pub book: Book,
    pub position_in_series: Option<f64>,
    pub detection_method: DetectionMethod,
    pub confidence_score: Confidence,
}
