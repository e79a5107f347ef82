// src/events/types.rs
//
// Series engine events.
// Each event represents an immutable fact that has already occurred.
//
// CRITICAL RULES:
// - Events are facts, not commands
// - Events carry only the data needed to react

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trait that all domain events must implement
pub trait DomainEvent: std::fmt::Debug + Clone {
    /// Unique identifier for this event instance
    fn event_id(&self) -> Uuid;

    /// When this event occurred
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Human-readable event type name
    fn event_type(&self) -> &'static str;
}

macro_rules! impl_domain_event {
    ($ty:ident) => {
        impl DomainEvent for $ty {
            fn event_id(&self) -> Uuid {
                self.event_id
            }
            fn occurred_at(&self) -> DateTime<Utc> {
                self.occurred_at
            }
            fn event_type(&self) -> &'static str {
                stringify!($ty)
            }
        }
    };
}

// ============================================================================
// SERIES LIFECYCLE
// ============================================================================

/// Emitted when the registry inserts a new Series row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesCreated {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub series_id: Uuid,
    pub name: String,
}

impl SeriesCreated {
    pub fn new(series_id: Uuid, name: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            series_id,
            name,
        }
    }
}

impl_domain_event!(SeriesCreated);

/// Emitted when a candidate name was folded into an existing, similar series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesCoalesced {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub series_id: Uuid,
    pub existing_name: String,
    pub candidate_name: String,
    pub similarity: f64,
}

impl SeriesCoalesced {
    pub fn new(series_id: Uuid, existing_name: String, candidate_name: String, similarity: f64) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            series_id,
            existing_name,
            candidate_name,
            similarity,
        }
    }
}

impl_domain_event!(SeriesCoalesced);

/// Emitted when a series row is removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesDeleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub series_id: Uuid,
    pub name: String,
}

impl SeriesDeleted {
    pub fn new(series_id: Uuid, name: String) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            series_id,
            name,
        }
    }
}

impl_domain_event!(SeriesDeleted);

/// Emitted when one series is folded into another by an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMerged {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub source_series_id: Uuid,
    pub target_series_id: Uuid,
    pub moved_memberships: usize,
}

impl SeriesMerged {
    pub fn new(source_series_id: Uuid, target_series_id: Uuid, moved_memberships: usize) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            source_series_id,
            target_series_id,
            moved_memberships,
        }
    }
}

impl_domain_event!(SeriesMerged);

// ============================================================================
// MEMBERSHIP
// ============================================================================

/// Emitted after a membership upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLinkedToSeries {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub book_id: Uuid,
    pub series_id: Uuid,
    pub position_in_series: Option<f64>,
    pub detection_method: String,
    pub confidence: f64,
}

impl BookLinkedToSeries {
    pub fn new(
        book_id: Uuid,
        series_id: Uuid,
        position_in_series: Option<f64>,
        detection_method: String,
        confidence: f64,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            book_id,
            series_id,
            position_in_series,
            detection_method,
            confidence,
        }
    }
}

impl_domain_event!(BookLinkedToSeries);

/// Emitted when a book's memberships are removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookUnlinkedFromSeries {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub book_id: Uuid,
    pub series_ids: Vec<Uuid>,
}

impl BookUnlinkedFromSeries {
    pub fn new(book_id: Uuid, series_ids: Vec<Uuid>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            book_id,
            series_ids,
        }
    }
}

impl_domain_event!(BookUnlinkedFromSeries);

// ============================================================================
// BATCH SCAN
// ============================================================================

/// Emitted once per batch scan with its aggregate counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesScanCompleted {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub scanned: usize,
    pub linked: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl SeriesScanCompleted {
    pub fn new(scanned: usize, linked: usize, failed: usize, skipped: usize, duration_ms: u64) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            scanned,
            linked,
            failed,
            skipped,
            duration_ms,
        }
    }
}

impl_domain_event!(SeriesScanCompleted);
