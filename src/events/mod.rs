// src/events/mod.rs
//
// Internal Event System - Public API
//
// Registry and scanner facts are published here; the host application
// subscribes to refresh caches or notify the user.

pub mod bus;
pub mod types;

pub use types::DomainEvent;

pub use types::{
    BookLinkedToSeries, BookUnlinkedFromSeries, SeriesCoalesced, SeriesCreated, SeriesDeleted,
    SeriesMerged, SeriesScanCompleted,
};

pub use bus::{EventBus, EventLogEntry};

/// Initialize a new event bus
pub fn create_event_bus() -> EventBus {
    EventBus::new()
}
