// src/lib.rs
// ShelfHub - Series resolution engine for a personal book library
//
// Architecture:
// - Domain-centric: series, memberships and detections are plain value types
// - Cascade: title patterns first, catalogs next, AI last and optional
// - Event-driven: every registry mutation and scan is published as a fact
// - Explicit: repositories and clients are passed in, never created implicitly

// ============================================================================
// FOUNDATION
// ============================================================================

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod events;
pub mod repositories;

// ============================================================================
// RESOLUTION AND REGISTRY
// ============================================================================

pub mod engine;
pub mod integrations;
pub mod services;

// ============================================================================
// PUBLIC API - Domain
// ============================================================================

pub use domain::{
    normalize_series_name,
    trigram_similarity,
    validate_membership,
    validate_series,
    // Book (read collaborator)
    Book,
    // Detection
    BookQuery,
    Confidence,
    DetectionMethod,
    DetectionResult,
    DomainError,
    // Series
    Series,
    SeriesBook,
    SeriesMembership,
    SeriesSummary,
};

// ============================================================================
// PUBLIC API - Error Types
// ============================================================================

pub use error::{AppError, AppResult};

// ============================================================================
// PUBLIC API - Configuration
// ============================================================================

pub use crate::config::{
    EngineConfig,
    GoogleBooksSettings,
    LlmSettings,
    OpenLibrarySettings,
    ResolverThresholds,
    ScanSettings,
};

// ============================================================================
// PUBLIC API - Events
// ============================================================================

pub use events::{
    create_event_bus,
    BookLinkedToSeries,
    BookUnlinkedFromSeries,
    DomainEvent,
    EventBus,
    EventLogEntry,
    SeriesCoalesced,
    SeriesCreated,
    SeriesDeleted,
    SeriesMerged,
    SeriesScanCompleted,
};

// ============================================================================
// PUBLIC API - Database
// ============================================================================

pub use db::{create_connection_pool, create_in_memory_pool, initialize_database, ConnectionPool};

// ============================================================================
// PUBLIC API - Repositories
// ============================================================================

pub use repositories::{
    BookRepository,
    SeriesRepository,
    SqliteBookRepository,
    SqliteSeriesRepository,
};

// ============================================================================
// PUBLIC API - Services
// ============================================================================

pub use services::{
    // Pattern parser
    parse_title,
    // Adapters
    AiSeriesLookup,
    GoogleBooksLookup,
    ImplicitSeriesSuggestion,
    LinkOutcome,
    OpenLibraryLookup,
    ScanItemOutcome,
    ScanItemStatus,
    ScanSummary,
    SeriesLookup,
    // Registry
    SeriesRegistry,
    // Orchestrator
    SeriesResolver,
    // Scanner
    SeriesScanner,
    TitlePatterns,
};

pub use engine::SeriesEngine;
