// src/services/mod.rs
//
// Services Module - Orchestration Layer

pub mod lookup;
pub mod series_registry;
pub mod series_resolver;
pub mod series_scanner;
pub mod title_patterns;

#[cfg(test)]
mod series_scanner_tests;

pub use title_patterns::{
    extract_position,
    ordinal_to_number,
    parse_title,
    roman_to_number,
    word_to_number,
    TitlePatterns,
};

pub use lookup::{
    split_series_tag,
    AiSeriesLookup,
    GoogleBooksLookup,
    OpenLibraryLookup,
    SeriesLookup,
};

pub use series_resolver::SeriesResolver;

pub use series_registry::{
    LinkOutcome,
    SeriesRegistry,
};

pub use series_scanner::{
    ImplicitSeriesSuggestion,
    ScanItemOutcome,
    ScanItemStatus,
    ScanSummary,
    SeriesScanner,
};
