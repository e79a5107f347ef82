pub mod entity;
pub mod invariants;
pub mod similarity;

pub use entity::{Series, SeriesBook, SeriesMembership, SeriesSummary};
pub use invariants::{validate_membership, validate_series};
pub use similarity::{normalize_series_name, trigram_similarity};
