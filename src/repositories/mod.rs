// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are DUMB data mappers
// - NO business logic
// - NO event emission
// - Explicit SQL only

pub mod book_repository;
pub mod series_repository;

pub use book_repository::{BookRepository, SqliteBookRepository};
pub use series_repository::{SeriesRepository, SqliteSeriesRepository};
