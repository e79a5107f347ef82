// src/domain/detection/mod.rs
//
// Detection Domain
//
// Value objects describing what the resolver cascade learned about a book.
// Pure data: no persistence, no I/O.

pub mod value_objects;

pub use value_objects::{BookQuery, Confidence, DetectionMethod, DetectionResult};
