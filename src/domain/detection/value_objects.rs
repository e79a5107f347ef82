// src/domain/detection/value_objects.rs
//
// Detection Value Objects
//
// CRITICAL INVARIANTS:
// - method == None  <=>  no series name, no position, confidence 0
// - A result carrying a series name never has method None
// - Confidence is always clamped to [0.0, 1.0]
// - Positions are finite and >= 0 (0 marks a prequel)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

// ============================================================================
// BOOK QUERY
// ============================================================================

/// What the cascade is asked to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookQuery {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
}

impl BookQuery {
    pub fn new(title: &str, author: &str, isbn: Option<&str>) -> Self {
        Self {
            title: title.trim().to_string(),
            author: author.trim().to_string(),
            isbn: isbn
                .map(|s| s.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
                .filter(|s| !s.is_empty()),
        }
    }
}

// ============================================================================
// DETECTION METHOD
// ============================================================================

/// Strategy that produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// Deterministic title pattern
    Pattern,

    /// Primary bibliographic catalog (structured series metadata)
    CatalogA,

    /// Secondary bibliographic catalog (free-text series tags)
    CatalogB,

    /// Text-generation collaborator
    Ai,

    /// Nothing found
    None,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::Pattern => "pattern",
            DetectionMethod::CatalogA => "catalog_a",
            DetectionMethod::CatalogB => "catalog_b",
            DetectionMethod::Ai => "ai",
            DetectionMethod::None => "none",
        }
    }
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pattern" => Ok(DetectionMethod::Pattern),
            "catalog_a" => Ok(DetectionMethod::CatalogA),
            "catalog_b" => Ok(DetectionMethod::CatalogB),
            "ai" => Ok(DetectionMethod::Ai),
            "none" => Ok(DetectionMethod::None),
            other => Err(format!("Unknown detection method: {}", other)),
        }
    }
}

// ============================================================================
// CONFIDENCE
// ============================================================================

/// Confidence score for a detection, from 0.0 (nothing) to 1.0 (certain).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Confidence {
    score: f64,
}

impl Confidence {
    /// Creates a new confidence score, clamped to [0.0, 1.0].
    /// NaN collapses to 0.0.
    pub fn new(score: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self { score }
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn none() -> Self {
        Self::new(0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.score <= 0.0
    }

    /// Inclusive threshold check
    pub fn meets(&self, threshold: f64) -> bool {
        self.score >= threshold
    }
}

impl PartialEq for Confidence {
    fn eq(&self, other: &Self) -> bool {
        (self.score - other.score).abs() < f64::EPSILON
    }
}

impl PartialOrd for Confidence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else {
            self.score.partial_cmp(&other.score)
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}%", self.score * 100.0)
    }
}

// ============================================================================
// DETECTION RESULT
// ============================================================================

/// The outcome of one resolution strategy (or of the whole cascade).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub series_name: Option<String>,
    pub position_in_series: Option<f64>,
    pub detection_method: DetectionMethod,
    pub confidence: Confidence,
    /// Source payload kept for traceability
    pub raw_data: Option<serde_json::Value>,
}

impl DetectionResult {
    /// Signal absent
    pub fn none() -> Self {
        Self {
            series_name: None,
            position_in_series: None,
            detection_method: DetectionMethod::None,
            confidence: Confidence::none(),
            raw_data: None,
        }
    }

    /// A detection naming a series. A blank name or a `None` method
    /// degrades to `DetectionResult::none()`.
    pub fn named(
        series_name: impl Into<String>,
        position_in_series: Option<f64>,
        detection_method: DetectionMethod,
        confidence: f64,
    ) -> Self {
        let name = series_name.into().trim().to_string();
        if name.is_empty() || detection_method == DetectionMethod::None {
            return Self::none();
        }

        Self {
            series_name: Some(name),
            position_in_series: position_in_series.filter(|p| p.is_finite() && *p >= 0.0),
            detection_method,
            confidence: Confidence::new(confidence),
            raw_data: None,
        }
    }

    /// A detection that only knows the book's position
    pub fn position_only(position: f64, detection_method: DetectionMethod, confidence: f64) -> Self {
        if detection_method == DetectionMethod::None || !position.is_finite() || position < 0.0 {
            return Self::none();
        }

        Self {
            series_name: None,
            position_in_series: Some(position),
            detection_method,
            confidence: Confidence::new(confidence),
            raw_data: None,
        }
    }

    pub fn with_raw_data(mut self, raw: serde_json::Value) -> Self {
        if !self.is_none() {
            self.raw_data = Some(raw);
        }
        self
    }

    pub fn is_none(&self) -> bool {
        self.detection_method == DetectionMethod::None
    }

    pub fn has_series(&self) -> bool {
        self.series_name.is_some()
    }

    pub fn score(&self) -> f64 {
        self.confidence.score()
    }
}

impl Default for DetectionResult {
    fn default() -> Self {
        Self::none()
    }
}

// ============================================================================
// TESTS
// ============================================================================
