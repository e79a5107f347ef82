// src/config.rs
//
// Engine configuration
//
// Defaults carry the thresholds the engine has always used; every value can
// be overridden through SHELFHUB_* environment variables, nested keys
// separated by a double underscore:
//
//   SHELFHUB_THRESHOLDS__LINK_MIN_CONFIDENCE=0.75
//   SHELFHUB_GOOGLE_BOOKS__API_KEY=...
//   SHELFHUB_LLM__API_KEY=...

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

const ENV_PREFIX: &str = "SHELFHUB";

/// Confidence thresholds used across the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverThresholds {
    /// Cascade stops as soon as the held result reaches this score
    pub short_circuit: f64,

    /// Minimum self-reported confidence for AI answers
    pub ai_min_confidence: f64,

    /// Trigram similarity a candidate must exceed to reuse an existing series
    pub fuzzy_similarity: f64,

    /// Default gate for auto-linking
    pub link_min_confidence: f64,
}

impl Default for ResolverThresholds {
    fn default() -> Self {
        Self {
            short_circuit: 0.8,
            ai_min_confidence: 0.7,
            fuzzy_similarity: 0.7,
            link_min_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Pause between books during a batch scan
    pub delay_ms: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleBooksSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub min_interval_ms: u64,
}

impl Default for GoogleBooksSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/books/v1".to_string(),
            api_key: None,
            timeout_secs: 15,
            min_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenLibrarySettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub min_interval_ms: u64,
}

impl Default for OpenLibrarySettings {
    fn default() -> Self {
        Self {
            base_url: "https://openlibrary.org".to_string(),
            timeout_secs: 15,
            min_interval_ms: 500,
        }
    }
}

/// Text-generation collaborator (OpenAI-compatible chat completions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 30,
        }
    }
}

impl LlmSettings {
    /// The AI adapter only exists when credentials do
    pub fn is_enabled(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite file; falls back to the per-user data directory
    pub database_path: Option<PathBuf>,
    pub thresholds: ResolverThresholds,
    pub scan: ScanSettings,
    pub google_books: GoogleBooksSettings,
    pub open_library: OpenLibrarySettings,
    pub llm: LlmSettings,
}

impl EngineConfig {
    /// Defaults layered with SHELFHUB_* environment variables
    pub fn load() -> AppResult<Self> {
        Self::load_from(config::Environment::default())
    }

    /// Defaults layered with an explicit environment source
    pub fn load_from(environment: config::Environment) -> AppResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&EngineConfig::default())?)
            .add_source(
                environment
                    .prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: EngineConfig = settings.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    fn validate(&self) -> AppResult<()> {
        let thresholds = [
            ("short_circuit", self.thresholds.short_circuit),
            ("ai_min_confidence", self.thresholds.ai_min_confidence),
            ("fuzzy_similarity", self.thresholds.fuzzy_similarity),
            ("link_min_confidence", self.thresholds.link_min_confidence),
        ];

        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(AppError::Config(format!(
                    "threshold {} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let mut map = config::Map::new();
        for (k, v) in vars {
            map.insert(k.to_string(), v.to_string());
        }
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn test_defaults_match_engine_constants() {
        let config = EngineConfig::load_from(env(&[])).unwrap();
        assert_eq!(config.thresholds.short_circuit, 0.8);
        assert_eq!(config.thresholds.ai_min_confidence, 0.7);
        assert_eq!(config.thresholds.fuzzy_similarity, 0.7);
        assert_eq!(config.thresholds.link_min_confidence, 0.6);
        assert_eq!(config.scan.delay_ms, 1000);
        assert!(!config.llm.is_enabled());
    }

    #[test]
    fn test_environment_overrides() {
        let config = EngineConfig::load_from(env(&[
            ("SHELFHUB_THRESHOLDS__LINK_MIN_CONFIDENCE", "0.75"),
            ("SHELFHUB_SCAN__DELAY_MS", "10"),
            ("SHELFHUB_LLM__API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.thresholds.link_min_confidence, 0.75);
        assert_eq!(config.thresholds.short_circuit, 0.8);
        assert_eq!(config.scan.delay_ms, 10);
        assert!(config.llm.is_enabled());
    }

    #[test]
    fn test_out_of_range_threshold_is_rejected() {
        let result = EngineConfig::load_from(env(&[("SHELFHUB_THRESHOLDS__SHORT_CIRCUIT", "1.5")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
