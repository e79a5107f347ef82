// src/integrations/google_books/client.rs
//
// Google Books API client (Catalog A)
//
// ARCHITECTURE:
// - REST client for the volumes and series endpoints
// - Rate limited, explicit timeout
// - Maps external JSON -> DTOs (NO domain construction)
//
// CRITICAL RULES:
// - This is INFRASTRUCTURE, not DOMAIN
// - Errors are returned, never swallowed; the lookup layer decides how to degrade

use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::GoogleBooksSettings;
use crate::domain::BookQuery;
use crate::error::{AppError, AppResult};
use crate::integrations::http::{build_http_client, join_url, RateLimiter};

const MAX_RESULTS: &str = "5";

/// A volume as returned by `/volumes`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleVolume {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub volume_info: GoogleVolumeInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleVolumeInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,

    /// Kept untouched so it can travel as raw detection data
    #[serde(default)]
    pub series_info: Option<serde_json::Value>,
}

/// Typed view over `volumeInfo.seriesInfo`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSeriesInfo {
    #[serde(default)]
    pub book_display_number: Option<String>,
    #[serde(default)]
    pub volume_series: Vec<GoogleVolumeSeries>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleVolumeSeries {
    pub series_id: String,
    #[serde(default)]
    pub order_number: Option<f64>,
}

impl GoogleVolumeInfo {
    /// Structured series info, if the volume carries any
    pub fn parsed_series_info(&self) -> Option<GoogleSeriesInfo> {
        let raw = self.series_info.as_ref()?;
        match serde_json::from_value::<GoogleSeriesInfo>(raw.clone()) {
            Ok(info) => Some(info),
            Err(e) => {
                log::warn!("Unreadable Google Books seriesInfo: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<GoogleVolume>,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    series: Vec<SeriesEntry>,
}

#[derive(Debug, Deserialize)]
struct SeriesEntry {
    #[serde(default)]
    title: Option<String>,
}

/// Google Books API Client
pub struct GoogleBooksClient {
    base_url: String,
    api_key: Option<String>,
    http_client: Client,
    rate_limiter: RateLimiter,
}

impl GoogleBooksClient {
    pub fn new(settings: &GoogleBooksSettings) -> AppResult<Self> {
        Ok(Self {
            base_url: settings.base_url.clone(),
            api_key: settings
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            http_client: build_http_client(settings.timeout_secs)?,
            rate_limiter: RateLimiter::new(settings.min_interval_ms),
        })
    }

    /// ISBN lookup when an ISBN is known, otherwise title + author search
    pub async fn search_volumes(&self, query: &BookQuery) -> AppResult<Vec<GoogleVolume>> {
        let q = match &query.isbn {
            Some(isbn) => format!("isbn:{}", isbn),
            None if query.author.is_empty() => format!("intitle:{}", query.title),
            None => format!("intitle:{} inauthor:{}", query.title, query.author),
        };

        let mut params = vec![("q", q), ("maxResults", MAX_RESULTS.to_string())];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        let response: Option<VolumesResponse> = self.get_json("volumes", &params).await?;
        Ok(response.map(|r| r.items).unwrap_or_default())
    }

    /// Series title for a `seriesId`, if the catalog knows it
    pub async fn get_series_title(&self, series_id: &str) -> AppResult<Option<String>> {
        let mut params = vec![("series_id", series_id.to_string())];
        if let Some(key) = &self.api_key {
            params.push(("key", key.clone()));
        }

        let response: Option<SeriesResponse> = self.get_json("series/get", &params).await?;

        Ok(response
            .and_then(|r| r.series.into_iter().next())
            .and_then(|s| s.title)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()))
    }

    // ========================================================================
    // INTERNAL
    // ========================================================================

    /// GET + JSON decode; 404 maps to `None`
    async fn get_json<T>(&self, path: &str, params: &[(&str, String)]) -> AppResult<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.rate_limiter.wait().await;

        let url = join_url(&self.base_url, path);
        log::debug!("Google Books GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .query(params)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::Other(format!(
                "Google Books API returned status: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }
}
