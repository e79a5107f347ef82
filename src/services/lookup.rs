// src/services/lookup.rs
//
// Resolver adapters
//
// One interface over three very different payload shapes:
// - Catalog A (Google Books): structured seriesInfo
// - Catalog B (Open Library): free-text series tags
// - AI: strict-JSON completion from a text generator
//
// CRITICAL RULES:
// - resolve() never fails and never panics on a bad payload
// - Every collaborator failure is logged at warn and becomes DetectionResult::none()

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

use crate::domain::{BookQuery, DetectionMethod, DetectionResult};
use crate::error::AppResult;
use crate::integrations::google_books::GoogleBooksClient;
use crate::integrations::llm::TextGenerator;
use crate::integrations::open_library::OpenLibraryClient;
use crate::services::title_patterns::{clean_series_name, extract_position, parse_title, NUM};

const ORDER_NUMBER_CONFIDENCE: f64 = 0.95;
const DISPLAY_NUMBER_CONFIDENCE: f64 = 0.8;
const OPEN_LIBRARY_CONFIDENCE: f64 = 0.85;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SeriesLookup: Send + Sync {
    /// Method recorded on the detections this adapter produces
    fn method(&self) -> DetectionMethod;

    async fn resolve(&self, query: &BookQuery) -> DetectionResult;
}

fn degrade(method: DetectionMethod, query: &BookQuery, result: AppResult<DetectionResult>) -> DetectionResult {
    match result {
        Ok(detection) => detection,
        Err(e) => {
            log::warn!("{} lookup failed for '{}': {}", method, query.title, e);
            DetectionResult::none()
        }
    }
}

// ============================================================================
// CATALOG A - GOOGLE BOOKS
// ============================================================================

pub struct GoogleBooksLookup {
    client: GoogleBooksClient,
}

impl GoogleBooksLookup {
    pub fn new(client: GoogleBooksClient) -> Self {
        Self { client }
    }

    async fn try_resolve(&self, query: &BookQuery) -> AppResult<DetectionResult> {
        let volumes = self.client.search_volumes(query).await?;

        let Some((volume, info)) = volumes
            .iter()
            .find_map(|v| v.volume_info.parsed_series_info().map(|info| (v, info)))
        else {
            return Ok(DetectionResult::none());
        };

        let series_ref = info.volume_series.first();
        let order_number = series_ref
            .and_then(|s| s.order_number)
            .filter(|n| n.is_finite() && *n > 0.0);

        let (position, confidence) = match order_number {
            Some(order) => (Some(order), ORDER_NUMBER_CONFIDENCE),
            None => (
                info.book_display_number.as_deref().and_then(extract_position),
                DISPLAY_NUMBER_CONFIDENCE,
            ),
        };

        let mut series_name = None;
        if let Some(series_ref) = series_ref {
            match self.client.get_series_title(&series_ref.series_id).await {
                Ok(title) => series_name = title,
                Err(e) => log::warn!(
                    "Google Books series title unavailable for {}: {}",
                    series_ref.series_id,
                    e
                ),
            }
        }

        // Fall back to reading the series out of "title: subtitle"
        if series_name.is_none() {
            let info = &volume.volume_info;
            let full_title = match (&info.title, &info.subtitle) {
                (Some(title), Some(subtitle)) => format!("{}: {}", title, subtitle),
                (Some(title), None) => title.clone(),
                _ => query.title.clone(),
            };
            series_name = parse_title(&full_title).series_name;
        }

        let Some(name) = series_name else {
            log::debug!("Google Books has seriesInfo but no series name for '{}'", query.title);
            return Ok(DetectionResult::none());
        };

        let raw = volume.volume_info.series_info.clone().unwrap_or_default();
        Ok(DetectionResult::named(name, position, DetectionMethod::CatalogA, confidence).with_raw_data(raw))
    }
}

#[async_trait]
impl SeriesLookup for GoogleBooksLookup {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::CatalogA
    }

    async fn resolve(&self, query: &BookQuery) -> DetectionResult {
        degrade(self.method(), query, self.try_resolve(query).await)
    }
}

// ============================================================================
// CATALOG B - OPEN LIBRARY
// ============================================================================

pub struct OpenLibraryLookup {
    client: OpenLibraryClient,
}

/// Split a free-text series tag into its name and position:
/// "Harry Potter ; 2", "The Hunger Games #2", "Discworld, book 4"
pub fn split_series_tag(tag: &str) -> Option<(String, Option<f64>)> {
    static POSITION_SUFFIX: OnceLock<Regex> = OnceLock::new();

    let suffix = POSITION_SUFFIX.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)(?:\s*[;#(]|[,\s]+(?:book|bk|vol|volume|no|nr|part)\.?\s*{}|\s*,?\s+\d+(?:\.\d+)?\s*$)",
            NUM
        ))
        .unwrap()
    });

    let tag = tag.trim();
    let (name, position) = match suffix.find(tag) {
        Some(m) => (&tag[..m.start()], extract_position(&tag[m.start()..])),
        None => (tag, None),
    };

    clean_series_name(name).map(|name| (name, position))
}

impl OpenLibraryLookup {
    pub fn new(client: OpenLibraryClient) -> Self {
        Self { client }
    }

    async fn find_series_tag(&self, query: &BookQuery) -> AppResult<Option<String>> {
        if let Some(isbn) = &query.isbn {
            if let Some(edition) = self.client.get_edition_by_isbn(isbn).await? {
                if let Some(tag) = edition.series.into_iter().next() {
                    return Ok(Some(tag));
                }
            }
        }

        let docs = self.client.search(&query.title, &query.author).await?;
        if let Some(tag) = docs.iter().find_map(|d| d.series.first().cloned()) {
            return Ok(Some(tag));
        }

        let Some(edition_key) = docs.first().and_then(|d| d.edition_key.first()) else {
            return Ok(None);
        };

        Ok(self
            .client
            .get_edition(edition_key)
            .await?
            .and_then(|e| e.series.into_iter().next()))
    }

    async fn try_resolve(&self, query: &BookQuery) -> AppResult<DetectionResult> {
        let Some(tag) = self.find_series_tag(query).await? else {
            return Ok(DetectionResult::none());
        };

        let Some((name, position)) = split_series_tag(&tag) else {
            log::debug!("Open Library series tag '{}' has no usable name", tag);
            return Ok(DetectionResult::none());
        };

        let position = position.or_else(|| parse_title(&query.title).position_in_series);

        Ok(
            DetectionResult::named(name, position, DetectionMethod::CatalogB, OPEN_LIBRARY_CONFIDENCE)
                .with_raw_data(serde_json::json!({ "series": tag })),
        )
    }
}

#[async_trait]
impl SeriesLookup for OpenLibraryLookup {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::CatalogB
    }

    async fn resolve(&self, query: &BookQuery) -> DetectionResult {
        degrade(self.method(), query, self.try_resolve(query).await)
    }
}

// ============================================================================
// AI
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AiAnswer {
    is_series: bool,
    #[serde(default)]
    series_name: Option<String>,
    #[serde(default)]
    position: Option<f64>,
    confidence: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

pub struct AiSeriesLookup {
    generator: Arc<dyn TextGenerator>,
    min_confidence: f64,
}

impl AiSeriesLookup {
    pub fn new(generator: Arc<dyn TextGenerator>, min_confidence: f64) -> Self {
        Self {
            generator,
            min_confidence,
        }
    }

    fn prompt(query: &BookQuery) -> String {
        let mut prompt = format!(
            "Is the book \"{}\" by {} part of a book series?",
            query.title,
            if query.author.is_empty() { "an unknown author" } else { query.author.as_str() }
        );
        if let Some(isbn) = &query.isbn {
            prompt.push_str(&format!(" (ISBN {})", isbn));
        }
        prompt.push_str(
            "\nRespond with JSON only, exactly these keys: \
             {\"isSeries\": boolean, \"seriesName\": string or null, \
             \"position\": number or null, \"confidence\": number between 0 and 1, \
             \"reasoning\": string}",
        );
        prompt
    }

    /// Accepts bare JSON or JSON wrapped in markdown code fences
    fn extract_json(completion: &str) -> Option<&str> {
        let start = completion.find('{')?;
        let end = completion.rfind('}')?;
        (start < end).then(|| &completion[start..=end])
    }

    fn interpret(&self, completion: &str) -> AppResult<DetectionResult> {
        let Some(json) = Self::extract_json(completion) else {
            log::warn!("AI completion carried no JSON object");
            return Ok(DetectionResult::none());
        };

        let raw: serde_json::Value = serde_json::from_str(json)?;
        let answer: AiAnswer = serde_json::from_value(raw.clone())?;

        let name = answer
            .series_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        match name {
            Some(name) if answer.is_series && answer.confidence >= self.min_confidence => {
                log::debug!(
                    "AI accepted '{}' ({:.2}): {}",
                    name,
                    answer.confidence,
                    answer.reasoning.as_deref().unwrap_or("")
                );
                Ok(
                    DetectionResult::named(name, answer.position, DetectionMethod::Ai, answer.confidence)
                        .with_raw_data(raw),
                )
            }
            _ => Ok(DetectionResult::none()),
        }
    }
}

#[async_trait]
impl SeriesLookup for AiSeriesLookup {
    fn method(&self) -> DetectionMethod {
        DetectionMethod::Ai
    }

    async fn resolve(&self, query: &BookQuery) -> DetectionResult {
        let result = match self.generator.complete(&Self::prompt(query)).await {
            Ok(completion) => self.interpret(&completion),
            Err(e) => Err(e),
        };
        degrade(self.method(), query, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GoogleBooksSettings, OpenLibrarySettings};
    use crate::error::AppError;
    use crate::integrations::llm::MockTextGenerator;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn google(server: &MockServer) -> GoogleBooksLookup {
        GoogleBooksLookup::new(
            GoogleBooksClient::new(&GoogleBooksSettings {
                base_url: server.uri(),
                api_key: None,
                timeout_secs: 5,
                min_interval_ms: 0,
            })
            .unwrap(),
        )
    }

    fn open_library(server: &MockServer) -> OpenLibraryLookup {
        OpenLibraryLookup::new(
            OpenLibraryClient::new(&OpenLibrarySettings {
                base_url: server.uri(),
                timeout_secs: 5,
                min_interval_ms: 0,
            })
            .unwrap(),
        )
    }

    fn ai(answer: &'static str) -> AiSeriesLookup {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_complete()
            .returning(move |_| Ok(answer.to_string()));
        AiSeriesLookup::new(Arc::new(generator), 0.7)
    }

    // ------------------------------------------------------------------------
    // Catalog A
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_google_order_number_is_high_confidence() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"items":[
                    {"volumeInfo":{"title":"Unrelated"}},
                    {"volumeInfo":{"title":"Catching Fire",
                     "seriesInfo":{"bookDisplayNumber":"2","volumeSeries":[{"seriesId":"S1","orderNumber":2}]}}}
                ]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/series/get"))
            .and(query_param("series_id", "S1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"series":[{"title":"The Hunger Games"}]}"#),
            )
            .mount(&server)
            .await;

        let query = BookQuery::new("Catching Fire", "Suzanne Collins", None);
        let result = google(&server).resolve(&query).await;

        assert_eq!(result.series_name.as_deref(), Some("The Hunger Games"));
        assert_eq!(result.position_in_series, Some(2.0));
        assert_eq!(result.detection_method, DetectionMethod::CatalogA);
        assert_eq!(result.score(), 0.95);
        assert!(result.raw_data.is_some());
    }

    #[tokio::test]
    async fn test_google_display_number_and_subtitle_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"items":[{"volumeInfo":{"title":"Mistborn","subtitle":"Book 2",
                    "seriesInfo":{"bookDisplayNumber":"Book 2","volumeSeries":[{"seriesId":"S9"}]}}}]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/series/get"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let query = BookQuery::new("The Well of Ascension", "Brandon Sanderson", None);
        let result = google(&server).resolve(&query).await;

        assert_eq!(result.series_name.as_deref(), Some("Mistborn"));
        assert_eq!(result.position_in_series, Some(2.0));
        assert_eq!(result.score(), 0.8);
    }

    #[tokio::test]
    async fn test_google_without_series_info_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/volumes"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"items":[{"volumeInfo":{"title":"Dune"}}]}"#),
            )
            .mount(&server)
            .await;

        let query = BookQuery::new("Dune", "Frank Herbert", None);
        assert!(google(&server).resolve(&query).await.is_none());
    }

    #[tokio::test]
    async fn test_google_unreachable_degrades_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let query = BookQuery::new("Dune", "Frank Herbert", None);
        assert!(google(&server).resolve(&query).await.is_none());
    }

    // ------------------------------------------------------------------------
    // Catalog B
    // ------------------------------------------------------------------------

    #[test]
    fn test_split_series_tag() {
        assert_eq!(split_series_tag("Harry Potter ; 2"), Some(("Harry Potter".to_string(), Some(2.0))));
        assert_eq!(
            split_series_tag("The Hunger Games #2"),
            Some(("The Hunger Games".to_string(), Some(2.0)))
        );
        assert_eq!(split_series_tag("Discworld, book 4"), Some(("Discworld".to_string(), Some(4.0))));
        assert_eq!(split_series_tag("Discworld 4"), Some(("Discworld".to_string(), Some(4.0))));
        assert_eq!(split_series_tag("The Book Thief"), Some(("The Book Thief".to_string(), None)));
        assert_eq!(split_series_tag(" ; 3"), None);
    }

    #[tokio::test]
    async fn test_open_library_isbn_edition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/isbn/9780439358071.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"title":"Order of the Phoenix","series":["Harry Potter ; 5"]}"#),
            )
            .mount(&server)
            .await;

        let query = BookQuery::new("Order of the Phoenix", "J.K. Rowling", Some("9780439358071"));
        let result = open_library(&server).resolve(&query).await;

        assert_eq!(result.series_name.as_deref(), Some("Harry Potter"));
        assert_eq!(result.position_in_series, Some(5.0));
        assert_eq!(result.detection_method, DetectionMethod::CatalogB);
        assert_eq!(result.score(), 0.85);
    }

    #[tokio::test]
    async fn test_open_library_search_then_edition_with_title_position() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"docs":[{"key":"/works/OL1W","title":"Mort","edition_key":["OL2M"]}]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/books/OL2M.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"title":"Mort","series":["Discworld"]}"#),
            )
            .mount(&server)
            .await;

        let query = BookQuery::new("Mort (Book 4)", "Terry Pratchett", None);
        let result = open_library(&server).resolve(&query).await;

        assert_eq!(result.series_name.as_deref(), Some("Discworld"));
        assert_eq!(result.position_in_series, Some(4.0));
    }

    #[tokio::test]
    async fn test_open_library_no_series_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"docs":[]}"#))
            .mount(&server)
            .await;

        let query = BookQuery::new("Standalone", "Someone", None);
        assert!(open_library(&server).resolve(&query).await.is_none());
    }

    // ------------------------------------------------------------------------
    // AI
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_ai_accepts_confident_answer_in_code_fence() {
        let lookup = ai(
            "```json\n{\"isSeries\": true, \"seriesName\": \"The Expanse\", \"position\": 1, \
             \"confidence\": 0.82, \"reasoning\": \"first novel\"}\n```",
        );

        let query = BookQuery::new("Leviathan Wakes", "James S. A. Corey", None);
        let result = lookup.resolve(&query).await;

        assert_eq!(result.series_name.as_deref(), Some("The Expanse"));
        assert_eq!(result.position_in_series, Some(1.0));
        assert_eq!(result.detection_method, DetectionMethod::Ai);
        assert_eq!(result.score(), 0.82);
    }

    #[tokio::test]
    async fn test_ai_rejects_low_confidence() {
        let lookup = ai(r#"{"isSeries": true, "seriesName": "Maybe", "position": null, "confidence": 0.5, "reasoning": ""}"#);
        let query = BookQuery::new("Something", "Someone", None);
        assert!(lookup.resolve(&query).await.is_none());
    }

    #[tokio::test]
    async fn test_ai_rejects_non_series_and_blank_names() {
        let query = BookQuery::new("Something", "Someone", None);

        let lookup = ai(r#"{"isSeries": false, "seriesName": "X", "position": 1, "confidence": 0.9, "reasoning": ""}"#);
        assert!(lookup.resolve(&query).await.is_none());

        let lookup = ai(r#"{"isSeries": true, "seriesName": "  ", "position": 1, "confidence": 0.9, "reasoning": ""}"#);
        assert!(lookup.resolve(&query).await.is_none());
    }

    #[tokio::test]
    async fn test_ai_malformed_completion_is_none() {
        let query = BookQuery::new("Something", "Someone", None);
        assert!(ai("I think so!").resolve(&query).await.is_none());
        assert!(ai("{\"isSeries\": tru").resolve(&query).await.is_none());
    }

    #[tokio::test]
    async fn test_ai_generator_error_is_none() {
        let mut generator = MockTextGenerator::new();
        generator
            .expect_complete()
            .returning(|_| Err(AppError::Other("offline".to_string())));
        let lookup = AiSeriesLookup::new(Arc::new(generator), 0.7);

        let query = BookQuery::new("Something", "Someone", None);
        assert!(lookup.resolve(&query).await.is_none());
    }
}
