// src/integrations/open_library/client.rs
//
// Open Library API client (Catalog B)
//
// - Edition lookup by ISBN
// - Title/author search, then edition lookup for the series tag
// - Returns DTOs; series tags are free text and left as-is

use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::OpenLibrarySettings;
use crate::error::{AppError, AppResult};
use crate::integrations::http::{build_http_client, join_url, RateLimiter};

const SEARCH_LIMIT: &str = "5";
const SEARCH_FIELDS: &str = "key,title,edition_key,series";

/// Edition record (`/isbn/{isbn}.json`, `/books/{olid}.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenLibraryEdition {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub series: Vec<String>,
}

/// Search hit (`/search.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenLibrarySearchDoc {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub edition_key: Vec<String>,
    #[serde(default)]
    pub series: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<OpenLibrarySearchDoc>,
}

/// Open Library API Client
pub struct OpenLibraryClient {
    base_url: String,
    http_client: Client,
    rate_limiter: RateLimiter,
}

impl OpenLibraryClient {
    pub fn new(settings: &OpenLibrarySettings) -> AppResult<Self> {
        Ok(Self {
            base_url: settings.base_url.clone(),
            http_client: build_http_client(settings.timeout_secs)?,
            rate_limiter: RateLimiter::new(settings.min_interval_ms),
        })
    }

    pub async fn get_edition_by_isbn(&self, isbn: &str) -> AppResult<Option<OpenLibraryEdition>> {
        self.get_json(&format!("isbn/{}.json", isbn), &[]).await
    }

    /// `edition_key` is a bare OLID such as `OL7353617M`
    pub async fn get_edition(&self, edition_key: &str) -> AppResult<Option<OpenLibraryEdition>> {
        let olid = edition_key.trim_start_matches("/books/");
        self.get_json(&format!("books/{}.json", olid), &[]).await
    }

    pub async fn search(&self, title: &str, author: &str) -> AppResult<Vec<OpenLibrarySearchDoc>> {
        let mut params = vec![("title", title.to_string())];
        if !author.is_empty() {
            params.push(("author", author.to_string()));
        }
        params.push(("limit", SEARCH_LIMIT.to_string()));
        params.push(("fields", SEARCH_FIELDS.to_string()));

        let response: Option<SearchResponse> = self.get_json("search.json", &params).await?;
        Ok(response.map(|r| r.docs).unwrap_or_default())
    }

    // ========================================================================
    // INTERNAL
    // ========================================================================

    async fn get_json<T>(&self, path: &str, params: &[(&str, String)]) -> AppResult<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        self.rate_limiter.wait().await;

        let url = join_url(&self.base_url, path);
        log::debug!("Open Library GET {}", url);

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
                "Open Library API returned status: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenLibraryClient {
        OpenLibraryClient::new(&OpenLibrarySettings {
            base_url: server.uri(),
            timeout_secs: 5,
            min_interval_ms: 0,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_edition_by_isbn() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/isbn/9780439358071.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"key":"/books/OL1M","title":"Harry Potter and the Order of the Phoenix",
                    "series":["Harry Potter ; 5"]}"#,
            ))
            .mount(&server)
            .await;

        let edition = client(&server)
            .get_edition_by_isbn("9780439358071")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(edition.series, vec!["Harry Potter ; 5".to_string()]);
    }

    #[tokio::test]
    async fn test_unknown_isbn_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(client(&server).get_edition_by_isbn("0000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_sends_field_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("title", "Mort"))
            .and(query_param("author", "Terry Pratchett"))
            .and(query_param("fields", SEARCH_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"numFound":1,"docs":[{"key":"/works/OL1W","title":"Mort","edition_key":["OL2M"]}]}"#,
            ))
            .mount(&server)
            .await;

        let docs = client(&server).search("Mort", "Terry Pratchett").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].edition_key, vec!["OL2M".to_string()]);
        assert!(docs[0].series.is_empty());
    }
}
