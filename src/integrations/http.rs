// src/integrations/http.rs
//
// Shared HTTP plumbing for the catalog and LLM clients
//
// - Every client owns its reqwest::Client with an explicit timeout
// - Every client owns a RateLimiter; callers await it before each request

use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};

const USER_AGENT: &str = concat!("shelfhub/", env!("CARGO_PKG_VERSION"));

/// Build a client with the given request timeout
pub fn build_http_client(timeout_secs: u64) -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::Other(format!("Failed to create HTTP client: {}", e)))
}

/// Minimum interval between two requests of the same client
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if the previous request was too recent
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                log::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Join a configured base URL and a path without doubling slashes
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
