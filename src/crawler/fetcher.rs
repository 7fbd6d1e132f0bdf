//! HTTP fetcher implementation
//!
//! This module handles page downloads for the crawler:
//! - Building the HTTP client with the configured identifying header
//! - GET requests with the transport's own redirect handling
//! - Error classification into [`FetchError`]
//! - NFKC normalization of the decoded body
//!
//! Nothing here retries; the coordinator restarts the whole attempt.

use crate::config::FetchConfig;
use crate::FetchError;
use reqwest::Client;
use std::time::Duration;
use unicode_normalization::UnicodeNormalization;

/// Builds an HTTP client for page downloads
///
/// # Example
///
/// ```no_run
/// use lexicrawl::config::FetchConfig;
/// use lexicrawl::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page and returns its text
///
/// The body is decoded using the charset the server declares and then
/// brought into Unicode normalization form NFKC, so the same text always
/// reaches the extractor as the same code points.
///
/// # Returns
///
/// * `Ok(String)` - The normalized page text
/// * `Err(FetchError)` - Network failure, non-success status, or unreadable body
pub async fn fetch_url(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Network {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| FetchError::Body {
        url: url.to_string(),
        source,
    })?;

    Ok(normalize_text(&body))
}

/// Applies NFKC normalization
pub fn normalize_text(text: &str) -> String {
    text.nfkc().collect()
}
