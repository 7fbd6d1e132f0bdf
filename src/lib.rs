//! Lexicrawl: a language-model driven corpus crawler
//!
//! This crate crawls a website page by page, hands every page to an external
//! inference service that extracts either plain sentences or bilingual
//! dictionary entries, follows the pagination link the service discovers, and
//! accumulates everything into a single JSON corpus on disk.

pub mod config;
pub mod corpus;
pub mod crawler;
pub mod inference;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Lexicrawl operations
#[derive(Debug, Error)]
pub enum LexiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Giving up on {url} after {attempts} attempts")]
    ExhaustedRetries { url: String, attempts: u32 },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TaskState,
        to: state::TaskState,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors raised while downloading a page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },
}

/// Errors raised while talking to the inference service or parsing its answer
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Inference request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Inference service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Inference service reported an error: {0}")]
    Service(String),

    #[error("Malformed stream event: {0}")]
    Event(String),

    #[error("Response has no <{0}> region")]
    MissingRegion(&'static str),

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Errors raised while persisting the corpus
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Cannot access output path {path}: {source}")]
    Access {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to serialize corpus: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for Lexicrawl operations
pub type Result<T> = std::result::Result<T, LexiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use corpus::{Corpus, DictionaryEntry, PageFragment};
pub use crawler::{run_crawl, CrawlReport, CrawlRequest, Crawler};
pub use state::TaskState;
pub use url::normalize_url;
