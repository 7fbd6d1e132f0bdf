//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and text normalization
//! - Deduplicated dispatch onto a bounded worker pool
//! - The per-page unit of work with its retry loop
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod scheduler;

pub use coordinator::{
    output_file_name, parse_target_languages, run_crawl, CrawlRequest, CrawlTask, Crawler,
};
pub use fetcher::{build_http_client, fetch_url, normalize_text};
pub use scheduler::Scheduler;

pub use crate::output::CrawlReport;
