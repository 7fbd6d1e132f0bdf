//! Configuration module for Lexicrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; a missing file section falls back to the defaults
//! the crawler was tuned with.
//!
//! # Example
//!
//! ```no_run
//! use lexicrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("lexicrawl.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.max_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FetchConfig, InferenceConfig, OutputConfig};

// Re-export parser functions
pub use parser::{config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
