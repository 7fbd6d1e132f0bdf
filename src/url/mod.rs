//! URL handling module for Lexicrawl
//!
//! This module provides URL canonicalization for crawl deduplication and the
//! resolution of pagination links reported by the inference service.

mod normalize;

pub use normalize::{canonicalize, normalize_url, resolve_next_page};
