//! Output module for persisting the corpus and reporting progress
//!
//! This module handles:
//! - Writing corpus snapshots to disk as indented JSON
//! - Counting per-page outcomes during a crawl
//! - Printing the final crawl report

mod snapshot;
pub mod stats;

pub use snapshot::SnapshotWriter;
pub use stats::{print_report, CrawlReport, CrawlStatistics};
