//! Crawl progress counters and the final report
//!
//! Counters are updated by concurrent workers, so they are plain atomics;
//! [`CrawlStatistics::report`] takes a point-in-time copy.

use crate::corpus::CorpusShape;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Live counters shared by all workers
#[derive(Debug, Default)]
pub struct CrawlStatistics {
    pages_succeeded: AtomicUsize,
    pages_exhausted: AtomicUsize,
    pages_without_corpus: AtomicUsize,
    shape_mismatches: AtomicUsize,
    failed_attempts: AtomicUsize,
    links_dispatched: AtomicUsize,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.pages_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhausted(&self) {
        self.pages_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_corpus(&self) {
        self.pages_without_corpus.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_shape_mismatch(&self) {
        self.shape_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_attempt(&self) {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_link_dispatched(&self) {
        self.links_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Builds a report from the current counter values
    pub fn report(
        &self,
        shape: CorpusShape,
        total_entries: usize,
        output_path: PathBuf,
        elapsed: Duration,
    ) -> CrawlReport {
        CrawlReport {
            shape,
            pages_succeeded: self.pages_succeeded.load(Ordering::Relaxed),
            pages_exhausted: self.pages_exhausted.load(Ordering::Relaxed),
            pages_without_corpus: self.pages_without_corpus.load(Ordering::Relaxed),
            shape_mismatches: self.shape_mismatches.load(Ordering::Relaxed),
            failed_attempts: self.failed_attempts.load(Ordering::Relaxed),
            links_dispatched: self.links_dispatched.load(Ordering::Relaxed),
            total_entries,
            output_path,
            elapsed,
        }
    }
}

/// Summary of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub shape: CorpusShape,
    pub pages_succeeded: usize,
    pub pages_exhausted: usize,
    /// Pages whose payload had no `corpus` key
    pub pages_without_corpus: usize,
    pub shape_mismatches: usize,
    pub failed_attempts: usize,
    /// Pagination links that were dispatched as new tasks
    pub links_dispatched: usize,
    pub total_entries: usize,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

impl CrawlReport {
    /// Total pages that reached a terminal state
    pub fn pages_finished(&self) -> usize {
        self.pages_succeeded + self.pages_exhausted
    }

    /// Percentage of finished pages that produced a payload
    pub fn success_rate(&self) -> f64 {
        let finished = self.pages_finished();
        if finished == 0 {
            return 0.0;
        }
        (self.pages_succeeded as f64 / finished as f64) * 100.0
    }
}

/// Prints the report to stdout
pub fn print_report(report: &CrawlReport) {
    println!("=== Crawl Report ===\n");

    println!("Pages:");
    println!("  Succeeded: {}", report.pages_succeeded);
    println!("  Gave up: {}", report.pages_exhausted);
    println!("  Without corpus data: {}", report.pages_without_corpus);
    println!("  Shape mismatches: {}", report.shape_mismatches);
    println!("  Failed attempts: {}", report.failed_attempts);
    println!("  Pagination links followed: {}", report.links_dispatched);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} pages)",
        report.success_rate(),
        report.pages_succeeded,
        report.pages_finished()
    );
    println!("Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    println!("Output ({}): {}", report.shape, report.output_path.display());
    println!("\nTotal entries collected: {}", report.total_entries);
}
