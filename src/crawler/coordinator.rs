//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the unit of work executed for every page and the
//! driver that seeds the crawl and waits for it to drain:
//! - Fetching the page and running the streaming extraction
//! - Dispatching the pagination link as soon as the stream reveals it
//! - Retrying the whole fetch-extract-parse sequence on failure
//! - Handing finished fragments to the aggregator
//! - Building the final report

use crate::config::{validate, Config};
use crate::corpus::{Aggregator, CorpusShape, MergeOutcome, PageFragment};
use crate::crawler::fetcher::{build_http_client, fetch_url};
use crate::crawler::scheduler::Scheduler;
use crate::inference::{Extraction, ExtractionClient};
use crate::output::{CrawlReport, CrawlStatistics};
use crate::state::TaskState;
use crate::url::{canonicalize, resolve_next_page};
use crate::{LexiError, OutputError};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Parameters shared by every task of one crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    /// Language of the crawled site's content
    pub source_language: String,

    /// Languages to translate into; `None` selects raw-content mode
    pub target_languages: Option<Vec<String>>,

    /// Where the corpus snapshot is written
    pub output_path: PathBuf,
}

impl CrawlRequest {
    /// Creates a request whose output file is named after the languages and
    /// placed in `output_dir`
    ///
    /// Blank target names are dropped; an empty list means raw-content mode.
    ///
    /// # Example
    ///
    /// ```
    /// use lexicrawl::CrawlRequest;
    /// use std::path::Path;
    ///
    /// let request = CrawlRequest::new(
    ///     "Kadazan",
    ///     Some(vec!["English".to_string(), "Malay".to_string()]),
    ///     "output",
    /// );
    /// assert_eq!(request.output_path, Path::new("output/Kadazan_to_English_Malay.json"));
    /// ```
    pub fn new(
        source_language: impl Into<String>,
        target_languages: Option<Vec<String>>,
        output_dir: impl AsRef<Path>,
    ) -> Self {
        let source_language = source_language.into().trim().to_string();
        let target_languages = target_languages
            .map(|targets| {
                targets
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|targets| !targets.is_empty());

        let file_name = output_file_name(&source_language, target_languages.as_deref());

        Self {
            output_path: output_dir.as_ref().join(file_name),
            source_language,
            target_languages,
        }
    }

    /// Corpus shape selected by this request
    pub fn shape(&self) -> CorpusShape {
        CorpusShape::for_targets(self.target_languages.as_deref())
    }
}

/// Splits a comma-separated list of target languages
///
/// Returns `None` for blank input, which selects raw-content mode.
pub fn parse_target_languages(input: &str) -> Option<Vec<String>> {
    let targets: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if targets.is_empty() {
        None
    } else {
        Some(targets)
    }
}

/// File name of the corpus for a language selection
///
/// `corpus_{language}.json` in raw mode, `{language}_to_{targets}.json` in
/// dictionary mode.
pub fn output_file_name(source_language: &str, target_languages: Option<&[String]>) -> String {
    let source = sanitize_component(source_language);
    match target_languages {
        Some(targets) if !targets.is_empty() => {
            let targets: Vec<String> = targets.iter().map(|t| sanitize_component(t)).collect();
            format!("{}_to_{}.json", source, targets.join("_"))
        }
        _ => format!("corpus_{}.json", source),
    }
}

fn sanitize_component(component: &str) -> String {
    component
        .trim()
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// One page being processed; retries reuse the same task
#[derive(Debug)]
pub struct CrawlTask {
    pub url: String,
    pub request: Arc<CrawlRequest>,
    pub state: TaskState,
    /// Attempts started so far
    pub attempt: u32,
}

impl CrawlTask {
    fn new(url: String, request: Arc<CrawlRequest>) -> Self {
        Self {
            url,
            request,
            state: TaskState::Running,
            attempt: 0,
        }
    }
}

/// Main crawler structure
///
/// Shared by every worker through an `Arc`; each guarded resource lives in
/// its own component (scheduler, aggregator, snapshot writer).
pub struct Crawler {
    request: Arc<CrawlRequest>,
    scheduler: Arc<Scheduler>,
    client: Client,
    extractor: ExtractionClient,
    aggregator: Aggregator,
    stats: CrawlStatistics,
    max_attempts: u32,
    /// First unrecoverable output error; stops the crawl
    fatal: Mutex<Option<OutputError>>,
}

impl Crawler {
    /// Creates a new crawler instance
    ///
    /// The empty corpus is written immediately, so an unusable output path
    /// is reported before any page is fetched.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<Crawler>)` - Ready to run
    /// * `Err(LexiError)` - Invalid configuration, HTTP client, or output path
    pub fn new(config: &Config, request: CrawlRequest) -> Result<Arc<Self>, LexiError> {
        validate(config)?;

        let client = build_http_client(&config.fetch)?;
        let extractor = ExtractionClient::new(&config.inference)?;
        let aggregator = Aggregator::new(request.shape(), &request.output_path)?;

        tracing::info!(
            "Collecting {} corpus into {}",
            request.shape(),
            request.output_path.display()
        );

        Ok(Arc::new(Self {
            request: Arc::new(request),
            scheduler: Scheduler::new(config.crawler.max_workers as usize),
            client,
            extractor,
            aggregator,
            stats: CrawlStatistics::new(),
            max_attempts: config.crawler.max_attempts,
            fatal: Mutex::new(None),
        }))
    }

    /// Submits a page unless it was already visited
    pub fn enqueue(self: &Arc<Self>, url: &str) -> bool {
        let crawler = Arc::clone(self);
        self.scheduler
            .enqueue(url, move |canonical| crawler.process_page(canonical))
    }

    /// Crawls from `start_url` until no work remains
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Every discovered page reached a terminal state
    /// * `Err(LexiError)` - The start URL is invalid or the corpus could not be written
    pub async fn run(self: &Arc<Self>, start_url: &str) -> Result<CrawlReport, LexiError> {
        let start = Instant::now();
        let start_url = canonicalize(start_url)?;

        tracing::info!("Starting crawl at {}", start_url);
        self.enqueue(start_url.as_str());
        self.scheduler.wait_until_idle().await;

        if let Some(e) = self
            .fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            tracing::error!("Crawl stopped: {}", e);
            return Err(e.into());
        }

        let report = self.stats.report(
            self.aggregator.shape(),
            self.aggregator.entry_count(),
            self.aggregator.path().to_path_buf(),
            start.elapsed(),
        );

        tracing::info!(
            "Crawl completed: {} pages in {:?}, {} entries",
            report.pages_finished(),
            report.elapsed,
            report.total_entries
        );

        Ok(report)
    }

    /// Unit of work for one page
    ///
    /// Returns a boxed future so the page work can submit more page work.
    fn process_page(self: Arc<Self>, url: String) -> BoxFuture<'static, ()> {
        async move {
            let mut task = CrawlTask::new(url, Arc::clone(&self.request));
            let extraction = self.run_attempts(&mut task).await;
            self.finish(&task, extraction);
        }
        .boxed()
    }

    /// Runs attempts until one succeeds or the bound is reached
    async fn run_attempts(self: &Arc<Self>, task: &mut CrawlTask) -> Option<Extraction> {
        while task.attempt < self.max_attempts {
            task.attempt += 1;
            tracing::info!(
                "Scraping {} (attempt {}/{})",
                task.url,
                task.attempt,
                self.max_attempts
            );

            match self.attempt(task).await {
                Ok(extraction) => {
                    self.transition(task, TaskState::Succeeded);
                    return Some(extraction);
                }
                Err(e) => {
                    self.stats.record_failed_attempt();
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}",
                        task.attempt,
                        self.max_attempts,
                        task.url,
                        e
                    );
                }
            }
        }

        self.transition(task, TaskState::Exhausted);
        tracing::error!(
            "{}",
            LexiError::ExhaustedRetries {
                url: task.url.clone(),
                attempts: task.attempt,
            }
        );
        None
    }

    /// One fetch-extract-parse sequence; nothing is carried over between
    /// attempts
    async fn attempt(self: &Arc<Self>, task: &CrawlTask) -> Result<Extraction, LexiError> {
        let page_text = fetch_url(&self.client, &task.url).await?;
        tracing::debug!("Fetched {} ({} bytes)", task.url, page_text.len());

        let extraction = self
            .extractor
            .extract(
                &page_text,
                &task.request.source_language,
                task.request.target_languages.as_deref(),
                |value| self.follow_next_page(&task.url, value),
            )
            .await?;

        tracing::debug!(
            "Answer for {} streamed ({} bytes)",
            task.url,
            extraction.response_len
        );
        tracing::debug!(
            "Reasoning for {}: {}",
            task.url,
            extraction
                .reasoning
                .as_deref()
                .filter(|r| !r.is_empty())
                .unwrap_or("empty")
        );
        if extraction.next_page.is_none() {
            tracing::debug!("No next_page region in response for {}", task.url);
        }

        Ok(extraction)
    }

    /// Pagination callback, called while the answer is still streaming
    fn follow_next_page(self: &Arc<Self>, page_url: &str, value: &str) {
        let Some(next) = resolve_next_page(page_url, value) else {
            tracing::debug!("No next page after {} ({:?})", page_url, value);
            return;
        };

        if self.enqueue(&next) {
            self.stats.record_link_dispatched();
            tracing::info!("Found next page {} on {}", next, page_url);
        } else {
            tracing::debug!("Next page {} already visited", next);
        }
    }

    /// Records the outcome of a task and merges its fragment
    fn finish(&self, task: &CrawlTask, extraction: Option<Extraction>) {
        let Some(extraction) = extraction else {
            self.stats.record_exhausted();
            return;
        };
        self.stats.record_success();

        let Some(fragment) = extraction.fragment else {
            self.stats.record_no_corpus();
            tracing::info!("Finished {} (no corpus data to add)", task.url);
            return;
        };

        self.merge(task, fragment);
    }

    fn merge(&self, task: &CrawlTask, fragment: PageFragment) {
        match self.aggregator.merge(fragment) {
            Ok(MergeOutcome::Merged { added }) => {
                tracing::info!("Finished {} (+{} entries)", task.url, added);
            }
            Ok(MergeOutcome::ShapeMismatch { corpus, fragment }) => {
                self.stats.record_shape_mismatch();
                tracing::warn!(
                    "Finished {} (discarded {} fragment for {} corpus)",
                    task.url,
                    fragment,
                    corpus
                );
            }
            Err(e) => {
                tracing::error!("Cannot persist corpus after {}: {}", task.url, e);
                // Recorded before aborting: `run` resumes as soon as the
                // outstanding set is cleared
                self.fatal
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert(e);
                self.scheduler.abort();
            }
        }
    }

    fn transition(&self, task: &mut CrawlTask, to: TaskState) {
        if let Err(e) = task.state.transition(to) {
            tracing::error!("Task {}: {}", task.url, e);
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }
}

/// Runs a complete crawl from `start_url`
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `request` - Languages and output path
/// * `start_url` - First page to crawl
pub async fn run_crawl(
    config: &Config,
    request: CrawlRequest,
    start_url: &str,
) -> Result<CrawlReport, LexiError> {
    let crawler = Crawler::new(config, request)?;
    crawler.run(start_url).await
}
