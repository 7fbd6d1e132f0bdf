//! Lexicrawl main entry point
//!
//! This is the command-line interface for the Lexicrawl corpus crawler.

use clap::Parser;
use lexicrawl::config::{load_config_with_hash, Config};
use lexicrawl::crawler::{parse_target_languages, run_crawl, CrawlRequest};
use lexicrawl::output::print_report;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Lexicrawl: a language-model driven corpus crawler
///
/// Lexicrawl walks a site page by page, asks an inference service to pull
/// either plain sentences or dictionary entries out of every page, follows
/// the pagination link the service finds, and writes everything into one
/// JSON file. Values not given as flags are asked for interactively.
#[derive(Parser, Debug)]
#[command(name = "lexicrawl")]
#[command(version = "1.0.0")]
#[command(about = "A language-model driven corpus crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Page to start crawling from
    #[arg(short, long)]
    url: Option<String>,

    /// Language of the crawled content
    #[arg(short, long)]
    language: Option<String>,

    /// Comma-separated target languages; selects dictionary mode
    #[arg(short, long, conflicts_with = "raw")]
    targets: Option<String>,

    /// Collect raw sentences without asking for target languages
    #[arg(long)]
    raw: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show the resolved configuration and output file without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Config::default(),
    };

    let (start_url, request) = resolve_request(&cli, &config)?;

    if cli.dry_run {
        handle_dry_run(&config, &start_url, &request);
        return Ok(());
    }

    handle_crawl(&config, request, &start_url).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lexicrawl=info,warn"),
            1 => EnvFilter::new("lexicrawl=debug,info"),
            2 => EnvFilter::new("lexicrawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Combines flags and interactive answers into the start URL and request
///
/// The target-language question is skipped when `--targets`/`--raw` was
/// given, or when both URL and language came from flags.
fn resolve_request(
    cli: &Cli,
    config: &Config,
) -> Result<(String, CrawlRequest), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let start_url = match &cli.url {
        Some(url) => url.clone(),
        None => ask(&mut input, "URL: ")?,
    };
    if start_url.is_empty() {
        return Err("a start URL is required".into());
    }

    let language = match &cli.language {
        Some(language) => language.clone(),
        None => ask(&mut input, "Language to translate: ")?,
    };
    if language.trim().is_empty() {
        return Err("a source language is required".into());
    }

    let targets = if cli.raw {
        None
    } else if let Some(targets) = &cli.targets {
        parse_target_languages(targets)
    } else if cli.url.is_some() && cli.language.is_some() {
        None
    } else {
        parse_target_languages(&ask(
            &mut input,
            "Target languages (leave none for raw content scrape): ",
        )?)
    };

    let request = CrawlRequest::new(language, targets, &config.output.directory);
    Ok((start_url, request))
}

/// Prints a question and reads one trimmed line of input
fn ask(input: &mut impl BufRead, question: &str) -> io::Result<String> {
    print!("{}", question);
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, start_url: &str, request: &CrawlRequest) {
    println!("=== Lexicrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max workers: {}", config.crawler.max_workers);
    println!("  Max attempts per page: {}", config.crawler.max_attempts);

    println!("\nFetch:");
    println!("  User agent: {}", config.fetch.user_agent);
    println!("  Timeout: {}s", config.fetch.timeout_secs);

    println!("\nInference:");
    println!("  Endpoint: {}/chat/completions", config.inference.base_url.trim_end_matches('/'));
    println!("  Model: {}", config.inference.model);
    println!(
        "  API key ({}): {}",
        config.inference.api_key_env,
        if config.inference.api_key().is_some() {
            "set"
        } else {
            "missing"
        }
    );

    println!("\nCrawl:");
    println!("  Start URL: {}", start_url);
    println!("  Source language: {}", request.source_language);
    match &request.target_languages {
        Some(targets) => println!("  Mode: dictionary ({})", targets.join(", ")),
        None => println!("  Mode: raw content"),
    }
    println!("  Output: {}", request.output_path.display());

    match lexicrawl::normalize_url(start_url) {
        Some(canonical) => println!("\n✓ Would start crawling at {}", canonical),
        None => println!("\n✗ Start URL is not a valid HTTP(S) URL"),
    }
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    request: CrawlRequest,
    start_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling {} ({} -> {})",
        start_url,
        request.source_language,
        request
            .target_languages
            .as_ref()
            .map(|targets| targets.join(", "))
            .unwrap_or_else(|| "raw content".to_string())
    );

    match run_crawl(config, request, start_url).await {
        Ok(report) => {
            tracing::info!("Crawl completed successfully");
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
