//! Integration tests for the crawler
//!
//! These tests use wiremock to serve both the crawled pages and a streaming
//! chat-completion endpoint, and run the full crawl cycle end-to-end.

use lexicrawl::config::{Config, CrawlerConfig, FetchConfig, InferenceConfig};
use lexicrawl::crawler::{CrawlRequest, Crawler};
use lexicrawl::LexiError;
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing the inference client at `base_url`
fn create_test_config(base_url: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_workers: 4,
            max_attempts: 3,
        },
        fetch: FetchConfig {
            user_agent: "TestBot/1.0".to_string(),
            timeout_secs: 5,
        },
        inference: InferenceConfig {
            base_url: base_url.to_string(),
            api_key_env: "LEXICRAWL_INTEGRATION_TEST_KEY".to_string(),
            ..InferenceConfig::default()
        },
        ..Config::default()
    }
}

/// Builds a streamed answer, one SSE event per piece
fn sse_response(pieces: &[&str]) -> ResponseTemplate {
    let mut body = String::from(": OPENROUTER PROCESSING\n\n");
    for piece in pieces {
        let event = json!({"choices": [{"index": 0, "delta": {"content": piece}}]});
        body.push_str(&format!("data: {}\n\n", event));
    }
    body.push_str("data: [DONE]\n\n");

    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

async fn mount_page(server: &MockServer, page: &str, marker: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(format!("<html><body><p>{}</p></body></html>", marker)),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_answer(server: &MockServer, marker: &str, pieces: &[&str]) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(marker))
        .respond_with(sse_response(pieces))
        .mount(server)
        .await;
}

fn read_json(path: &Path) -> Value {
    let content = std::fs::read_to_string(path).expect("Failed to read corpus");
    serde_json::from_str(&content).expect("Corpus is not valid JSON")
}

#[tokio::test]
async fn test_raw_crawl_follows_pagination() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output_dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/a", "PAGE-A").await;
    mount_page(&mock_server, "/b", "PAGE-B").await;

    // Relative link, split across events before the JSON arrives
    mount_answer(
        &mock_server,
        "PAGE-A",
        &[
            "<response><chain_of_thought>First page.</chain_of_thought><next_",
            "page>b</next_page><json>{\"corpus\": [\"Kopivosian.\", ",
            "\"Nunu ngaran nu?\"]}</json></response>",
        ],
    )
    .await;
    // Links back to the first page, which must not be fetched again
    let back_link = format!("<next_page>{}/a#top</next_page>", base_url);
    mount_answer(
        &mock_server,
        "PAGE-B",
        &[
            "<response>",
            back_link.as_str(),
            "<json>{\"corpus\": [\"Aramai tiso.\"]}</json></response>",
        ],
    )
    .await;

    let config = create_test_config(&base_url);
    let request = CrawlRequest::new("Kadazan", None, output_dir.path());
    let output_path = request.output_path.clone();

    let crawler = Crawler::new(&config, request).expect("Failed to create crawler");
    let report = crawler
        .run(&format!("{}/a", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(report.pages_succeeded, 2);
    assert_eq!(report.pages_exhausted, 0);
    assert_eq!(report.links_dispatched, 1);
    assert_eq!(report.total_entries, 3);
    assert_eq!(crawler.scheduler().visited_count(), 2);
    assert!(crawler.scheduler().is_visited(&format!("{}/b", base_url)));

    assert_eq!(output_path, output_dir.path().join("corpus_Kadazan.json"));
    let corpus = read_json(&output_path);
    let sentences = corpus.as_array().expect("Raw corpus must be an array");
    assert_eq!(sentences.len(), 3);
    assert!(sentences.contains(&json!("Aramai tiso.")));
    assert!(sentences.contains(&json!("Nunu ngaran nu?")));
}

#[tokio::test]
async fn test_dictionary_crawl_merges_entries() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output_dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/dict/a", "PAGE-A").await;
    mount_page(&mock_server, "/dict/b", "PAGE-B").await;

    let next = format!("<next_page>{}/dict/b</next_page>", base_url);
    mount_answer(
        &mock_server,
        "PAGE-A",
        &[
            "<response>",
            next.as_str(),
            r#"<json>```json
{"corpus": {"kopi": {"translations": {"English": "coffee", "Malay": "kopi"},
  "example_sentences": [{"Kadazan": "Minum kopi.", "English": "Drink coffee.", "Malay": null}]}}}
```</json></response>"#,
        ],
    )
    .await;
    mount_answer(
        &mock_server,
        "PAGE-B",
        &[r#"<response><next_page>none</next_page><json>{"corpus": {
            "kopi": {"translations": {"English": "coffee", "Malay": null}, "example_sentences": []},
            "tana": {"translations": {"English": "earth", "Malay": "tanah"}, "example_sentences": []}
        }}</json></response>"#],
    )
    .await;

    let config = create_test_config(&base_url);
    let request = CrawlRequest::new(
        "Kadazan",
        Some(vec!["English".to_string(), "Malay".to_string()]),
        output_dir.path(),
    );
    let output_path = request.output_path.clone();

    let crawler = Crawler::new(&config, request).expect("Failed to create crawler");
    let report = crawler
        .run(&format!("{}/dict/a", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(report.pages_succeeded, 2);
    assert_eq!(report.total_entries, 2);

    assert_eq!(
        output_path,
        output_dir.path().join("Kadazan_to_English_Malay.json")
    );
    let corpus = read_json(&output_path);
    let entries = corpus.as_object().expect("Dictionary must be an object");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["tana"]["translations"]["Malay"], json!("tanah"));

    // Both pages define "kopi"; exactly one of them wins
    let kopi = &entries["kopi"];
    assert_eq!(kopi["translations"]["English"], json!("coffee"));
    assert!(
        kopi["example_sentences"].as_array().map(Vec::len) == Some(1)
            || kopi["example_sentences"].as_array().map(Vec::len) == Some(0)
    );
}

#[tokio::test]
async fn test_failing_page_is_exhausted_and_crawl_completes() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output_dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/a", "PAGE-A").await;

    // Every attempt fails; each one is a full restart
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let next = format!("<next_page>{}/broken</next_page>", base_url);
    mount_answer(
        &mock_server,
        "PAGE-A",
        &[next.as_str(), "<json>{\"corpus\": [\"Kopivosian.\"]}</json>"],
    )
    .await;

    let config = create_test_config(&base_url);
    let request = CrawlRequest::new("Kadazan", None, output_dir.path());
    let output_path = request.output_path.clone();

    let crawler = Crawler::new(&config, request).expect("Failed to create crawler");
    let report = crawler
        .run(&format!("{}/a", base_url))
        .await
        .expect("A failing page must not fail the crawl");

    assert_eq!(report.pages_succeeded, 1);
    assert_eq!(report.pages_exhausted, 1);
    assert_eq!(report.failed_attempts, 3);
    assert_eq!(report.total_entries, 1);
    assert_eq!(crawler.scheduler().outstanding_count(), 0);
    assert_eq!(read_json(&output_path), json!(["Kopivosian."]));
}

#[tokio::test]
async fn test_invalid_answers_are_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("PAGE-A"))
        .expect(3)
        .mount(&mock_server)
        .await;

    // No JSON region at all
    mount_answer(
        &mock_server,
        "PAGE-A",
        &["<response><chain_of_thought>Nothing here</chain_of_thought></response>"],
    )
    .await;

    let config = create_test_config(&base_url);
    let crawler = Crawler::new(&config, CrawlRequest::new("Kadazan", None, output_dir.path()))
        .expect("Failed to create crawler");
    let report = crawler
        .run(&format!("{}/a", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(report.pages_exhausted, 1);
    assert_eq!(report.total_entries, 0);
}

#[tokio::test]
async fn test_empty_corpus_shape_follows_mode() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.crawler.max_attempts = 1;

    let raw = CrawlRequest::new("Kadazan", None, output_dir.path());
    let raw_path = raw.output_path.clone();
    let crawler = Crawler::new(&config, raw).expect("Failed to create crawler");
    crawler
        .run(&format!("{}/missing", base_url))
        .await
        .expect("Crawl failed");
    assert_eq!(read_json(&raw_path), json!([]));

    let dictionary = CrawlRequest::new("Kadazan", Some(vec!["English".to_string()]), output_dir.path());
    let dictionary_path = dictionary.output_path.clone();
    let crawler = Crawler::new(&config, dictionary).expect("Failed to create crawler");
    crawler
        .run(&format!("{}/missing", base_url))
        .await
        .expect("Crawl failed");
    assert_eq!(read_json(&dictionary_path), json!({}));
}

#[tokio::test]
async fn test_next_page_dispatched_before_payload_parses() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output_dir = TempDir::new().unwrap();

    // Every attempt at A reveals B and then breaks off without a JSON region
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("PAGE-A"))
        .expect(3)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/b", "PAGE-B").await;

    let next = format!("<next_page>{}/b</next_page>", base_url);
    mount_answer(
        &mock_server,
        "PAGE-A",
        &["<response>", next.as_str(), "<json>{\"corpus\": [\"trunc"],
    )
    .await;
    mount_answer(
        &mock_server,
        "PAGE-B",
        &[r#"<json>{"corpus": {
            "kopi": {"translations": {"English": "coffee"}, "example_sentences": []},
            "tana": {"translations": {"English": "earth"}, "example_sentences": []}
        }}</json>"#],
    )
    .await;

    let config = create_test_config(&base_url);
    let request = CrawlRequest::new("Kadazan", Some(vec!["English".to_string()]), output_dir.path());
    let output_path = request.output_path.clone();

    let crawler = Crawler::new(&config, request).expect("Failed to create crawler");
    let report = crawler
        .run(&format!("{}/a", base_url))
        .await
        .expect("Crawl failed");

    // A never produced a fragment, yet the page it pointed to was crawled
    assert_eq!(report.pages_exhausted, 1);
    assert_eq!(report.pages_succeeded, 1);
    assert_eq!(report.failed_attempts, 3);
    assert_eq!(report.links_dispatched, 1);
    assert_eq!(report.total_entries, 2);
    assert!(crawler.scheduler().is_visited(&format!("{}/b", base_url)));

    let corpus = read_json(&output_path);
    assert_eq!(corpus.as_object().map(|entries| entries.len()), Some(2));
    assert_eq!(corpus["tana"]["translations"]["English"], json!("earth"));
}

#[tokio::test]
async fn test_output_failure_cancels_pages_in_flight() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let output_dir = TempDir::new().unwrap();

    mount_page(&mock_server, "/a", "PAGE-A").await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("PAGE-SLOW"))
        .mount(&mock_server)
        .await;

    mount_answer(
        &mock_server,
        "PAGE-A",
        &["<json>{\"corpus\": [\"Kopivosian.\"]}</json>"],
    )
    .await;
    // Still streaming long after the first merge has failed
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("PAGE-SLOW"))
        .respond_with(
            sse_response(&["<json>{\"corpus\": [\"Late.\"]}</json>"])
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let request = CrawlRequest::new("Kadazan", None, output_dir.path());
    let output_path = request.output_path.clone();
    let crawler = Crawler::new(&config, request).expect("Failed to create crawler");

    // The snapshot can no longer replace the corpus file
    std::fs::remove_file(&output_path).unwrap();
    std::fs::create_dir(&output_path).unwrap();

    assert!(crawler.enqueue(&format!("{}/slow", base_url)));
    let started = Instant::now();
    let result = crawler.run(&format!("{}/a", base_url)).await;

    assert!(
        matches!(result, Err(LexiError::Output(_))),
        "expected an output error, got {:?}",
        result.map(|report| report.total_entries)
    );
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "crawl kept running for {:?} after the output failure",
        started.elapsed()
    );
    assert!(crawler.scheduler().is_aborted());
    assert_eq!(crawler.scheduler().outstanding_count(), 0);
}
