//! Streaming chat-completion client
//!
//! Requests are sent with `stream: true` and the answer is consumed as
//! Server-Sent Events: `data: {chunk}` lines, `:` comment lines used as
//! keep-alives, and a final `data: [DONE]`.

use crate::config::InferenceConfig;
use crate::corpus::PageFragment;
use crate::inference::prompt::build_prompt;
use crate::inference::response::{parse_response, NextPageDetector};
use crate::ExtractionError;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Result of one extraction call
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The model's reasoning, kept for diagnostics
    pub reasoning: Option<String>,
    /// Raw content of the `<next_page>` region
    pub next_page: Option<String>,
    /// Parsed fragment; `None` when the payload had no `corpus` key
    pub fragment: Option<PageFragment>,
    /// Length in bytes of the full streamed answer
    pub response_len: usize,
}

/// Client for the extraction endpoint
#[derive(Debug, Clone)]
pub struct ExtractionClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f64,
}

impl ExtractionClient {
    /// Builds a client from configuration, reading the API key from the
    /// configured environment variable
    ///
    /// No overall request timeout is set; answers can stream for minutes.
    pub fn new(config: &InferenceConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        if config.api_key().is_none() {
            tracing::warn!(
                "{} is not set, inference requests will be sent without credentials",
                config.api_key_env
            );
        }

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key(),
            temperature: config.temperature,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Runs one extraction over a page
    ///
    /// `on_next_page` is called synchronously, at most once, with the raw
    /// `<next_page>` content as soon as that region closes in the stream,
    /// before the rest of the answer has arrived.
    ///
    /// # Returns
    ///
    /// * `Ok(Extraction)` - The stream completed and held a valid JSON region
    /// * `Err(ExtractionError)` - Transport, service, or parse failure
    pub async fn extract<F>(
        &self,
        page_text: &str,
        source_language: &str,
        target_languages: Option<&[String]>,
        mut on_next_page: F,
    ) -> Result<Extraction, ExtractionError>
    where
        F: FnMut(&str),
    {
        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": build_prompt(page_text, source_language, target_languages),
                }
            ],
            "temperature": self.temperature,
            "stream": true,
        });

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = response.bytes_stream();
        let mut lines = SseLineBuffer::default();
        let mut detector = NextPageDetector::new();
        let mut accumulated = String::new();

        'stream: while let Some(chunk) = stream.next().await {
            for line in lines.push(&chunk?) {
                match handle_line(&line, &mut accumulated)? {
                    LineResult::Done => break 'stream,
                    LineResult::Appended => {
                        if let Some(next_page) = detector.scan(&accumulated) {
                            on_next_page(&next_page);
                        }
                    }
                    LineResult::Ignored => {}
                }
            }
        }

        // A final event without a trailing newline
        if let Some(line) = lines.finish() {
            if let LineResult::Appended = handle_line(&line, &mut accumulated)? {
                if let Some(next_page) = detector.scan(&accumulated) {
                    on_next_page(&next_page);
                }
            }
        }

        let parsed = parse_response(&accumulated)?;
        Ok(Extraction {
            reasoning: parsed.reasoning,
            next_page: parsed.next_page,
            fragment: parsed.fragment,
            response_len: accumulated.len(),
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LineResult {
    Appended,
    Ignored,
    Done,
}

/// Applies one SSE line to the accumulated answer
fn handle_line(line: &str, accumulated: &mut String) -> Result<LineResult, ExtractionError> {
    let Some(data) = line.strip_prefix("data:") else {
        // Blank separators, `:` keep-alives, `event:`/`id:` fields
        return Ok(LineResult::Ignored);
    };
    let data = data.trim();

    if data == "[DONE]" {
        return Ok(LineResult::Done);
    }
    if data.is_empty() {
        return Ok(LineResult::Ignored);
    }

    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| ExtractionError::Event(e.to_string()))?;

    if let Some(error) = chunk.error {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(ExtractionError::Service(message));
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();

    if content.is_empty() {
        return Ok(LineResult::Ignored);
    }
    accumulated.push_str(&content);
    Ok(LineResult::Appended)
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Splits a byte stream into lines
///
/// Network chunks can end in the middle of a line, or in the middle of a
/// multi-byte character, so bytes are held until a newline arrives.
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line));
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}
