//! Parsing of tagged regions in the model's answer

use crate::corpus::PageFragment;
use crate::ExtractionError;
use serde::Deserialize;

const NEXT_PAGE_OPEN: &[u8] = b"<next_page>";
const NEXT_PAGE_CLOSE: &[u8] = b"</next_page>";

/// Returns the content of the first `<tag>...</tag>` region
///
/// The closing tag is the first one after the opening tag. Content is
/// returned untrimmed.
pub fn extract_region<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = text.find(&open)? + open.len();
    let end = start + text[start..].find(&close)?;
    Some(&text[start..end])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    Searching,
    Found,
}

/// One-shot detector for a closed `<next_page>` region in streamed text
///
/// Feed it the accumulated response after every increment. The first time
/// the region is complete its content is returned; every later call returns
/// `None`.
#[derive(Debug)]
pub struct NextPageDetector {
    state: DetectorState,
    /// Byte offset just past `<next_page>`, once seen
    content_start: Option<usize>,
    /// Bytes of the accumulated text already searched
    scanned: usize,
}

impl Default for NextPageDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl NextPageDetector {
    pub fn new() -> Self {
        Self {
            state: DetectorState::Searching,
            content_start: None,
            scanned: 0,
        }
    }

    /// Returns true once the region has been reported
    pub fn is_found(&self) -> bool {
        self.state == DetectorState::Found
    }

    /// Scans the accumulated text, returning the trimmed region content the
    /// first time it is complete
    pub fn scan(&mut self, accumulated: &str) -> Option<String> {
        if self.state == DetectorState::Found {
            return None;
        }

        let bytes = accumulated.as_bytes();

        let content_start = match self.content_start {
            Some(start) => start,
            None => {
                // A tag may straddle the previous scan boundary
                let from = self.scanned.saturating_sub(NEXT_PAGE_OPEN.len() - 1);
                match find_bytes(bytes, NEXT_PAGE_OPEN, from) {
                    Some(pos) => {
                        let start = pos + NEXT_PAGE_OPEN.len();
                        self.content_start = Some(start);
                        start
                    }
                    None => {
                        self.scanned = bytes.len();
                        return None;
                    }
                }
            }
        };

        let from = content_start.max(self.scanned.saturating_sub(NEXT_PAGE_CLOSE.len() - 1));
        match find_bytes(bytes, NEXT_PAGE_CLOSE, from) {
            Some(end) => {
                self.state = DetectorState::Found;
                // Both offsets sit on ASCII tag boundaries
                Some(accumulated[content_start..end].trim().to_string())
            }
            None => {
                self.scanned = bytes.len();
                None
            }
        }
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// The JSON region's envelope
#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    corpus: Option<PageFragment>,
}

/// A fully parsed model answer
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// The model's reasoning; only ever logged
    pub reasoning: Option<String>,
    /// Raw content of the `<next_page>` region
    pub next_page: Option<String>,
    /// The page fragment, or `None` if the payload had no `corpus` key
    pub fragment: Option<PageFragment>,
}

/// Parses a complete answer
///
/// Only the JSON region is mandatory. A missing reasoning or pagination
/// region is tolerated.
///
/// # Returns
///
/// * `Ok(ParsedResponse)` - The JSON region held a valid payload object
/// * `Err(ExtractionError)` - The JSON region is missing or invalid
pub fn parse_response(text: &str) -> Result<ParsedResponse, ExtractionError> {
    let reasoning = extract_region(text, "chain_of_thought").map(|r| r.trim().to_string());
    let next_page = extract_region(text, "next_page").map(|n| n.trim().to_string());

    let json = extract_region(text, "json").ok_or(ExtractionError::MissingRegion("json"))?;
    let payload: Payload = serde_json::from_str(strip_code_fence(json))?;

    Ok(ParsedResponse {
        reasoning,
        next_page,
        fragment: payload.corpus,
    })
}

/// Removes a Markdown code fence the model sometimes wraps JSON in
fn strip_code_fence(json: &str) -> &str {
    let trimmed = json.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
