//! Inference module: delegating extraction to a language model
//!
//! The page text is sent to an OpenAI-compatible chat-completion endpoint
//! together with instructions that ask for three tagged regions:
//!
//! ```text
//! <response>
//!     <chain_of_thought>...</chain_of_thought>
//!     <next_page>...</next_page>
//!     <json>{"corpus": ...}</json>
//! </response>
//! ```
//!
//! The answer is streamed. The pagination region usually closes long before
//! the JSON region, so the stream is scanned as it arrives and the next page
//! is reported the moment its closing tag appears.

mod client;
mod prompt;
mod response;

pub use client::{Extraction, ExtractionClient};
pub use prompt::{build_prompt, dictionary_instructions, raw_content_instructions};
pub use response::{extract_region, parse_response, NextPageDetector, ParsedResponse};
