//! Corpus module: the shared result of a crawl
//!
//! A corpus is either a sequence of sentences (raw mode) or a mapping from
//! word to [`DictionaryEntry`] (dictionary mode). Its shape is fixed when the
//! crawl starts. Every page produces a [`PageFragment`] of the same shape,
//! which the [`Aggregator`] merges in and persists.

mod aggregator;
mod types;

pub use aggregator::{merge, Aggregator, MergeOutcome};
pub use types::{Corpus, CorpusShape, DictionaryEntry, PageFragment};
