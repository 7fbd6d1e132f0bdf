//! Corpus aggregation
//!
//! Workers finish in whatever order the network allows, so merges arrive in
//! completion order. On a dictionary key collision the fragment merged last
//! wins; which page that is can differ between runs.

use crate::corpus::types::{Corpus, CorpusShape, PageFragment};
use crate::output::SnapshotWriter;
use crate::OutputError;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Result of merging one fragment into the corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The fragment was merged; `added` is the fragment's entry count
    Merged { added: usize },
    /// The fragment's shape disagrees with the corpus and was dropped
    ShapeMismatch {
        corpus: CorpusShape,
        fragment: CorpusShape,
    },
}

/// Merges a fragment into a corpus in place
///
/// Sentences are appended in order. Dictionary entries are merged key-wise
/// and a fragment value replaces an existing entry under the same word.
pub fn merge(corpus: &mut Corpus, fragment: PageFragment) -> MergeOutcome {
    match (corpus, fragment) {
        (Corpus::Sentences(sentences), PageFragment::Sentences(new)) => {
            let added = new.len();
            sentences.extend(new);
            MergeOutcome::Merged { added }
        }
        (Corpus::Entries(entries), PageFragment::Entries(new)) => {
            let added = new.len();
            entries.extend(new);
            MergeOutcome::Merged { added }
        }
        (corpus, fragment) => MergeOutcome::ShapeMismatch {
            corpus: corpus.shape(),
            fragment: fragment.shape(),
        },
    }
}

struct CorpusState {
    corpus: Corpus,
    /// Incremented on every successful merge
    generation: u64,
}

/// Thread-safe owner of the run's corpus and its on-disk snapshot
///
/// The corpus guard covers only the merge and the snapshot copy; the copy is
/// serialized and written after the guard is released, under the writer's own
/// guard.
pub struct Aggregator {
    state: Mutex<CorpusState>,
    writer: SnapshotWriter,
}

impl Aggregator {
    /// Creates an aggregator with an empty corpus and writes the initial
    /// snapshot
    ///
    /// # Returns
    ///
    /// * `Ok(Aggregator)` - The output path is writable
    /// * `Err(OutputError)` - The output path cannot be created or written
    pub fn new(shape: CorpusShape, path: impl Into<PathBuf>) -> Result<Self, OutputError> {
        let writer = SnapshotWriter::create(path)?;
        let corpus = Corpus::empty(shape);
        writer.write(0, &corpus)?;

        Ok(Self {
            state: Mutex::new(CorpusState {
                corpus,
                generation: 0,
            }),
            writer,
        })
    }

    /// Merges a page fragment and persists the resulting corpus
    ///
    /// A shape mismatch adds nothing and does not touch the snapshot.
    ///
    /// # Returns
    ///
    /// * `Ok(MergeOutcome)` - The fragment was merged (and persisted) or dropped
    /// * `Err(OutputError)` - The snapshot could not be written
    pub fn merge(&self, fragment: PageFragment) -> Result<MergeOutcome, OutputError> {
        let (outcome, generation, snapshot) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let outcome = merge(&mut state.corpus, fragment);
            if let MergeOutcome::ShapeMismatch { .. } = outcome {
                return Ok(outcome);
            }
            state.generation += 1;
            (outcome, state.generation, state.corpus.clone())
        };

        self.writer.write(generation, &snapshot)?;
        Ok(outcome)
    }

    /// Number of entries currently in the corpus
    pub fn entry_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .corpus
            .len()
    }

    /// Returns a copy of the current corpus
    pub fn snapshot(&self) -> Corpus {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .corpus
            .clone()
    }

    pub fn shape(&self) -> CorpusShape {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .corpus
            .shape()
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        self.writer.path()
    }
}
