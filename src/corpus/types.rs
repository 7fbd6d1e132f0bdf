use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// One dictionary headword and everything extracted about it
///
/// Maps keep the order the extractor wrote them in. A `null` where a
/// collection is expected reads as empty, and `null` example sentences are
/// skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Target language → translation (`None` when the page has none)
    #[serde(default, deserialize_with = "null_as_default")]
    pub translations: IndexMap<String, Option<String>>,

    /// Example sentences, each keyed by language
    #[serde(default, deserialize_with = "nullable_list")]
    pub example_sentences: Vec<IndexMap<String, Option<String>>>,

    /// Any additional fields the extractor produced, kept verbatim
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A list whose `null` items are dropped
fn skip_null_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Vec::<Option<T>>::deserialize(deserializer)?;
    Ok(items.into_iter().flatten().collect())
}

/// Like [`skip_null_items`], and a `null` list is empty
fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items.into_iter().flatten().flatten().collect())
}

/// The shape of a corpus, chosen once per crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorpusShape {
    /// Ordered list of sentences
    Sequence,
    /// Word → dictionary entry
    Mapping,
}

impl CorpusShape {
    /// Dictionary mode is selected by the presence of target languages
    pub fn for_targets<T>(target_languages: Option<&[T]>) -> Self {
        match target_languages {
            Some(targets) if !targets.is_empty() => Self::Mapping,
            _ => Self::Sequence,
        }
    }
}

impl fmt::Display for CorpusShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Mapping => write!(f, "mapping"),
        }
    }
}

/// The aggregate output of a crawl
///
/// Dictionary words are written in the order they were first merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Corpus {
    Sentences(Vec<String>),
    Entries(IndexMap<String, DictionaryEntry>),
}

impl Corpus {
    /// Creates an empty corpus of the given shape
    pub fn empty(shape: CorpusShape) -> Self {
        match shape {
            CorpusShape::Sequence => Self::Sentences(Vec::new()),
            CorpusShape::Mapping => Self::Entries(IndexMap::new()),
        }
    }

    pub fn shape(&self) -> CorpusShape {
        match self {
            Self::Sentences(_) => CorpusShape::Sequence,
            Self::Entries(_) => CorpusShape::Mapping,
        }
    }

    /// Number of sentences or dictionary words
    pub fn len(&self) -> usize {
        match self {
            Self::Sentences(sentences) => sentences.len(),
            Self::Entries(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One page's extracted contribution, before it is merged
///
/// `null` items in a sentence list are dropped rather than failing the page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PageFragment {
    Sentences(#[serde(deserialize_with = "skip_null_items")] Vec<String>),
    Entries(IndexMap<String, DictionaryEntry>),
}

impl PageFragment {
    pub fn shape(&self) -> CorpusShape {
        match self {
            Self::Sentences(_) => CorpusShape::Sequence,
            Self::Entries(_) => CorpusShape::Mapping,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Sentences(sentences) => sentences.len(),
            Self::Entries(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
