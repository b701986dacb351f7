//! Data model shared by the store, the tables and the providers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::similarity::magnitude;

/// Bounds every document payload must satisfy: cloneable, JSON-serializable
/// (for filtering, size accounting and persistence) and shareable across tasks.
pub trait Metadata: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Metadata for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Default number of results for a similarity search.
pub const DEFAULT_K: usize = 4;

/// A stored unit of knowledge.
///
/// `vector` and `vector_mag` are private so the magnitude can only change
/// together with the vector. Deserialized documents get their magnitude
/// recomputed from the stored vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDocument<T>")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Document<T> {
    /// Identity assigned by the document table. Not used by in-memory logic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub text: String,
    pub metadata: T,
    vector: Vec<f32>,
    vector_mag: f32,
    /// Ingestion time, epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub hits: u64,
}

#[derive(Deserialize)]
struct RawDocument<T> {
    #[serde(default)]
    id: Option<i64>,
    text: String,
    metadata: T,
    #[serde(default)]
    vector: Vec<f32>,
    timestamp: i64,
    #[serde(default)]
    hits: u64,
}

impl<T> From<RawDocument<T>> for Document<T> {
    fn from(raw: RawDocument<T>) -> Self {
        let mut doc = Document::new(raw.text, raw.metadata, raw.vector, raw.timestamp);
        doc.id = raw.id;
        doc.hits = raw.hits;
        doc
    }
}

impl<T> Document<T> {
    /// Create a document with zero hits; the magnitude is derived from `vector`.
    pub fn new(text: impl Into<String>, metadata: T, vector: Vec<f32>, timestamp: i64) -> Self {
        let vector_mag = magnitude(&vector);
        Self {
            id: None,
            text: text.into(),
            metadata,
            vector,
            vector_mag,
            timestamp,
            hits: 0,
        }
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// Precomputed Euclidean norm of [`Self::vector`].
    pub fn vector_mag(&self) -> f32 {
        self.vector_mag
    }

    /// Replace the embedding, recomputing its magnitude.
    pub fn set_vector(&mut self, vector: Vec<f32>) {
        self.vector_mag = magnitude(&vector);
        self.vector = vector;
    }

    /// Eviction ordering key: least-hit first, then oldest first.
    pub fn eviction_key(&self) -> (u64, i64) {
        (self.hits, self.timestamp)
    }
}

/// A single text or a set of texts to match by exact equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextMatch {
    One(String),
    Many(Vec<String>),
}

impl TextMatch {
    pub fn contains(&self, text: &str) -> bool {
        match self {
            TextMatch::One(t) => t == text,
            TextMatch::Many(ts) => ts.iter().any(|t| t == text),
        }
    }
}

impl From<&str> for TextMatch {
    fn from(text: &str) -> Self {
        TextMatch::One(text.to_string())
    }
}

impl From<Vec<String>> for TextMatch {
    fn from(texts: Vec<String>) -> Self {
        TextMatch::Many(texts)
    }
}

/// Constraints a document must satisfy; every given constraint must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Partial key → value match against the document's serialized metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextMatch>,
}

impl FilterCriteria {
    pub fn metadata_eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<TextMatch>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// A document passes iff it matches `include` (when given) and does not
/// match `exclude` (when given).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<FilterCriteria>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<FilterCriteria>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_options: Option<FilterOptions>,
    #[serde(default)]
    pub include_values: bool,
}

fn default_k() -> usize { DEFAULT_K }

impl SearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            k: DEFAULT_K,
            filter_options: None,
            include_values: false,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_filter(mut self, filter: FilterOptions) -> Self {
        self.filter_options = Some(filter);
        self
    }

    pub fn with_values(mut self, include_values: bool) -> Self {
        self.include_values = include_values;
        self
    }
}

/// A search hit: the document (vector stripped unless requested) plus its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub text: String,
    pub metadata: T,
    pub timestamp: i64,
    pub hits: u64,
    /// Normalized cosine similarity in [0, 1]; NaN for zero-magnitude vectors.
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_mag: Option<f32>,
}

impl<T: Clone> SearchItem<T> {
    pub fn from_document(doc: &Document<T>, score: f32, include_values: bool) -> Self {
        Self {
            id: doc.id,
            text: doc.text.clone(),
            metadata: doc.metadata.clone(),
            timestamp: doc.timestamp,
            hits: doc.hits,
            score,
            vector: include_values.then(|| doc.vector.clone()),
            vector_mag: include_values.then_some(doc.vector_mag),
        }
    }
}

/// The query text and the embedding computed for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEmbedding {
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    pub similar_items: Vec<SearchItem<T>>,
    pub query: QueryEmbedding,
}

/// Result of writing the in-memory collection to the document table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlushOutcome {
    Persisted { count: usize },
    Failed { reason: String },
    /// No flush was needed (e.g. a search with no results).
    Skipped,
}

impl FlushOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, FlushOutcome::Persisted { .. })
    }
}
