//! The document store: lazy hydration, deduplicated ingestion, similarity
//! search with hit counting, size-bounded eviction and whole-table flushes.
//!
//! There is no lock spanning an operation. The collection is only locked
//! between suspension points (embedding and table calls), so two concurrent
//! writers can interleave and the slower flush wins. Callers that need strict
//! sequencing must serialize calls themselves.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;
use vecstash_core::config::{Durability, StoreConfig};
use vecstash_core::error::{Result, VecStashError};
use vecstash_core::similarity;
use vecstash_core::traits::{DocumentTable, Embedder};
use vecstash_core::types::{
    Document, FlushOutcome, Metadata, QueryEmbedding, SearchItem, SearchParams, SearchResponse,
};

use crate::eviction::{self, Eviction};
use crate::filter;
use crate::table::MemoryTable;

/// Hydration lifecycle of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Nothing loaded from the table yet.
    Uninitialized,
    /// A load from the table is in flight.
    Hydrating,
    /// In-memory collection is authoritative.
    Live,
}

pub struct VectorStore<T> {
    embedder: Arc<dyn Embedder>,
    table: Arc<dyn DocumentTable<T>>,
    config: StoreConfig,
    documents: Mutex<Vec<Document<T>>>,
    hydrated: OnceCell<()>,
    hydrating: AtomicBool,
    last_flush: Mutex<FlushOutcome>,
}

/// Builder for [`VectorStore`]. An embedder is mandatory; the table
/// defaults to an in-process [`MemoryTable`].
pub struct VectorStoreBuilder<T> {
    embedder: Option<Arc<dyn Embedder>>,
    table: Option<Arc<dyn DocumentTable<T>>>,
    config: StoreConfig,
}

impl<T: Metadata> Default for VectorStoreBuilder<T> {
    fn default() -> Self {
        Self {
            embedder: None,
            table: None,
            config: StoreConfig::default(),
        }
    }
}

impl<T: Metadata> VectorStoreBuilder<T> {
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn table(mut self, table: Arc<dyn DocumentTable<T>>) -> Self {
        self.table = Some(table);
        self
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_size_in_mb(mut self, max_size_in_mb: f64) -> Self {
        self.config.max_size_in_mb = max_size_in_mb;
        self
    }

    pub fn durability(mut self, durability: Durability) -> Self {
        self.config.durability = durability;
        self
    }

    pub fn build(self) -> Result<VectorStore<T>> {
        let embedder = self.embedder.ok_or_else(|| {
            tracing::error!("VectorStore: pass a valid embedder to use");
            VecStashError::Config("VectorStore: pass a valid embedder to use".into())
        })?;
        let table = self.table.unwrap_or_else(|| {
            tracing::debug!("No document table given, documents will not outlive the process");
            Arc::new(MemoryTable::new())
        });
        VectorStore::new(embedder, table, self.config)
    }
}

impl<T: Metadata> VectorStore<T> {
    pub fn builder() -> VectorStoreBuilder<T> {
        VectorStoreBuilder::default()
    }

    pub fn new(
        embedder: Arc<dyn Embedder>,
        table: Arc<dyn DocumentTable<T>>,
        config: StoreConfig,
    ) -> Result<Self> {
        config.validate()?;
        if config.debounce_time_ms > 0 {
            tracing::debug!(
                "debounce_time_ms = {} accepted; flushes are not debounced",
                config.debounce_time_ms
            );
        }
        tracing::info!(
            "📚 Vector store ready (embedder: {}, table: {}, budget: {} MB)",
            embedder.name(),
            table.name(),
            config.max_size_in_mb
        );
        Ok(Self {
            embedder,
            table,
            config,
            documents: Mutex::new(Vec::new()),
            hydrated: OnceCell::new(),
            hydrating: AtomicBool::new(false),
            last_flush: Mutex::new(FlushOutcome::Skipped),
        })
    }

    // ─── Public API ───────────────────────────────────────────

    /// Add one text. `Ok(None)` means the text was already stored.
    pub async fn add_text(&self, text: impl Into<String>, metadata: T) -> Result<Option<Document<T>>> {
        let mut added = self.add_texts(vec![text.into()], vec![metadata]).await?;
        Ok(added.pop())
    }

    /// Add many texts, embedding the new ones in a single provider call.
    ///
    /// Texts already stored (or repeated within `texts`) are skipped, not
    /// updated. Returns only the documents that were added.
    pub async fn add_texts(&self, texts: Vec<String>, metadatas: Vec<T>) -> Result<Vec<Document<T>>> {
        if texts.len() != metadatas.len() {
            return Err(VecStashError::InvalidArgument(format!(
                "The lengths of texts ({}) and metadatas ({}) must match",
                texts.len(),
                metadatas.len()
            )));
        }
        self.ensure_hydrated().await?;

        let pending: Vec<(String, T)> = {
            let docs = self.lock_documents()?;
            let mut seen: HashSet<&str> = docs.iter().map(|d| d.text.as_str()).collect();
            let mut pending = Vec::new();
            for (text, metadata) in texts.iter().zip(metadatas) {
                if seen.insert(text.as_str()) {
                    pending.push((text.clone(), metadata));
                } else {
                    tracing::debug!("Skipping duplicate text ({} chars)", text.len());
                }
            }
            pending
        };
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let batch: Vec<String> = pending.iter().map(|(text, _)| text.clone()).collect();
        let vectors = self.embedder.embed_texts(&batch).await?;
        if vectors.len() != batch.len() {
            return Err(VecStashError::Provider(format!(
                "{} returned {} embeddings for {} texts",
                self.embedder.name(),
                vectors.len(),
                batch.len()
            )));
        }

        let timestamp = now_millis();
        let (added, snapshot) = {
            let mut docs = self.lock_documents()?;
            // Another call may have stored the same text while we were embedding.
            let existing: HashSet<String> = docs.iter().map(|d| d.text.clone()).collect();
            let added: Vec<Document<T>> = pending
                .into_iter()
                .zip(vectors)
                .filter(|((text, _), _)| !existing.contains(text))
                .map(|((text, metadata), vector)| Document::new(text, metadata, vector, timestamp))
                .collect();
            if added.is_empty() {
                return Ok(added);
            }
            docs.extend(added.iter().cloned());
            self.evict_locked(&mut docs)?;
            (added, docs.clone())
        };

        tracing::debug!("➕ Added {} documents", added.len());
        self.persist(snapshot).await?;
        Ok(added)
    }

    /// Score every document passing the filter against `params.query` and
    /// return the top `k`, most similar first.
    pub async fn similarity_search(&self, params: SearchParams) -> Result<SearchResponse<T>> {
        self.ensure_hydrated().await?;

        let embedding = self.embedder.embed_text(&params.query).await?;
        let query_mag = similarity::magnitude(&embedding);

        let (similar_items, snapshot) = {
            let mut docs = self.lock_documents()?;
            let candidates = filter::filter_indices(&docs, params.filter_options.as_ref());

            let mut scored: Vec<(usize, f32)> = candidates
                .into_iter()
                .map(|i| {
                    let doc = &docs[i];
                    (i, similarity::score(doc.vector(), doc.vector_mag(), &embedding, query_mag))
                })
                .collect();
            // Stable: equal scores keep collection order.
            scored.sort_by(|a, b| rank_key(b.1).total_cmp(&rank_key(a.1)));
            scored.truncate(params.k);

            let items: Vec<SearchItem<T>> = scored
                .iter()
                .map(|&(i, score)| {
                    let doc = &mut docs[i];
                    doc.hits += 1;
                    SearchItem::from_document(doc, score, params.include_values)
                })
                .collect();

            let snapshot = if items.is_empty() {
                None
            } else {
                self.evict_locked(&mut docs)?;
                Some(docs.clone())
            };
            (items, snapshot)
        };

        if let Some(snapshot) = snapshot {
            self.persist(snapshot).await?;
        }

        Ok(SearchResponse {
            similar_items,
            query: QueryEmbedding {
                text: params.query,
                embedding,
            },
        })
    }

    /// Drop every document and flush the empty collection.
    ///
    /// Does not hydrate first: the store goes straight to `Live` with an
    /// empty collection.
    pub async fn reset_db(&self) -> Result<FlushOutcome> {
        self.lock_documents()?.clear();
        let _ = self.hydrated.set(());
        tracing::info!("🗑️ Vector store reset");
        self.persist(Vec::new()).await
    }

    /// Write the current collection to the table.
    pub async fn flush(&self) -> Result<FlushOutcome> {
        self.ensure_hydrated().await?;
        let snapshot = self.lock_documents()?.clone();
        self.persist(snapshot).await
    }

    // ─── Read-only views ──────────────────────────────────────

    /// Copy of the in-memory collection.
    pub async fn documents(&self) -> Result<Vec<Document<T>>> {
        self.ensure_hydrated().await?;
        Ok(self.lock_documents()?.clone())
    }

    pub async fn len(&self) -> Result<usize> {
        self.ensure_hydrated().await?;
        Ok(self.lock_documents()?.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Serialized size of the in-memory collection.
    pub async fn size_in_mb(&self) -> Result<f64> {
        self.ensure_hydrated().await?;
        eviction::size_in_mb(&self.lock_documents()?)
    }

    pub fn state(&self) -> StoreState {
        if self.hydrated.initialized() {
            StoreState::Live
        } else if self.hydrating.load(Ordering::Acquire) {
            StoreState::Hydrating
        } else {
            StoreState::Uninitialized
        }
    }

    pub fn max_size_in_mb(&self) -> f64 {
        self.config.max_size_in_mb
    }

    pub fn debounce_time(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.config.debounce_time_ms)
    }

    pub fn durability(&self) -> Durability {
        self.config.durability
    }

    /// Outcome of the most recent flush (`Skipped` before the first one).
    pub fn last_flush(&self) -> FlushOutcome {
        self.last_flush
            .lock()
            .map(|f| f.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    // ─── Internals ────────────────────────────────────────────

    fn lock_documents(&self) -> Result<MutexGuard<'_, Vec<Document<T>>>> {
        self.documents
            .lock()
            .map_err(|e| VecStashError::Other(format!("document lock poisoned: {e}")))
    }

    /// Load the table once; concurrent first callers share one load.
    async fn ensure_hydrated(&self) -> Result<()> {
        self.hydrated.get_or_try_init(|| self.hydrate()).await?;
        Ok(())
    }

    async fn hydrate(&self) -> Result<()> {
        self.hydrating.store(true, Ordering::Release);
        let loaded = self.table.read_all().await;
        self.hydrating.store(false, Ordering::Release);
        let loaded = loaded?;

        let count = loaded.len();
        let Eviction { kept, evicted } = eviction::evict(loaded, self.config.max_size_in_mb)?;
        if !evicted.is_empty() {
            tracing::info!("🧹 Evicted {} documents on load (over {} MB)", evicted.len(), self.config.max_size_in_mb);
        }
        *self.lock_documents()? = kept;
        tracing::debug!("📂 Hydrated {count} documents from {}", self.table.name());
        Ok(())
    }

    /// Evict in place. Sizes are measured before the collection is taken, so
    /// a serialization failure leaves it untouched.
    fn evict_locked(&self, docs: &mut Vec<Document<T>>) -> Result<()> {
        let sizes = eviction::document_sizes(docs)?;
        let Eviction { kept, evicted } =
            eviction::evict_sized(std::mem::take(docs), sizes, self.config.max_size_in_mb);
        *docs = kept;
        if !evicted.is_empty() {
            tracing::info!(
                "🧹 Evicted {} documents (over {} MB)",
                evicted.len(),
                self.config.max_size_in_mb
            );
        }
        Ok(())
    }

    async fn persist(&self, snapshot: Vec<Document<T>>) -> Result<FlushOutcome> {
        let outcome = match self.table.replace_all(&snapshot).await {
            Ok(()) => FlushOutcome::Persisted { count: snapshot.len() },
            Err(e) => {
                tracing::warn!("⚠️ Failed to save documents to {}: {e}", self.table.name());
                FlushOutcome::Failed { reason: e.to_string() }
            }
        };
        if let Ok(mut last) = self.last_flush.lock() {
            *last = outcome.clone();
        }
        match (&outcome, self.config.durability) {
            (FlushOutcome::Failed { reason }, Durability::Strict) => {
                Err(VecStashError::Persistence(reason.clone()))
            }
            _ => Ok(outcome),
        }
    }
}

impl<T> fmt::Display for VectorStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VectorStore: {}", self.embedder.name())
    }
}

/// NaN scores rank below every real score; the item keeps its NaN.
fn rank_key(score: f32) -> f32 {
    if score.is_nan() { f32::NEG_INFINITY } else { score }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use vecstash_core::types::{FilterCriteria, FilterOptions, TextMatch};

    /// Lookup-table embedder; unknown texts map to a fixed vector.
    #[derive(Default)]
    struct MockEmbedder {
        vectors: HashMap<String, Vec<f32>>,
        batches: Mutex<Vec<usize>>,
        single_calls: AtomicUsize,
        wrong_count: bool,
    }

    impl MockEmbedder {
        fn with(pairs: &[(&str, Vec<f32>)]) -> Self {
            Self {
                vectors: pairs.iter().map(|(t, v)| (t.to_string(), v.clone())).collect(),
                ..Default::default()
            }
        }

        fn vector_for(&self, text: &str) -> Vec<f32> {
            self.vectors.get(text).cloned().unwrap_or_else(|| vec![1.0, 1.0, 1.0])
        }

        fn batch_calls(&self) -> Vec<usize> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        fn name(&self) -> &str {
            "mock"
        }

        async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
            self.single_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector_for(text))
        }

        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.batches.lock().unwrap().push(texts.len());
            let mut out: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
            if self.wrong_count {
                out.pop();
            }
            Ok(out)
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }
        async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
            Err(VecStashError::Provider("model unavailable".into()))
        }
        async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(VecStashError::Provider("model unavailable".into()))
        }
    }

    /// Table that counts reads and can be told to fail writes.
    struct ProbeTable {
        inner: MemoryTable<Value>,
        reads: AtomicUsize,
        writes: AtomicUsize,
        fail_writes: bool,
    }

    impl ProbeTable {
        fn new(fail_writes: bool) -> Self {
            Self {
                inner: MemoryTable::new(),
                reads: AtomicUsize::new(0),
                writes: AtomicUsize::new(0),
                fail_writes,
            }
        }
    }

    #[async_trait]
    impl DocumentTable<Value> for ProbeTable {
        fn name(&self) -> &str {
            "probe"
        }
        async fn read_all(&self) -> Result<Vec<Document<Value>>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.inner.read_all().await
        }
        async fn replace_all(&self, documents: &[Document<Value>]) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(VecStashError::Persistence("disk full".into()));
            }
            self.inner.replace_all(documents).await
        }
        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }
    }

    fn store_with(embedder: MockEmbedder) -> (VectorStore<Value>, Arc<MockEmbedder>, Arc<ProbeTable>) {
        let embedder = Arc::new(embedder);
        let table = Arc::new(ProbeTable::new(false));
        let store = VectorStore::<Value>::builder()
            .embedder(embedder.clone())
            .table(table.clone())
            .build()
            .unwrap();
        (store, embedder, table)
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builder_requires_embedder() {
        let result = VectorStore::<Value>::builder().build();
        assert!(matches!(result, Err(VecStashError::Config(_))));
    }

    #[test]
    fn test_builder_rejects_bad_budget() {
        let result = VectorStore::<Value>::builder()
            .embedder(Arc::new(MockEmbedder::default()))
            .max_size_in_mb(f64::NAN)
            .build();
        assert!(matches!(result, Err(VecStashError::Config(_))));
    }

    #[test]
    fn test_display_names_embedder() {
        let (store, _, _) = store_with(MockEmbedder::default());
        assert_eq!(store.to_string(), "VectorStore: mock");
    }

    #[tokio::test]
    async fn test_add_text_dedup() {
        let (store, embedder, _) = store_with(MockEmbedder::default());
        let first = store.add_text("t", json!({"n": 1})).await.unwrap();
        assert!(first.is_some());
        let second = store.add_text("t", json!({"n": 2})).await.unwrap();
        assert!(second.is_none());

        let docs = store.documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].metadata, json!({"n": 1})); // not updated
        assert_eq!(embedder.batch_calls(), vec![1]); // duplicate never embedded
    }

    #[tokio::test]
    async fn test_add_texts_single_batch_and_in_batch_dedup() {
        let (store, embedder, table) = store_with(MockEmbedder::default());
        store.add_text("a", json!(null)).await.unwrap();
        let added = store
            .add_texts(texts(&["a", "b", "c", "b"]), vec![json!(1), json!(2), json!(3), json!(4)])
            .await
            .unwrap();
        let added_texts: Vec<_> = added.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(added_texts, vec!["b", "c"]);
        assert_eq!(embedder.batch_calls(), vec![1, 2]);
        assert_eq!(store.len().await.unwrap(), 3);
        assert_eq!(table.inner.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_added_documents_have_consistent_magnitude() {
        let (store, _, _) = store_with(MockEmbedder::with(&[("a", vec![3.0, 4.0])]));
        let doc = store.add_text("a", json!({})).await.unwrap().unwrap();
        assert_eq!(doc.vector(), &[3.0, 4.0]);
        assert_eq!(doc.vector_mag(), 5.0);
        assert_eq!(doc.hits, 0);
        assert!(doc.timestamp > 0);
    }

    #[tokio::test]
    async fn test_mismatched_lengths_fail_before_any_call() {
        let (store, embedder, table) = store_with(MockEmbedder::default());
        let err = store.add_texts(texts(&["a", "b"]), vec![json!(1)]).await.unwrap_err();
        assert!(matches!(err, VecStashError::InvalidArgument(_)));
        assert!(embedder.batch_calls().is_empty());
        assert_eq!(table.reads.load(Ordering::SeqCst), 0);
        assert_eq!(store.state(), StoreState::Uninitialized);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates_without_mutation() {
        let table = Arc::new(ProbeTable::new(false));
        let store = VectorStore::<Value>::builder()
            .embedder(Arc::new(FailingEmbedder))
            .table(table.clone())
            .build()
            .unwrap();
        let err = store.add_text("a", json!(null)).await.unwrap_err();
        assert!(err.is_provider_failure());
        assert!(store.documents().await.unwrap().is_empty());
        assert_eq!(table.writes.load(Ordering::SeqCst), 0);

        let err = store.similarity_search(SearchParams::new("q")).await.unwrap_err();
        assert!(err.is_provider_failure());
    }

    #[tokio::test]
    async fn test_malformed_provider_batch_is_rejected() {
        let embedder = MockEmbedder { wrong_count: true, ..Default::default() };
        let (store, _, table) = store_with(embedder);
        let err = store.add_texts(texts(&["a", "b"]), vec![json!(1), json!(2)]).await.unwrap_err();
        assert!(matches!(err, VecStashError::Provider(_)));
        assert!(store.documents().await.unwrap().is_empty());
        assert_eq!(table.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_round_trip_search() {
        let (store, embedder, _) = store_with(MockEmbedder::with(&[
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.6, 0.8]),
        ]));
        store.reset_db().await.unwrap();
        store.add_texts(texts(&["a", "b"]), vec![json!("m1"), json!("m2")]).await.unwrap();

        let resp = store.similarity_search(SearchParams::new("a").with_k(2)).await.unwrap();
        assert_eq!(resp.similar_items.len(), 2);
        assert_eq!(resp.similar_items[0].text, "a");
        assert!(resp.similar_items[0].score >= resp.similar_items[1].score);
        assert!((resp.similar_items[0].score - 1.0).abs() < 1e-6);
        assert!(resp.similar_items[0].vector.is_none());
        assert_eq!(resp.query.text, "a");
        assert_eq!(resp.query.embedding, vec![1.0, 0.0]);
        assert_eq!(embedder.single_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_k_bound_and_descending_order() {
        let pairs: Vec<(String, Vec<f32>)> =
            (0..10).map(|i| (format!("d{i}"), vec![1.0, i as f32 / 10.0])).collect();
        let refs: Vec<(&str, Vec<f32>)> = pairs.iter().map(|(t, v)| (t.as_str(), v.clone())).collect();
        let mut embedder = MockEmbedder::with(&refs);
        embedder.vectors.insert("q".into(), vec![0.0, 1.0]);
        let (store, _, _) = store_with(embedder);
        let all: Vec<String> = pairs.iter().map(|(t, _)| t.clone()).collect();
        store.add_texts(all, vec![json!(null); 10]).await.unwrap();

        for k in [0, 1, 4, 10, 25] {
            let resp = store.similarity_search(SearchParams::new("q").with_k(k)).await.unwrap();
            assert_eq!(resp.similar_items.len(), k.min(10));
            for pair in resp.similar_items.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
    }

    #[tokio::test]
    async fn test_ties_keep_collection_order() {
        let (store, _, _) = store_with(MockEmbedder::default());
        store.add_texts(texts(&["x", "y", "z"]), vec![json!(0), json!(1), json!(2)]).await.unwrap();
        let resp = store.similarity_search(SearchParams::new("q").with_k(3)).await.unwrap();
        let order: Vec<_> = resp.similar_items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
    }

    #[tokio::test]
    async fn test_hits_only_on_returned_documents() {
        let (store, _, table) = store_with(MockEmbedder::with(&[
            ("near", vec![1.0, 0.0]),
            ("far", vec![-1.0, 0.0]),
            ("q", vec![1.0, 0.0]),
        ]));
        store.add_texts(texts(&["near", "far"]), vec![json!(1), json!(2)]).await.unwrap();

        let resp = store.similarity_search(SearchParams::new("q").with_k(1)).await.unwrap();
        assert_eq!(resp.similar_items[0].text, "near");
        assert_eq!(resp.similar_items[0].hits, 1);

        store.similarity_search(SearchParams::new("q").with_k(1)).await.unwrap();
        let docs = store.documents().await.unwrap();
        let hits: HashMap<_, _> = docs.iter().map(|d| (d.text.clone(), d.hits)).collect();
        assert_eq!(hits["near"], 2);
        assert_eq!(hits["far"], 0);

        // Hit counts are flushed.
        let stored = table.inner.read_all().await.unwrap();
        assert_eq!(stored.iter().find(|d| d.text == "near").unwrap().hits, 2);
    }

    #[tokio::test]
    async fn test_empty_search_does_not_flush() {
        let (store, _, table) = store_with(MockEmbedder::default());
        let resp = store.similarity_search(SearchParams::new("q")).await.unwrap();
        assert!(resp.similar_items.is_empty());
        assert_eq!(table.writes.load(Ordering::SeqCst), 0);
        assert_eq!(store.last_flush(), FlushOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_filter_include_metadata_exclude_text() {
        let (store, _, _) = store_with(MockEmbedder::default());
        store
            .add_texts(
                texts(&["x", "y", "z"]),
                vec![json!({"category": "a"}), json!({"category": "a"}), json!({"category": "b"})],
            )
            .await
            .unwrap();
        let filter = FilterOptions {
            include: Some(FilterCriteria::default().metadata_eq("category", "a")),
            exclude: Some(FilterCriteria::default().text(TextMatch::Many(vec!["x".into()]))),
        };
        let resp = store
            .similarity_search(SearchParams::new("q").with_k(10).with_filter(filter))
            .await
            .unwrap();
        let found: Vec<_> = resp.similar_items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(found, vec!["y"]);
    }

    #[tokio::test]
    async fn test_include_values() {
        let (store, _, _) = store_with(MockEmbedder::with(&[("a", vec![3.0, 4.0])]));
        store.add_text("a", json!(null)).await.unwrap();
        let resp = store
            .similarity_search(SearchParams::new("a").with_values(true))
            .await
            .unwrap();
        assert_eq!(resp.similar_items[0].vector.as_deref(), Some(&[3.0, 4.0][..]));
        assert_eq!(resp.similar_items[0].vector_mag, Some(5.0));
    }

    #[tokio::test]
    async fn test_zero_vector_scores_nan_and_ranks_last() {
        let (store, _, _) = store_with(MockEmbedder::with(&[
            ("zero", vec![0.0, 0.0]),
            ("one", vec![-1.0, 0.0]),
            ("q", vec![1.0, 0.0]),
        ]));
        store.add_texts(texts(&["zero", "one"]), vec![json!(0), json!(1)]).await.unwrap();
        let resp = store.similarity_search(SearchParams::new("q").with_k(2)).await.unwrap();
        assert_eq!(resp.similar_items[0].text, "one");
        assert_eq!(resp.similar_items[0].score, 0.0);
        assert_eq!(resp.similar_items[1].text, "zero");
        assert!(resp.similar_items[1].score.is_nan());
    }

    #[tokio::test]
    async fn test_eviction_keeps_budget_and_prefers_hits() {
        let embedder = Arc::new(MockEmbedder::with(&[("keep", vec![1.0, 0.0, 0.0]), ("q", vec![1.0, 0.0, 0.0])]));
        let table = Arc::new(ProbeTable::new(false));
        // Budget fits roughly two documents.
        let now = now_millis();
        let mut probe = vec![
            Document::new("keep", json!({"i": 0}), vec![1.0, 0.0, 0.0], now),
            Document::new("doc-1", json!({"i": 1}), vec![1.0, 1.0, 1.0], now),
        ];
        probe[0].hits = 1;
        let budget = eviction::size_in_mb(&probe).unwrap() * 1.2;
        let store = VectorStore::<Value>::builder()
            .embedder(embedder)
            .table(table.clone())
            .max_size_in_mb(budget)
            .build()
            .unwrap();

        store.add_text("keep", json!({"i": 0})).await.unwrap();
        store.similarity_search(SearchParams::new("q").with_k(1)).await.unwrap();
        for i in 1..6 {
            store.add_text(format!("doc-{i}"), json!({"i": i})).await.unwrap();
            assert!(store.size_in_mb().await.unwrap() <= budget);
        }

        let docs = store.documents().await.unwrap();
        assert!(docs.iter().any(|d| d.text == "keep"));
        assert!(docs.len() < 6);
        assert!(eviction::size_in_mb(&table.inner.read_all().await.unwrap()).unwrap() <= budget);
    }

    #[tokio::test]
    async fn test_hydrates_once_and_evicts_on_load() {
        let table = Arc::new(ProbeTable::new(false));
        table
            .inner
            .replace_all(&[
                Document::new("old", json!(null), vec![1.0], 1),
                Document::new("new", json!(null), vec![1.0], 2),
            ])
            .await
            .unwrap();
        let one_doc = eviction::size_in_mb(&[Document::new("new", json!(null), vec![1.0], 2)]).unwrap();
        let store = Arc::new(
            VectorStore::<Value>::builder()
                .embedder(Arc::new(MockEmbedder::default()))
                .table(table.clone())
                .max_size_in_mb(one_doc * 1.5)
                .build()
                .unwrap(),
        );
        assert_eq!(store.state(), StoreState::Uninitialized);

        let (a, b) = tokio::join!(store.len(), store.documents());
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap()[0].text, "new");
        store.similarity_search(SearchParams::new("q")).await.unwrap();
        assert_eq!(table.reads.load(Ordering::SeqCst), 1);
        assert_eq!(store.state(), StoreState::Live);
    }

    #[tokio::test]
    async fn test_reset_before_hydration_skips_load() {
        let (store, _, table) = store_with(MockEmbedder::default());
        table.inner.replace_all(&[Document::new("stale", json!(null), vec![1.0], 1)]).await.unwrap();

        let outcome = store.reset_db().await.unwrap();
        assert_eq!(outcome, FlushOutcome::Persisted { count: 0 });
        assert_eq!(store.state(), StoreState::Live);
        assert!(store.documents().await.unwrap().is_empty());
        assert_eq!(table.reads.load(Ordering::SeqCst), 0);
        assert_eq!(table.inner.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_best_effort_swallows_flush_failure() {
        let table = Arc::new(ProbeTable::new(true));
        let store = VectorStore::<Value>::builder()
            .embedder(Arc::new(MockEmbedder::default()))
            .table(table.clone())
            .build()
            .unwrap();
        let added = store.add_text("a", json!(null)).await.unwrap();
        assert!(added.is_some());
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(matches!(store.last_flush(), FlushOutcome::Failed { .. }));

        let resp = store.similarity_search(SearchParams::new("a")).await.unwrap();
        assert_eq!(resp.similar_items.len(), 1);
    }

    #[tokio::test]
    async fn test_strict_durability_surfaces_flush_failure() {
        let table = Arc::new(ProbeTable::new(true));
        let store = VectorStore::<Value>::builder()
            .embedder(Arc::new(MockEmbedder::default()))
            .table(table)
            .durability(Durability::Strict)
            .build()
            .unwrap();
        let err = store.add_text("a", json!(null)).await.unwrap_err();
        assert!(matches!(err, VecStashError::Persistence(_)));
        // In-memory state is still updated.
        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_persisted_documents_survive_a_new_store() {
        let table = Arc::new(ProbeTable::new(false));
        let embedder = Arc::new(MockEmbedder::default());
        {
            let store = VectorStore::<Value>::builder()
                .embedder(embedder.clone())
                .table(table.clone())
                .build()
                .unwrap();
            store.add_texts(texts(&["a", "b"]), vec![json!(1), json!(2)]).await.unwrap();
        }
        let store: VectorStore<Value> = VectorStore::<Value>::builder()
            .embedder(embedder)
            .table(table)
            .build()
            .unwrap();
        assert_eq!(store.len().await.unwrap(), 2);
        assert!(store.add_text("a", json!(3)).await.unwrap().is_none());
    }
}
