//! # vecstash store
//!
//! Embedded, size-bounded vector store. Exhaustive cosine scan, no ANN index.
//!
//! ## How it works
//! ```text
//! add_texts(["a", "b"], [m1, m2])
//!   ↓ hydrate once from the DocumentTable
//!   ↓ skip texts already stored
//!   ↓ Embedder.embed_texts (one batch)
//!   ↓ append, evict least-hit/oldest while over max_size_in_mb
//!   ↓ flush: clear + rewrite the whole table
//!
//! similarity_search("query", k)
//!   ↓ Embedder.embed_text
//!   ↓ filter → score every doc → stable sort → top k
//!   ↓ hits += 1 on the returned docs, evict, flush
//! ```

pub mod eviction;
pub mod filter;
pub mod store;
pub mod table;

pub use eviction::{Eviction, evict};
pub use store::{StoreState, VectorStore, VectorStoreBuilder};
pub use table::{JsonFileTable, MemoryTable, SqliteTable, open_table};
pub use vecstash_core::similarity;
