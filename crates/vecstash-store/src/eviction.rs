//! Size-bounded eviction: drop the least-hit, oldest documents until the
//! serialized collection fits the budget.
//!
//! Size is the length of the compact JSON array of all documents. Each
//! document's encoded length is measured once; the array size is then
//! `2 + Σ sizes + (n - 1)` for the brackets and separating commas, which
//! equals re-serializing the remaining collection after every removal.

use serde::Serialize;
use vecstash_core::error::Result;
use vecstash_core::types::Document;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Outcome of an eviction pass.
#[derive(Debug, Clone)]
pub struct Eviction<T> {
    /// Surviving documents. Re-ordered by `(hits, timestamp)` when eviction fired.
    pub kept: Vec<Document<T>>,
    /// Removed documents, least valuable first.
    pub evicted: Vec<Document<T>>,
}

/// Encoded JSON length of each document.
pub fn document_sizes<T: Serialize>(docs: &[Document<T>]) -> Result<Vec<usize>> {
    docs.iter()
        .map(|doc| Ok(serde_json::to_vec(doc)?.len()))
        .collect()
}

fn array_size(sum: usize, count: usize) -> usize {
    if count == 0 { 2 } else { 2 + sum + (count - 1) }
}

pub fn bytes_to_mb(bytes: usize) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Serialized size of the whole collection in megabytes.
pub fn size_in_mb<T: Serialize>(docs: &[Document<T>]) -> Result<f64> {
    let sizes = document_sizes(docs)?;
    Ok(bytes_to_mb(array_size(sizes.iter().sum(), sizes.len())))
}

/// Evict with precomputed per-document sizes (`sizes[i]` belongs to `docs[i]`).
pub fn evict_sized<T>(docs: Vec<Document<T>>, sizes: Vec<usize>, max_size_in_mb: f64) -> Eviction<T> {
    debug_assert_eq!(docs.len(), sizes.len());
    let mut sum: usize = sizes.iter().sum();
    let mut count = docs.len();

    if bytes_to_mb(array_size(sum, count)) <= max_size_in_mb {
        return Eviction { kept: docs, evicted: Vec::new() };
    }

    let mut ranked: Vec<(Document<T>, usize)> = docs.into_iter().zip(sizes).collect();
    // Stable: equal keys keep their collection order.
    ranked.sort_by_key(|(doc, _)| doc.eviction_key());

    let mut ranked = ranked.into_iter();
    let mut evicted = Vec::new();
    while count > 0 && bytes_to_mb(array_size(sum, count)) > max_size_in_mb {
        let Some((doc, size)) = ranked.next() else { break };
        sum -= size;
        count -= 1;
        evicted.push(doc);
    }

    Eviction {
        kept: ranked.map(|(doc, _)| doc).collect(),
        evicted,
    }
}

/// Drop least valuable documents until the collection fits `max_size_in_mb`.
pub fn evict<T: Serialize>(docs: Vec<Document<T>>, max_size_in_mb: f64) -> Result<Eviction<T>> {
    let sizes = document_sizes(&docs)?;
    Ok(evict_sized(docs, sizes, max_size_in_mb))
}
