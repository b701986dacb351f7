//! Include/exclude filtering over document text and metadata.
//!
//! A criteria matches when every constraint it names holds: each metadata
//! key equals the given JSON value, and the text is one of the given texts.

use serde::Serialize;
use serde_json::Value;
use vecstash_core::types::{Document, FilterCriteria, FilterOptions};

/// Check whether a document satisfies every constraint in `criteria`.
pub fn matches_criteria<T: Serialize>(doc: &Document<T>, criteria: &FilterCriteria) -> bool {
    if let Some(ref wanted) = criteria.metadata {
        if !wanted.is_empty() {
            let metadata = match serde_json::to_value(&doc.metadata) {
                Ok(Value::Object(map)) => map,
                _ => return false,
            };
            let all_equal = wanted
                .iter()
                .all(|(key, value)| metadata.get(key) == Some(value));
            if !all_equal {
                return false;
            }
        }
    }
    if let Some(ref texts) = criteria.text {
        if !texts.contains(&doc.text) {
            return false;
        }
    }
    true
}

/// `(no include OR matches include) AND (no exclude OR NOT matches exclude)`.
pub fn passes<T: Serialize>(doc: &Document<T>, options: &FilterOptions) -> bool {
    if let Some(ref include) = options.include {
        if !matches_criteria(doc, include) {
            return false;
        }
    }
    if let Some(ref exclude) = options.exclude {
        if matches_criteria(doc, exclude) {
            return false;
        }
    }
    true
}

/// Indices of the documents that pass `options`, in collection order.
pub fn filter_indices<T: Serialize>(docs: &[Document<T>], options: Option<&FilterOptions>) -> Vec<usize> {
    docs.iter()
        .enumerate()
        .filter(|(_, doc)| options.is_none_or(|o| passes(doc, o)))
        .map(|(i, _)| i)
        .collect()
}
