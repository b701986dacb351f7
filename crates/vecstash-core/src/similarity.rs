//! Similarity engine — pure vector math.
//!
//! No guards: a zero-magnitude vector makes [`cosine`] divide by zero and
//! yields a non-finite score, and vectors of different lengths are only
//! compared over their common prefix.

/// Euclidean norm: `sqrt(Σ vᵢ²)`.
pub fn magnitude(vector: &[f32]) -> f32 {
    dot_product(vector, vector).sqrt()
}

/// `Σ aᵢ·bᵢ` over the common prefix of `a` and `b`.
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity from a precomputed dot product and both magnitudes.
pub fn cosine(dot: f32, mag_a: f32, mag_b: f32) -> f32 {
    dot / (mag_a * mag_b)
}

/// Map cosine's [-1, 1] range onto [0, 1].
pub fn normalize(score: f32) -> f32 {
    (score + 1.0) / 2.0
}

/// Normalized cosine similarity between a document vector and a query.
pub fn score(doc: &[f32], doc_mag: f32, query: &[f32], query_mag: f32) -> f32 {
    normalize(cosine(dot_product(doc, query), doc_mag, query_mag))
}
