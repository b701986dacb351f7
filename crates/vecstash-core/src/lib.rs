//! # vecstash core
//!
//! Shared types, capability traits, configuration and the error type used by
//! every vecstash crate.
//!
//! ## Layout
//! - [`types`] — `Document<T>`, filter criteria, search params/results
//! - [`traits`] — `Embedder` (text → vectors) and `DocumentTable` (read all / replace all)
//! - [`similarity`] — magnitude, dot product, cosine, score normalization
//! - [`config`] — `~/.vecstash/config.toml`
//! - [`error`] — `VecStashError` + `Result`

pub mod config;
pub mod error;
pub mod similarity;
pub mod traits;
pub mod types;

pub use config::VecStashConfig;
pub use error::{Result, VecStashError};
pub use traits::{DocumentTable, Embedder};
pub use types::{
    Document, FilterCriteria, Metadata, FilterOptions, FlushOutcome, QueryEmbedding, SearchItem,
    SearchParams, SearchResponse, TextMatch,
};
