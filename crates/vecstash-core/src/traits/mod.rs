//! Capability traits injected into the document store.

pub mod embedder;
pub mod table;

pub use embedder::Embedder;
pub use table::DocumentTable;
