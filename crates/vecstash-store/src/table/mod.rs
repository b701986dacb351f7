//! Document table backends.
//!
//! Every backend offers the same two operations the store needs: read the
//! whole table, and atomically replace the whole table.

pub mod json_file;
pub mod memory;
pub mod sqlite;

pub use json_file::JsonFileTable;
pub use memory::MemoryTable;
pub use sqlite::SqliteTable;

use std::sync::Arc;

use vecstash_core::config::StorageConfig;
use vecstash_core::error::{Result, VecStashError};
use vecstash_core::traits::DocumentTable;
use vecstash_core::types::Metadata;

/// Open the backend named by `config.backend`.
pub fn open_table<T: Metadata>(config: &StorageConfig) -> Result<Arc<dyn DocumentTable<T>>> {
    match config.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteTable::open(&config.resolved_path())?)),
        "json" => Ok(Arc::new(JsonFileTable::new(config.resolved_path()))),
        "memory" => Ok(Arc::new(MemoryTable::new())),
        other => Err(VecStashError::Config(format!("Unknown storage backend: {other}"))),
    }
}

/// Names accepted by [`open_table`].
pub fn available_backends() -> Vec<&'static str> {
    vec!["sqlite", "json", "memory"]
}
