//! File-based document table: the whole collection as one JSON file.
//! Human-readable; replaced atomically by writing a sibling temp file and
//! renaming it over the original.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use vecstash_core::error::{Result, VecStashError};
use vecstash_core::traits::DocumentTable;
use vecstash_core::types::{Document, Metadata};

pub struct JsonFileTable {
    path: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl JsonFileTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn load<T: Metadata>(&self) -> Result<Vec<Document<T>>> {
        let json = match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&json).map_err(|e| {
            VecStashError::Persistence(format!("Failed to parse {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl<T: Metadata> DocumentTable<T> for JsonFileTable {
    fn name(&self) -> &str {
        "json"
    }

    async fn read_all(&self) -> Result<Vec<Document<T>>> {
        self.load().await
    }

    async fn replace_all(&self, documents: &[Document<T>]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut next_id = documents.iter().filter_map(|d| d.id).max().unwrap_or(0) + 1;
        let rows: Vec<Document<T>> = documents
            .iter()
            .map(|doc| {
                let mut row = doc.clone();
                if row.id.is_none() {
                    row.id = Some(next_id);
                    next_id += 1;
                }
                row
            })
            .collect();
        let json = serde_json::to_vec(&rows)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| VecStashError::Persistence(format!("Write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| VecStashError::Persistence(format!("Rename to {}: {e}", self.path.display())))?;
        tracing::debug!("💾 Saved {} documents to {}", rows.len(), self.path.display());
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.load::<serde_json::Value>().await?.len())
    }
}
