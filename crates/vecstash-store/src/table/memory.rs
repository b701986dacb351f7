//! In-process table. Nothing survives the process. Used for tests and
//! throwaway stores.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;
use vecstash_core::error::Result;
use vecstash_core::traits::DocumentTable;
use vecstash_core::types::{Document, Metadata};

pub struct MemoryTable<T> {
    rows: Mutex<Vec<Document<T>>>,
    next_id: AtomicI64,
}

impl<T> MemoryTable<T> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl<T> Default for MemoryTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Metadata> DocumentTable<T> for MemoryTable<T> {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read_all(&self) -> Result<Vec<Document<T>>> {
        Ok(self.rows.lock().await.clone())
    }

    async fn replace_all(&self, documents: &[Document<T>]) -> Result<()> {
        let rows = documents
            .iter()
            .map(|doc| {
                let mut row = doc.clone();
                if row.id.is_none() {
                    row.id = Some(self.next_id.fetch_add(1, Ordering::Relaxed));
                }
                row
            })
            .collect();
        *self.rows.lock().await = rows;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rows.lock().await.len())
    }
}
