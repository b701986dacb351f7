//! SQLite document table.
//!
//! Schema mirrors the document shape: auto-assigned `id`, unique `text`,
//! JSON `metadata` and `vector`, plus secondary indexes on metadata,
//! timestamp and hits. Blocking rusqlite calls run on the blocking pool.

use async_trait::async_trait;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use vecstash_core::error::{Result, VecStashError};
use vecstash_core::traits::DocumentTable;
use vecstash_core::types::{Document, Metadata};

fn db_err(e: impl std::fmt::Display) -> VecStashError {
    VecStashError::Persistence(e.to_string())
}

/// A row ready for insertion: every column already encoded.
struct EncodedRow {
    id: Option<i64>,
    text: String,
    metadata: String,
    vector: String,
    vector_mag: f32,
    timestamp: i64,
    hits: i64,
}

pub struct SqliteTable {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteTable {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        let table = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        };
        table.migrate()?;
        Ok(table)
    }

    /// Private, non-persistent database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let table = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        };
        table.migrate()?;
        Ok(table)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(db_err)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL UNIQUE,
                metadata TEXT NOT NULL DEFAULT 'null',   -- JSON
                vector TEXT NOT NULL DEFAULT '[]',        -- JSON array of f32
                vector_mag REAL NOT NULL DEFAULT 0,
                timestamp INTEGER NOT NULL,
                hits INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_documents_metadata ON documents(metadata);
            CREATE INDEX IF NOT EXISTS idx_documents_timestamp ON documents(timestamp);
            CREATE INDEX IF NOT EXISTS idx_documents_hits ON documents(hits);
            ",
        )
        .map_err(|e| VecStashError::Persistence(format!("Migration: {e}")))?;
        Ok(())
    }

    async fn with_conn<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(db_err)?;
            f(&mut *guard)
        })
        .await
        .map_err(db_err)?
    }
}

fn encode<T: Metadata>(doc: &Document<T>) -> Result<EncodedRow> {
    Ok(EncodedRow {
        id: doc.id,
        text: doc.text.clone(),
        metadata: serde_json::to_string(&doc.metadata)?,
        vector: serde_json::to_string(doc.vector())?,
        vector_mag: doc.vector_mag(),
        timestamp: doc.timestamp,
        hits: i64::try_from(doc.hits).unwrap_or(i64::MAX),
    })
}

#[async_trait]
impl<T: Metadata> DocumentTable<T> for SqliteTable {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn read_all(&self) -> Result<Vec<Document<T>>> {
        let rows = self
            .with_conn(|conn| {
                let mut stmt = conn
                    .prepare("SELECT id, text, metadata, vector, timestamp, hits FROM documents ORDER BY id")
                    .map_err(db_err)?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, i64>(5)?,
                        ))
                    })
                    .map_err(db_err)?
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(db_err)?;
                Ok(rows)
            })
            .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for (id, text, metadata, vector, timestamp, hits) in rows {
            let metadata: T = match serde_json::from_str(&metadata) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("⚠️ Skipping document {id}: bad metadata: {e}");
                    continue;
                }
            };
            let vector: Vec<f32> = match serde_json::from_str(&vector) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!("⚠️ Skipping document {id}: bad vector: {e}");
                    continue;
                }
            };
            let mut doc = Document::new(text, metadata, vector, timestamp);
            doc.id = Some(id);
            doc.hits = hits.max(0) as u64;
            documents.push(doc);
        }
        Ok(documents)
    }

    async fn replace_all(&self, documents: &[Document<T>]) -> Result<()> {
        let rows = documents.iter().map(encode).collect::<Result<Vec<_>>>()?;
        let count = rows.len();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(db_err)?;
            tx.execute("DELETE FROM documents", []).map_err(db_err)?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO documents (id, text, metadata, vector, vector_mag, timestamp, hits)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    )
                    .map_err(db_err)?;
                for row in &rows {
                    stmt.execute(rusqlite::params![
                        row.id,
                        row.text,
                        row.metadata,
                        row.vector,
                        row.vector_mag,
                        row.timestamp,
                        row.hits,
                    ])
                    .map_err(db_err)?;
                }
            }
            tx.commit().map_err(db_err)?;
            Ok(())
        })
        .await?;
        tracing::debug!("💾 Wrote {count} documents to sqlite");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get::<_, i64>(0))
                .map(|n| n as usize)
                .map_err(db_err)
        })
        .await
    }
}
