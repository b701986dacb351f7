//! Persistence capability: a table of documents that is read whole and
//! replaced whole.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Document;

#[async_trait]
pub trait DocumentTable<T>: Send + Sync {
    /// Backend name (`"sqlite"`, `"json"`, `"memory"`).
    fn name(&self) -> &str;

    /// Every stored document, with ids assigned by the backend.
    async fn read_all(&self) -> Result<Vec<Document<T>>>;

    /// Clear the table and write `documents` in a single transaction.
    async fn replace_all(&self, documents: &[Document<T>]) -> Result<()>;

    async fn count(&self) -> Result<usize>;
}
