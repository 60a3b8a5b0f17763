//! Storage collaborator interfaces
//!
//! Document and session state live behind key-value traits injected at
//! construction time. In-memory and file-backed implementations ship;
//! anything honoring the trait contract is interchangeable.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::{Error, Result};
use crate::types::{Document, Session};

pub mod file;
pub mod memory;

pub use file::{FileDocumentStore, FileSessionStore};
pub use memory::{MemoryDocumentStore, MemorySessionStore};

/// Key-value access to persisted documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id
    async fn get_document(&self, id: &Uuid) -> Result<Option<Document>>;

    /// Save a document, replacing any existing entry
    async fn save_document(&self, document: &Document) -> Result<()>;

    /// Delete a document. Returns whether it existed.
    async fn delete_document(&self, id: &Uuid) -> Result<bool>;

    /// List stored document ids
    async fn list_documents(&self) -> Result<Vec<Uuid>>;
}

/// Key-value access to sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a session by id
    async fn get_session(&self, id: &Uuid) -> Result<Option<Session>>;

    /// Save a session, replacing any existing entry
    async fn save_session(&self, session: &Session) -> Result<()>;

    /// Delete a session. Returns whether it existed.
    async fn delete_session(&self, id: &Uuid) -> Result<bool>;
}

/// Build the configured storage backends
pub fn from_config(
    config: &StorageConfig,
) -> Result<(Arc<dyn DocumentStore>, Arc<dyn SessionStore>)> {
    match config.backend {
        StorageBackend::Memory => Ok((
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemorySessionStore::new()),
        )),
        StorageBackend::File => {
            let base = config.path.clone().ok_or_else(|| {
                Error::Config("storage.path is required for the file backend".to_string())
            })?;
            Ok((
                Arc::new(FileDocumentStore::new(base.clone())?),
                Arc::new(FileSessionStore::new(base)?),
            ))
        }
    }
}
