//! In-memory stores, the default backend

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Document, Session};

use super::{DocumentStore, SessionStore};

/// DashMap-backed document store
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<Uuid, Document>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_document(&self, id: &Uuid) -> Result<Option<Document>> {
        Ok(self.documents.get(id).map(|d| d.clone()))
    }

    async fn save_document(&self, document: &Document) -> Result<()> {
        self.documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn delete_document(&self, id: &Uuid) -> Result<bool> {
        Ok(self.documents.remove(id).is_some())
    }

    async fn list_documents(&self) -> Result<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self.documents.iter().map(|e| *e.key()).collect();
        ids.sort();
        Ok(ids)
    }
}

/// DashMap-backed session store
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<Uuid, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_session(&self, id: &Uuid) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|s| s.clone()))
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn delete_session(&self, id: &Uuid) -> Result<bool> {
        Ok(self.sessions.remove(id).is_some())
    }
}
