//! Filesystem stores: one JSON file per aggregate

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Document, Session};

use super::{DocumentStore, SessionStore};

/// JSON-file document store under `<dir>/documents/`
pub struct FileDocumentStore {
    dir: PathBuf,
}

impl FileDocumentStore {
    /// Create the store, making the directory if needed
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let dir = base_dir.join("documents");
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn doc_path(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get_document(&self, id: &Uuid) -> Result<Option<Document>> {
        let path = self.doc_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn save_document(&self, document: &Document) -> Result<()> {
        let json = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(self.doc_path(&document.id), json).await?;
        Ok(())
    }

    async fn delete_document(&self, id: &Uuid) -> Result<bool> {
        let path = self.doc_path(id);
        if !path.exists() {
            return Ok(false);
        }
        tokio::fs::remove_file(path).await?;
        Ok(true)
    }

    async fn list_documents(&self) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_suffix(".json") {
                if let Ok(id) = Uuid::parse_str(stem) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// JSON-file session store under `<dir>/sessions/`
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Create the store, making the directory if needed
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let dir = base_dir.join("sessions");
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn session_path(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get_session(&self, id: &Uuid) -> Result<Option<Session>> {
        let path = self.session_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(self.session_path(&session.id), json).await?;
        Ok(())
    }

    async fn delete_session(&self, id: &Uuid) -> Result<bool> {
        let path = self.session_path(id);
        if !path.exists() {
            return Ok(false);
        }
        tokio::fs::remove_file(path).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LanguageHint;

    #[tokio::test]
    async fn file_store_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(tmp.path().to_path_buf()).unwrap();

        let doc = Document::new("q.pdf".to_string(), &LanguageHint::Auto, "h".to_string());
        let id = doc.id;

        store.save_document(&doc).await.unwrap();
        let loaded = store.get_document(&id).await.unwrap().unwrap();
        assert_eq!(loaded.metadata.filename, "q.pdf");
        assert_eq!(store.list_documents().await.unwrap(), vec![id]);
        assert!(store.delete_document(&id).await.unwrap());
        assert!(!store.delete_document(&id).await.unwrap());
    }

    #[tokio::test]
    async fn session_store_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(tmp.path().to_path_buf()).unwrap();

        let session = Session::new(vec![Uuid::new_v4()]);
        let id = session.id;

        store.save_session(&session).await.unwrap();
        assert!(store.get_session(&id).await.unwrap().is_some());
        assert!(store.delete_session(&id).await.unwrap());
        assert!(store.get_session(&id).await.unwrap().is_none());
    }
}
