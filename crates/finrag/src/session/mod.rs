//! Retrieval/session coordinator
//!
//! Owns conversational sessions: retrieval across the session's documents,
//! delegation to the answer provider with retry and degraded fallback, and
//! the bounded history. Queries against one session are serialized through
//! a per-session mutex; sessions proceed independently of each other.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::{LlmConfig, SessionConfig};
use crate::error::{Error, Result};
use crate::index::{DocumentIndex, IndexedDocument};
use crate::providers::AnswerProvider;
use crate::retrieval::Retriever;
use crate::storage::SessionStore;
use crate::types::{Answer, HistoryMessage, ScoredChunk, Session, SessionState, SourceRef};

const SNIPPET_LEN: usize = 160;

/// Coordinates sessions, retrieval, and answer generation
pub struct SessionCoordinator {
    index: Arc<DocumentIndex>,
    retriever: Retriever,
    answerer: Arc<dyn AnswerProvider>,
    /// Degraded mode; same contract as `answerer`
    fallback: Arc<dyn AnswerProvider>,
    sessions: Arc<dyn SessionStore>,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
    session_config: SessionConfig,
    llm_config: LlmConfig,
}

impl SessionCoordinator {
    /// Create a new coordinator
    pub fn new(
        index: Arc<DocumentIndex>,
        retriever: Retriever,
        answerer: Arc<dyn AnswerProvider>,
        fallback: Arc<dyn AnswerProvider>,
        sessions: Arc<dyn SessionStore>,
        session_config: SessionConfig,
        llm_config: LlmConfig,
    ) -> Self {
        Self {
            index,
            retriever,
            answerer,
            fallback,
            sessions,
            locks: DashMap::new(),
            session_config,
            llm_config,
        }
    }

    /// Create a session over a set of documents
    pub async fn create_session(&self, document_ids: Vec<Uuid>) -> Result<Session> {
        let session = Session::new(document_ids);
        self.sessions.save_session(&session).await?;
        tracing::info!(session_id = %session.id, documents = session.document_ids.len(), "session created");
        Ok(session)
    }

    /// Explicitly end a session
    pub async fn end_session(&self, session_id: &Uuid) -> Result<()> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let mut session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or(Error::SessionNotFound(*session_id))?;
        session.state = SessionState::Expired;
        self.sessions.save_session(&session).await?;
        tracing::info!(session_id = %session_id, "session ended");
        Ok(())
    }

    /// Per-session mutex; queries and state transitions for one session
    /// never interleave
    fn session_lock(&self, session_id: &Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(*session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Answer a query against a session's documents.
    ///
    /// Queries against one session are serialized so history ordering
    /// matches submission order. The history append is atomic: the
    /// (query, answer) pair lands together after the answer exists, so a
    /// cancelled call never leaves a partial exchange.
    pub async fn process_query(&self, session_id: &Uuid, query: &str) -> Result<Answer> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        let mut session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or(Error::SessionNotFound(*session_id))?;

        if session.is_expired(self.session_config.inactivity_secs, chrono::Utc::now()) {
            if session.state != SessionState::Expired {
                session.state = SessionState::Expired;
                self.sessions.save_session(&session).await?;
            }
            return Err(Error::SessionExpired(*session_id));
        }

        let documents = self.resolve_documents(&session)?;
        let chunks = self.retriever.retrieve(query, &documents).await?;
        let history_tail = session.history_tail(self.session_config.history_tail).to_vec();

        let (text, degraded) = self.generate_with_retry(query, &chunks, &history_tail).await?;

        let answer = Answer {
            text,
            sources: chunks
                .iter()
                .map(|s| SourceRef {
                    document_id: s.chunk.document_id,
                    page_number: s.chunk.page_number,
                    snippet: s.chunk.snippet(SNIPPET_LEN),
                })
                .collect(),
            degraded,
            created_at: chrono::Utc::now(),
        };

        session.record_exchange(query.to_string(), &answer, self.session_config.max_turns);
        self.sessions.save_session(&session).await?;

        Ok(answer)
    }

    /// Every document in the session's set must be indexed; a missing one
    /// fails explicitly rather than silently shrinking the context
    fn resolve_documents(&self, session: &Session) -> Result<Vec<Arc<IndexedDocument>>> {
        session
            .document_ids
            .iter()
            .map(|id| self.index.get(id).ok_or(Error::DocumentNotFound(*id)))
            .collect()
    }

    /// Call the answer provider with bounded exponential backoff; fall back
    /// to the extractive variant when every attempt fails. The degraded
    /// flag in the result is true only for the fallback path.
    async fn generate_with_retry(
        &self,
        query: &str,
        chunks: &[ScoredChunk],
        history: &[HistoryMessage],
    ) -> Result<(String, bool)> {
        let call_timeout = Duration::from_secs(self.llm_config.timeout_secs);
        let attempts = self.llm_config.max_retries + 1;

        for attempt in 0..attempts {
            match timeout(call_timeout, self.answerer.generate(query, chunks, history)).await {
                Ok(Ok(text)) => return Ok((text, false)),
                Ok(Err(e)) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        provider = self.answerer.name(),
                        "answer generation failed: {}",
                        e
                    );
                    if !e.is_retryable() {
                        break;
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        provider = self.answerer.name(),
                        "answer generation timed out"
                    );
                }
            }

            if attempt + 1 < attempts {
                let delay = self.llm_config.backoff_base_ms * (1u64 << attempt);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        tracing::warn!(
            provider = self.answerer.name(),
            fallback = self.fallback.name(),
            "provider unavailable, synthesizing degraded answer"
        );
        let text = self.fallback.generate(query, chunks, history).await?;
        Ok((text, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkingConfig, RetrievalConfig};
    use crate::providers::ExtractiveAnswerer;
    use crate::storage::MemorySessionStore;
    use crate::types::{Document, LanguageHint, Page};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedAnswerer;

    #[async_trait]
    impl AnswerProvider for FixedAnswerer {
        async fn generate(
            &self,
            _question: &str,
            _context: &[ScoredChunk],
            _history: &[HistoryMessage],
        ) -> Result<String> {
            Ok("a grounded answer".to_string())
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "fixed"
        }
        fn model(&self) -> &str {
            "fixed"
        }
    }

    struct FailingAnswerer {
        calls: AtomicU32,
    }

    #[async_trait]
    impl AnswerProvider for FailingAnswerer {
        async fn generate(
            &self,
            _question: &str,
            _context: &[ScoredChunk],
            _history: &[HistoryMessage],
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::provider("failing", "connection refused"))
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }
        fn name(&self) -> &str {
            "failing"
        }
        fn model(&self) -> &str {
            "failing"
        }
    }

    struct Fixture {
        coordinator: SessionCoordinator,
        store: Arc<MemorySessionStore>,
        document_id: Uuid,
    }

    fn fixture(answerer: Arc<dyn AnswerProvider>, session_config: SessionConfig) -> Fixture {
        let index = Arc::new(DocumentIndex::new(ChunkingConfig::default()));

        let mut document = Document::new(
            "fund.pdf".to_string(),
            &LanguageHint::Auto,
            "h".to_string(),
        );
        document.pages.push(Page::ok(
            1,
            "Total Assets: $1,500,000".to_string(),
            0.95,
        ));
        let document_id = document.id;
        let entities = vec![crate::extraction::extract_entities(
            &document.pages[0],
            &crate::config::EntityConfig::default(),
        )];
        index.index(document, Vec::new(), entities);

        let store = Arc::new(MemorySessionStore::new());
        let llm_config = LlmConfig {
            max_retries: 2,
            backoff_base_ms: 1,
            ..LlmConfig::default()
        };
        let coordinator = SessionCoordinator::new(
            Arc::clone(&index),
            Retriever::new(RetrievalConfig::default(), None),
            answerer,
            Arc::new(ExtractiveAnswerer::new()),
            Arc::clone(&store) as Arc<dyn SessionStore>,
            session_config,
            llm_config,
        );

        Fixture {
            coordinator,
            store,
            document_id,
        }
    }

    #[tokio::test]
    async fn query_returns_answer_with_sources() {
        let f = fixture(Arc::new(FixedAnswerer), SessionConfig::default());
        let session = f
            .coordinator
            .create_session(vec![f.document_id])
            .await
            .unwrap();

        let answer = f
            .coordinator
            .process_query(&session.id, "what is the total assets")
            .await
            .unwrap();

        assert!(!answer.degraded);
        assert_eq!(answer.text, "a grounded answer");
        assert!(answer.sources.iter().any(|s| s.page_number == 1));

        let stored = f.store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.history.len(), 2);
    }

    #[tokio::test]
    async fn unknown_session_is_rejected() {
        let f = fixture(Arc::new(FixedAnswerer), SessionConfig::default());
        let err = f
            .coordinator
            .process_query(&Uuid::new_v4(), "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn expired_session_rejected_without_history_mutation() {
        let f = fixture(Arc::new(FixedAnswerer), SessionConfig::default());
        let session = f
            .coordinator
            .create_session(vec![f.document_id])
            .await
            .unwrap();

        // Age the stored session past the inactivity window
        let mut stale = f.store.get_session(&session.id).await.unwrap().unwrap();
        stale.last_active = chrono::Utc::now() - chrono::Duration::hours(2);
        f.store.save_session(&stale).await.unwrap();

        let err = f
            .coordinator
            .process_query(&session.id, "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionExpired(_)));

        let after = f.store.get_session(&session.id).await.unwrap().unwrap();
        assert!(after.history.is_empty());
        assert_eq!(after.state, SessionState::Expired);
    }

    #[tokio::test]
    async fn ended_session_rejects_queries() {
        let f = fixture(Arc::new(FixedAnswerer), SessionConfig::default());
        let session = f
            .coordinator
            .create_session(vec![f.document_id])
            .await
            .unwrap();

        f.coordinator.end_session(&session.id).await.unwrap();
        let err = f
            .coordinator
            .process_query(&session.id, "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionExpired(_)));
    }

    #[tokio::test]
    async fn provider_outage_yields_degraded_answer_once_in_history() {
        let answerer = Arc::new(FailingAnswerer {
            calls: AtomicU32::new(0),
        });
        let f = fixture(answerer.clone(), SessionConfig::default());
        let session = f
            .coordinator
            .create_session(vec![f.document_id])
            .await
            .unwrap();

        let answer = f
            .coordinator
            .process_query(&session.id, "what is the total assets")
            .await
            .unwrap();

        // max_retries = 2 means three attempts before falling back
        assert_eq!(answerer.calls.load(Ordering::SeqCst), 3);
        assert!(answer.degraded);
        assert!(answer.text.contains("total_assets"));

        let stored = f.store.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.history.len(), 2);
    }

    #[tokio::test]
    async fn missing_document_fails_explicitly() {
        let f = fixture(Arc::new(FixedAnswerer), SessionConfig::default());
        let session = f
            .coordinator
            .create_session(vec![f.document_id, Uuid::new_v4()])
            .await
            .unwrap();

        let err = f
            .coordinator
            .process_query(&session.id, "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn history_stays_within_cap() {
        let config = SessionConfig {
            max_turns: 2,
            ..SessionConfig::default()
        };
        let f = fixture(Arc::new(FixedAnswerer), config);
        let session = f
            .coordinator
            .create_session(vec![f.document_id])
            .await
            .unwrap();

        for i in 0..6 {
            f.coordinator
                .process_query(&session.id, &format!("question {}", i))
                .await
                .unwrap();
            let stored = f.store.get_session(&session.id).await.unwrap().unwrap();
            assert!(stored.history.len() <= 4);
        }
    }
}
