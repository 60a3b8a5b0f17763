//! Conversational sessions with bounded history

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Expired,
}

/// Role of a history message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    Query,
    Answer,
}

/// One message in the session history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: MessageRole,
    pub text: String,
    /// Sources cited by an answer; empty for queries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceRef>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Reference to the page content an answer was grounded on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    pub document_id: Uuid,
    pub page_number: u32,
    /// Short excerpt of the cited chunk
    pub snippet: String,
}

/// An answer returned from `process_query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text
    pub text: String,
    /// Chunks/pages the answer was grounded on
    pub sources: Vec<SourceRef>,
    /// True when the answer was synthesized from extracted entities alone
    /// because the generation provider was unavailable
    pub degraded: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A bounded, stateful conversation scoped to a set of documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID
    pub id: Uuid,
    /// Documents this session may query. Weak references: deleting a
    /// document does not delete the session.
    pub document_ids: Vec<Uuid>,
    /// Alternating Query/Answer messages, oldest first
    pub history: Vec<HistoryMessage>,
    /// Lifecycle state
    pub state: SessionState,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Updated on every successful operation; drives expiry
    pub last_active: chrono::DateTime<chrono::Utc>,
}

impl Session {
    /// Create a new active session
    pub fn new(document_ids: Vec<Uuid>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Uuid::new_v4(),
            document_ids,
            history: Vec::new(),
            state: SessionState::Active,
            created_at: now,
            last_active: now,
        }
    }

    /// Append a completed (query, answer) exchange and enforce the history
    /// cap. The pair goes in together so a cancelled query never leaves a
    /// dangling message.
    pub fn record_exchange(&mut self, query: String, answer: &Answer, max_turns: usize) {
        let now = chrono::Utc::now();
        self.history.push(HistoryMessage {
            role: MessageRole::Query,
            text: query,
            sources: Vec::new(),
            timestamp: now,
        });
        self.history.push(HistoryMessage {
            role: MessageRole::Answer,
            text: answer.text.clone(),
            sources: answer.sources.clone(),
            timestamp: answer.created_at,
        });

        // Evict oldest pairs until within the cap
        let cap = max_turns.saturating_mul(2);
        while self.history.len() > cap {
            self.history.drain(..2);
        }

        self.last_active = now;
    }

    /// The last `n` messages, oldest first
    pub fn history_tail(&self, n: usize) -> &[HistoryMessage] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Whether the inactivity window has elapsed
    pub fn is_expired(&self, inactivity_secs: u64, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.state == SessionState::Expired
            || now.signed_duration_since(self.last_active)
                > chrono::Duration::seconds(inactivity_secs as i64)
    }
}
