//! Session history store.
//!
//! Sessions are created lazily on first reference and live for the life of
//! the process. Each session sits behind its own async mutex inside a
//! sharded map, so different sessions never wait on each other.

use chrono::{DateTime, Utc};
use colloquy_llm::ChatMessage;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        match turn.role {
            TurnRole::User => ChatMessage::user(turn.content.clone()),
            TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
        }
    }
}

/// Turns as chat messages, oldest first.
pub fn to_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns.iter().map(ChatMessage::from).collect()
}

/// Conversation state for one session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    fn new(session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.to_string(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn push_all(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.turns.extend(turns);
        self.updated_at = Utc::now();
    }
}

/// Exclusive access to one session, held across a whole request.
///
/// Owned, so it can move into the answer stream. Dropping it releases the
/// session for the next queued request.
pub struct SessionGuard {
    session: OwnedMutexGuard<Session>,
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    pub fn turns(&self) -> &[Turn] {
        &self.session.turns
    }

    /// Append `turns` in order.
    pub fn append(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.session.push_all(turns);
    }
}

/// Keyed store of sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session's cell, created on first use. The map shard lock is
    /// released before returning.
    fn cell(&self, session_id: &str) -> Arc<Mutex<Session>> {
        if let Some(existing) = self.sessions.get(session_id) {
            return Arc::clone(existing.value());
        }

        let cell = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "Creating session");
                Arc::new(Mutex::new(Session::new(session_id)))
            });
        Arc::clone(cell.value())
    }

    /// Snapshot of a session, creating it empty if unseen.
    ///
    /// Waits for any request currently holding the session.
    pub async fn get(&self, session_id: &str) -> Session {
        self.cell(session_id).lock().await.clone()
    }

    /// Append `turns` atomically and in order.
    pub async fn append(&self, session_id: &str, turns: impl IntoIterator<Item = Turn>) {
        self.cell(session_id).lock_owned().await.push_all(turns);
    }

    /// Wait for exclusive access to a session.
    pub async fn lock(&self, session_id: &str) -> SessionGuard {
        SessionGuard {
            session: self.cell(session_id).lock_owned().await,
        }
    }

    /// Number of sessions created so far.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
