//! In-memory conversation sessions.

use concierge_prompt::{ChatTurn, Role};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Per-session chat history, held only for the lifetime of the process.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<ChatTurn>>>,
    max_history: usize,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_history,
        }
    }

    /// Return the session id and a snapshot of its history.
    ///
    /// Without an id a fresh UUID is generated. An id that is not known yet
    /// is registered as an empty session under that id.
    pub async fn get_or_create(&self, session_id: Option<&str>) -> (String, Vec<ChatTurn>) {
        let id = match session_id {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };

        let mut sessions = self.sessions.write().await;
        let history = sessions.entry(id.clone()).or_insert_with(|| {
            tracing::debug!("Created session {}", id);
            Vec::new()
        });
        (id, history.clone())
    }

    /// Append a turn, dropping the oldest ones past `max_history`.
    /// Unknown ids are ignored.
    pub async fn add_message(&self, session_id: &str, role: Role, content: impl Into<String>) {
        let mut sessions = self.sessions.write().await;
        let Some(history) = sessions.get_mut(session_id) else {
            tracing::debug!("Ignoring message for unknown session {}", session_id);
            return;
        };

        history.push(ChatTurn::new(role, content));
        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(..excess);
        }
    }

    /// Replace an empty session's history with `turns`.
    ///
    /// Returns false when the session is unknown or already has turns.
    pub async fn seed(&self, session_id: &str, turns: Vec<ChatTurn>) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(history) if history.is_empty() => {
                let skip = turns.len().saturating_sub(self.max_history);
                history.extend(turns.into_iter().skip(skip));
                true
            }
            _ => false,
        }
    }

    pub async fn history(&self, session_id: &str) -> Option<Vec<ChatTurn>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Remove a session. Returns whether it existed.
    pub async fn clear_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            tracing::info!("Cleared session {}", session_id);
        }
        removed
    }
}
