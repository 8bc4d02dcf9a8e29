//! In-memory session store. Sessions live until the process exits.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{BabelvoxError, Result};
use crate::session::{Session, SessionStore};

/// Session store backed by a lock-guarded `HashMap`.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, sender: &str) -> Result<(Session, bool)> {
        if let Some(session) = self.sessions.read().await.get(sender) {
            return Ok((session.clone(), false));
        }

        // Re-check under the write lock; another request may have won the race.
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(sender) {
            return Ok((session.clone(), false));
        }
        let session = Session::new(sender);
        sessions.insert(sender.to_string(), session.clone());
        debug!(sender, "Created session");
        Ok((session, true))
    }

    async fn get(&self, sender: &str) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(sender).cloned())
    }

    async fn set_target_language(&self, sender: &str, language: &str) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(sender)
            .ok_or_else(|| BabelvoxError::Session(format!("no session for sender {sender}")))?;
        session.target_language = language.to_string();
        session.updated_at = chrono::Utc::now();
        debug!(sender, language, "Updated target language");
        Ok(session.clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.sessions.read().await.len())
    }
}
