//! Session model: per-sender translation preferences.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Target language for senders who never issued a language command.
pub const DEFAULT_TARGET_LANGUAGE: &str = "English";

/// Preferences stored for one sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub sender: String,
    pub target_language: String,
    pub seen_welcome: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session. The welcome is sent by whoever creates it.
    pub fn new(sender: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            sender: sender.into(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            seen_welcome: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Keyed storage for sessions.
///
/// Every method is atomic with respect to the sender key: two concurrent
/// `get_or_create` calls for the same sender report `created == true` at most once.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the sender's session, creating it with defaults if absent.
    /// The flag is `true` when this call created it.
    async fn get_or_create(&self, sender: &str) -> Result<(Session, bool)>;

    async fn get(&self, sender: &str) -> Result<Option<Session>>;

    /// Update the target language of an existing session.
    async fn set_target_language(&self, sender: &str, language: &str) -> Result<Session>;

    /// Number of known senders.
    async fn count(&self) -> Result<usize>;
}
