//! Messaging gateway abstraction and built-in channel implementations.
//!
//! A messaging platform implements [`MessagingGateway`]: it delivers outbound
//! text or audio and resolves inbound media references to bytes. Channels are
//! feature-gated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use babelvox_core::types::OutboundMessage;

#[cfg(feature = "whatsapp")]
pub mod whatsapp;

/// Result of sending a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResult {
    /// Platform message id, when the platform returned one.
    pub message_id: Option<String>,
    /// True when the message had no content and nothing was sent.
    pub skipped: bool,
    /// True when the platform answered with a non-success status.
    pub rejected: bool,
}

impl SendResult {
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub fn rejected() -> Self {
        Self {
            rejected: true,
            ..Self::default()
        }
    }
}

/// The core messaging trait.
#[async_trait]
pub trait MessagingGateway: Send + Sync + 'static {
    /// Unique channel identifier (e.g., "whatsapp").
    fn id(&self) -> &str;

    /// Send a message to a recipient. Empty messages are a no-op.
    ///
    /// Transport failures are errors; a platform rejection comes back as
    /// [`SendResult::rejected`].
    async fn send(&self, recipient: &str, message: OutboundMessage) -> anyhow::Result<SendResult>;

    /// Resolve a media reference and download its bytes.
    async fn fetch_media(&self, media_id: &str) -> anyhow::Result<Vec<u8>>;
}
