use serde::{Deserialize, Serialize};

/// Default MIME type for synthesized audio sent back to users.
pub const DEFAULT_AUDIO_MIME: &str = "audio/mpeg";

/// What an inbound message carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundContent {
    Text { body: String },
    Audio {
        media_id: String,
        mime_type: Option<String>,
    },
    /// Any other payload kind (image, sticker, reaction, ...).
    Unsupported { kind: String },
}

/// A single message from a channel, already stripped of envelope fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub sender: String,
    pub content: InboundContent,
}

impl InboundMessage {
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            InboundContent::Text { body } => Some(body),
            _ => None,
        }
    }

    pub fn audio_id(&self) -> Option<&str> {
        match &self.content {
            InboundContent::Audio { media_id, .. } => Some(media_id),
            _ => None,
        }
    }
}

/// Audio bytes together with their declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }
}

/// Outbound message to send via a channel.
///
/// When both fields are set, channels send the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: Option<String>,
    pub audio: Option<AudioClip>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            audio: None,
        }
    }

    pub fn audio(clip: AudioClip) -> Self {
        Self {
            text: None,
            audio: Some(clip),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.as_deref().is_none_or(str::is_empty)
            && self.audio.as_ref().is_none_or(|a| a.data.is_empty())
    }
}
