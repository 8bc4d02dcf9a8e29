//! Media pipeline: audio normalization, STT and TTS.
//!
//! Adapters implement [`SpeechToText`] and [`TextToSpeech`] so the webhook
//! handler can be exercised without network access.

use async_trait::async_trait;

use babelvox_core::types::AudioClip;

pub mod stt;
pub mod transcode;
pub mod tts;

/// Turns recorded speech into text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe audio in any container format. The source language is auto-detected.
    async fn transcribe(&self, audio: &[u8]) -> anyhow::Result<String>;
}

/// Turns text into speech.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize `text`. `voice` overrides the adapter's default voice.
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> anyhow::Result<AudioClip>;
}
