//! In-memory adapters for handler tests. Every call is appended to a shared log.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use babelvox_channels::{MessagingGateway, SendResult};
use babelvox_core::session_store::InMemorySessionStore;
use babelvox_core::types::{AudioClip, DEFAULT_AUDIO_MIME, OutboundMessage};
use babelvox_media::{SpeechToText, TextToSpeech};
use babelvox_providers::Translator;

use crate::state::GatewayState;

pub const VERIFY_TOKEN: &str = "test-verify-token";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchMedia(String),
    Transcribe,
    Translate { text: String, target: String },
    Synthesize(String),
    SendText { to: String, body: String },
    SendAudio { to: String },
}

#[derive(Clone, Default)]
pub struct Fakes {
    log: Arc<Mutex<Vec<Call>>>,
    failing: Arc<Mutex<Option<&'static str>>>,
    reject_texts: Arc<Mutex<bool>>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the adapter for `stage` fail from now on.
    pub fn fail_stage(&self, stage: &'static str) {
        *self.failing.lock().unwrap() = Some(stage);
    }

    /// Answer text sends like a platform that refuses them.
    pub fn reject_texts(&self) {
        *self.reject_texts.lock().unwrap() = true;
    }

    pub fn state(&self) -> GatewayState {
        self.state_with_secret(None)
    }

    pub fn state_with_secret(&self, app_secret: Option<&str>) -> GatewayState {
        GatewayState::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            VERIFY_TOKEN.to_string(),
            app_secret.map(str::to_string),
        )
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    /// Adapter calls other than sends.
    pub fn pipeline_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::SendText { .. } | Call::SendAudio { .. }))
            .collect()
    }

    pub fn texts_to(&self, recipient: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendText { to, body } if to == recipient => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn audio_sent_to(&self, recipient: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::SendAudio { to } if to == recipient))
            .count()
    }

    fn record(&self, stage: &'static str, call: Call) -> anyhow::Result<()> {
        if *self.failing.lock().unwrap() == Some(stage) {
            anyhow::bail!("{stage} unavailable");
        }
        self.log.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for Fakes {
    fn id(&self) -> &str {
        "fake"
    }

    async fn send(&self, recipient: &str, message: OutboundMessage) -> anyhow::Result<SendResult> {
        let to = recipient.to_string();
        match (message.text, message.audio) {
            (Some(_), _) if *self.reject_texts.lock().unwrap() => {
                return Ok(SendResult::rejected());
            }
            (Some(body), _) => self.record("send_text", Call::SendText { to, body })?,
            (None, Some(_)) => self.record("deliver", Call::SendAudio { to })?,
            (None, None) => return Ok(SendResult::skipped()),
        }
        Ok(SendResult::default())
    }

    async fn fetch_media(&self, media_id: &str) -> anyhow::Result<Vec<u8>> {
        self.record("fetch_media", Call::FetchMedia(media_id.to_string()))?;
        Ok(b"OggS".to_vec())
    }
}

#[async_trait]
impl SpeechToText for Fakes {
    async fn transcribe(&self, _audio: &[u8]) -> anyhow::Result<String> {
        self.record("transcribe", Call::Transcribe)?;
        Ok("hola".to_string())
    }
}

#[async_trait]
impl Translator for Fakes {
    fn id(&self) -> &str {
        "fake"
    }

    async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String> {
        self.record(
            "translate",
            Call::Translate {
                text: text.to_string(),
                target: target_language.to_string(),
            },
        )?;
        Ok(if text == "hola" { "hello" } else { text }.to_string())
    }
}

#[async_trait]
impl TextToSpeech for Fakes {
    async fn synthesize(&self, text: &str, _voice: Option<&str>) -> anyhow::Result<AudioClip> {
        self.record("synthesize", Call::Synthesize(text.to_string()))?;
        Ok(AudioClip::new(
            format!("ID3:{text}").into_bytes(),
            DEFAULT_AUDIO_MIME,
        ))
    }
}

pub fn text_message(from: &str, body: &str) -> Value {
    json!({ "from": from, "type": "text", "text": { "body": body } })
}

pub fn audio_message(from: &str, media_id: &str) -> Value {
    json!({
        "from": from,
        "type": "audio",
        "audio": { "id": media_id, "mime_type": "audio/ogg; codecs=opus" }
    })
}

/// Wrap messages in a single-entry webhook envelope.
pub fn webhook_body(messages: Vec<Value>) -> Vec<u8> {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{ "changes": [{ "value": { "messaging_product": "whatsapp", "messages": messages } }] }]
    })
    .to_string()
    .into_bytes()
}
