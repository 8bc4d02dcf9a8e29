//! Text-to-speech via an OpenAI-compatible `/v1/audio/speech` endpoint.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use babelvox_core::config::OpenAiConfig;
use babelvox_core::types::{AudioClip, DEFAULT_AUDIO_MIME};

use crate::TextToSpeech;

pub fn speech_url(base_url: &str) -> String {
    format!("{}/v1/audio/speech", base_url.trim_end_matches('/'))
}

/// MIME type of the audio returned for a given `response_format`.
pub fn mime_for_format(format: &str) -> &'static str {
    match format {
        "opus" => "audio/ogg",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        "pcm" => "audio/pcm",
        _ => DEFAULT_AUDIO_MIME,
    }
}

pub struct OpenAiSpeech {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    voice: String,
    response_format: String,
}

impl OpenAiSpeech {
    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: speech_url(&config.base_url),
            api_key: config.resolve_api_key(),
            model: config.tts_model.clone(),
            voice: config.voice.clone(),
            response_format: config.response_format.clone(),
        }
    }

    pub fn default_voice(&self) -> &str {
        &self.voice
    }

    fn request_body(&self, text: &str, voice: &str) -> serde_json::Value {
        json!({
            "model": self.model,
            "voice": voice,
            "input": text,
            "response_format": self.response_format,
        })
    }
}

#[async_trait]
impl TextToSpeech for OpenAiSpeech {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<AudioClip> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No TTS API key configured"))?;
        let voice = voice.unwrap_or(&self.voice);

        let resp = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&self.request_body(text, voice))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("TTS API error {status}: {body}");
        }

        let bytes = resp.bytes().await?;
        info!(
            voice,
            model = %self.model,
            size_kb = bytes.len() / 1024,
            "TTS audio generated"
        );

        Ok(AudioClip::new(
            bytes.to_vec(),
            mime_for_format(&self.response_format),
        ))
    }
}
