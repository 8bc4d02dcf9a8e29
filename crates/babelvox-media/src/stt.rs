//! Speech-to-text via an OpenAI-compatible transcription endpoint.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use babelvox_core::config::{MediaConfig, OpenAiConfig};

use crate::SpeechToText;
use crate::transcode::Transcoder;

/// Build the transcription URL for a base URL such as `https://api.openai.com`.
pub fn transcription_url(base_url: &str) -> String {
    format!("{}/v1/audio/transcriptions", base_url.trim_end_matches('/'))
}

/// Whisper-style transcriber. Audio is normalized to WAV before upload.
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    transcoder: Transcoder,
}

impl OpenAiTranscriber {
    pub fn new(config: &OpenAiConfig, transcoder: Transcoder) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: transcription_url(&config.base_url),
            api_key: config.resolve_api_key(),
            model: config.transcription_model.clone(),
            transcoder,
        }
    }

    pub fn from_config(openai: &OpenAiConfig, media: &MediaConfig) -> Self {
        Self::new(openai, Transcoder::new(media.ffmpeg_path.clone()))
    }

    /// Upload an already-normalized WAV file.
    pub async fn transcribe_wav(&self, wav_data: Vec<u8>) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No transcription API key configured"))?;

        debug!(
            url = %self.url,
            model = %self.model,
            wav_bytes = wav_data.len(),
            "Sending audio for transcription"
        );

        let part = reqwest::multipart::Part::bytes(wav_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", part);

        let resp = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {api_key}"))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Transcription API error {status}: {body}");
        }

        let text = resp.text().await?;
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl SpeechToText for OpenAiTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let wav_data = self.transcoder.to_wav(audio).await?;
        self.transcribe_wav(wav_data).await
    }
}
