//! Voice translation pipeline: fetch → transcribe → translate → synthesize → deliver.

use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use babelvox_core::types::OutboundMessage;

use crate::state::GatewayState;

/// A pipeline failure, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("media fetch failed: {0:#}")]
    FetchMedia(#[source] anyhow::Error),

    #[error("transcription failed: {0:#}")]
    Transcribe(#[source] anyhow::Error),

    #[error("translation failed: {0:#}")]
    Translate(#[source] anyhow::Error),

    #[error("speech synthesis failed: {0:#}")]
    Synthesize(#[source] anyhow::Error),

    #[error("audio delivery failed: {0:#}")]
    Deliver(#[source] anyhow::Error),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::FetchMedia(_) => "fetch_media",
            PipelineError::Transcribe(_) => "transcribe",
            PipelineError::Translate(_) => "translate",
            PipelineError::Synthesize(_) => "synthesize",
            PipelineError::Deliver(_) => "deliver",
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub transcript: String,
    pub translation: String,
    pub audio_bytes: usize,
}

/// Translate one voice note for `sender` and send the spoken translation back.
pub async fn translate_voice_note(
    state: &GatewayState,
    sender: &str,
    media_id: &str,
    target_language: &str,
) -> Result<PipelineOutcome, PipelineError> {
    let started = Instant::now();

    let audio = state
        .messaging
        .fetch_media(media_id)
        .await
        .map_err(PipelineError::FetchMedia)?;

    let transcript = state
        .stt
        .transcribe(&audio)
        .await
        .map_err(PipelineError::Transcribe)?;

    let translation = state
        .translator
        .translate(&transcript, target_language)
        .await
        .map_err(PipelineError::Translate)?;

    let clip = state
        .tts
        .synthesize(&translation, None)
        .await
        .map_err(PipelineError::Synthesize)?;
    let audio_bytes = clip.data.len();

    let sent = state
        .messaging
        .send(sender, OutboundMessage::audio(clip))
        .await
        .map_err(PipelineError::Deliver)?;
    if sent.rejected {
        warn!(sender, media_id, "Translated audio rejected by the platform");
    }

    info!(
        sender,
        media_id,
        target_language,
        input_bytes = audio.len(),
        audio_bytes,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Voice note translated"
    );

    Ok(PipelineOutcome {
        transcript,
        translation,
        audio_bytes,
    })
}
