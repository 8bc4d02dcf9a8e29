//! Audio normalization through ffmpeg.
//!
//! Equivalent to `ffmpeg -i input -ar 16000 -ac 1 -c:a pcm_s16le -f wav output.wav`,
//! streamed over stdin/stdout.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub const WAV_SAMPLE_RATE: u32 = 16000;

/// Converts arbitrary audio containers into 16 kHz mono PCM WAV.
#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg_path: String,
}

impl Transcoder {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    pub async fn to_wav(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut ffmpeg = tokio::process::Command::new(&self.ffmpeg_path)
            .args(wav_args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn ffmpeg at '{}'", self.ffmpeg_path))?;

        let mut stdin = ffmpeg.stdin.take().context("Failed to open ffmpeg stdin")?;
        let input = input.to_vec();
        // Feed stdin concurrently so a full stdout pipe cannot stall the write.
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = ffmpeg
            .wait_with_output()
            .await
            .context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or_default();
            anyhow::bail!("ffmpeg failed with status {}: {detail}", output.status);
        }

        writer
            .await
            .context("ffmpeg stdin writer panicked")?
            .context("Failed to write audio to ffmpeg")?;

        debug!(wav_bytes = output.stdout.len(), "Transcoded audio to WAV");
        Ok(output.stdout)
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

fn wav_args() -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        "pipe:0".into(),
        "-ar".into(),
        WAV_SAMPLE_RATE.to_string(),
        "-ac".into(),
        "1".into(),
        "-c:a".into(),
        "pcm_s16le".into(),
        "-f".into(),
        "wav".into(),
        "pipe:1".into(),
    ]
}
