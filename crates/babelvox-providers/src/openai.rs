//! OpenAI Chat Completions API provider.
//!
//! Sends one non-streaming request to `/v1/chat/completions` per translation.
//! Any OpenAI-compatible server works by pointing `base_url` at it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use babelvox_core::config::OpenAiConfig;

use crate::{Translator, translation_prompt};

const OPENAI_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiTranslator {
    pub base_url: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiTranslator {
    pub fn new(base_url: Option<&str>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self::new(
            Some(&config.base_url),
            config.chat_model.clone(),
            config.resolve_api_key(),
        )
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

// --- OpenAI request/response types ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's content out of a completion response.
fn first_choice_content(response: ChatResponse) -> anyhow::Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow::anyhow!("Completion response has no message content"))
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn id(&self) -> &str {
        "openai"
    }

    async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No OpenAI API key configured"))?;

        let prompt = translation_prompt(text, target_language);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };

        debug!(model = %self.model, target_language, chars = text.len(), "Requesting translation");

        let resp = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error {status}: {body}");
        }

        let response: ChatResponse = resp.json().await?;
        first_choice_content(response)
    }
}
