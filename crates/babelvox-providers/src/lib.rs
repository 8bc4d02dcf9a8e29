//! Translation providers.
//!
//! Each provider implements the [`Translator`] trait. Translation is done by
//! prompting a text-generation model, so the target language is a free-form
//! name ("French", "Brazilian Portuguese") rather than a language code.

use async_trait::async_trait;

pub mod openai;

/// Build the instruction sent to the model for a translation.
pub fn translation_prompt(text: &str, target_language: &str) -> String {
    format!("Translate the following text to {target_language}:\n{text}")
}

/// The core translation trait.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Provider identifier (e.g., "openai").
    fn id(&self) -> &str;

    /// Translate `text` into `target_language`, returning the model output verbatim.
    async fn translate(&self, text: &str, target_language: &str) -> anyhow::Result<String>;
}
