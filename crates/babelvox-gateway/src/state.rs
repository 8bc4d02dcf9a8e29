//! Gateway shared state.

use std::sync::Arc;

use babelvox_channels::MessagingGateway;
use babelvox_channels::whatsapp::WhatsAppChannel;
use babelvox_core::config::Config;
use babelvox_core::session::SessionStore;
use babelvox_core::session_store::InMemorySessionStore;
use babelvox_media::stt::OpenAiTranscriber;
use babelvox_media::tts::OpenAiSpeech;
use babelvox_media::{SpeechToText, TextToSpeech};
use babelvox_providers::Translator;
use babelvox_providers::openai::OpenAiTranslator;

/// Shared state accessible from all request handlers.
pub struct GatewayState {
    pub sessions: Arc<dyn SessionStore>,
    pub messaging: Arc<dyn MessagingGateway>,
    pub stt: Arc<dyn SpeechToText>,
    pub translator: Arc<dyn Translator>,
    pub tts: Arc<dyn TextToSpeech>,
    /// Token Meta must echo back during webhook verification.
    pub verify_token: String,
    /// When set, POST bodies must carry a valid `X-Hub-Signature-256`.
    pub app_secret: Option<String>,
}

impl GatewayState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        messaging: Arc<dyn MessagingGateway>,
        stt: Arc<dyn SpeechToText>,
        translator: Arc<dyn Translator>,
        tts: Arc<dyn TextToSpeech>,
        verify_token: String,
        app_secret: Option<String>,
    ) -> Self {
        Self {
            sessions,
            messaging,
            stt,
            translator,
            tts,
            verify_token,
            app_secret,
        }
    }

    /// Wire the WhatsApp channel and OpenAI adapters from config.
    pub fn from_config(config: &Config) -> Self {
        let openai = config.openai();
        let whatsapp = config.whatsapp();

        Self::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(WhatsAppChannel::new(&whatsapp)),
            Arc::new(OpenAiTranscriber::from_config(&openai, &config.media())),
            Arc::new(OpenAiTranslator::from_config(&openai)),
            Arc::new(OpenAiSpeech::from_config(&openai)),
            whatsapp.resolve_verify_token(),
            whatsapp.resolve_app_secret(),
        )
    }
}
