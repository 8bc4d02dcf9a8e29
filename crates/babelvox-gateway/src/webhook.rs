//! WhatsApp webhook endpoint: subscription verification (GET) and event delivery (POST).

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use babelvox_channels::whatsapp::{parse_message, parse_webhook_payload, verify_signature};
use babelvox_core::error::BabelvoxError;
use babelvox_core::types::{InboundContent, InboundMessage, OutboundMessage};

use crate::commands::{Command, WELCOME_TEXT, confirmation_text, parse_command};
use crate::pipeline::{PipelineError, translate_voice_note};
use crate::state::GatewayState;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// A fault that aborts the rest of a webhook batch.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("session store failure: {0}")]
    Session(#[from] BabelvoxError),

    #[error("failed to send {what} to {recipient}: {source:#}")]
    Send {
        what: &'static str,
        recipient: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl WebhookError {
    pub fn stage(&self) -> &'static str {
        match self {
            WebhookError::Payload(_) => "payload",
            WebhookError::Session(_) => "session",
            WebhookError::Send { .. } => "send",
            WebhookError::Pipeline(e) => e.stage(),
        }
    }
}

/// How a single message was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    LanguageSet(String),
    /// `/translate_to` without a language; nothing changed.
    EmptyCommand,
    Translated,
    Ignored,
}

/// Verification handshake: echo `hub.challenge` when mode and token match.
pub async fn verify_webhook(
    State(state): State<Arc<GatewayState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);

    if mode == Some("subscribe") && token == Some(state.verify_token.as_str()) {
        info!("Webhook verified");
        let challenge = params.get("hub.challenge").cloned().unwrap_or_default();
        return (StatusCode::OK, challenge).into_response();
    }

    warn!(?mode, "Webhook verification failed");
    (StatusCode::FORBIDDEN, "Verification failed").into_response()
}

/// Event delivery. Replies `EVENT_RECEIVED` once the whole batch is handled.
pub async fn receive_webhook(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = state.app_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(&body, signature, secret) {
            warn!("Rejected webhook with invalid signature");
            return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
        }
    }

    match process_batch(&state, &body).await {
        Ok(count) => {
            debug!(messages = count, "Webhook batch processed");
            (StatusCode::OK, "EVENT_RECEIVED").into_response()
        }
        Err(e) => {
            error!(stage = e.stage(), error = %e, "Webhook processing failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "ERROR").into_response()
        }
    }
}

/// Handle every message in a webhook body, stopping at the first fault.
pub async fn process_batch(state: &GatewayState, body: &[u8]) -> Result<usize, WebhookError> {
    let payload = parse_webhook_payload(body)?;

    let mut count = 0;
    for raw in payload.into_messages() {
        let message = parse_message(raw)?;
        let outcome = handle_message(state, &message).await?;
        debug!(sender = %message.sender, ?outcome, "Message handled");
        count += 1;
    }
    Ok(count)
}

pub async fn handle_message(
    state: &GatewayState,
    message: &InboundMessage,
) -> Result<MessageOutcome, WebhookError> {
    let sender = message.sender.as_str();

    let (session, created) = state.sessions.get_or_create(sender).await?;
    if created {
        info!(sender, "New sender, sending welcome");
        send(state, sender, "welcome", OutboundMessage::text(WELCOME_TEXT)).await?;
    }

    match &message.content {
        InboundContent::Text { body } => match parse_command(body) {
            Some(Command::SetLanguage(Some(language))) => {
                state.sessions.set_target_language(sender, &language).await?;
                info!(sender, language = %language, "Target language set");
                send(
                    state,
                    sender,
                    "confirmation",
                    OutboundMessage::text(confirmation_text(&language)),
                )
                .await?;
                Ok(MessageOutcome::LanguageSet(language))
            }
            Some(Command::SetLanguage(None)) => {
                debug!(sender, "Language command without a language");
                Ok(MessageOutcome::EmptyCommand)
            }
            None => Ok(MessageOutcome::Ignored),
        },
        InboundContent::Audio { media_id, .. } => {
            translate_voice_note(state, sender, media_id, &session.target_language).await?;
            Ok(MessageOutcome::Translated)
        }
        InboundContent::Unsupported { kind } => {
            debug!(sender, kind = %kind, "Ignoring unsupported message");
            Ok(MessageOutcome::Ignored)
        }
    }
}

async fn send(
    state: &GatewayState,
    recipient: &str,
    what: &'static str,
    message: OutboundMessage,
) -> Result<(), WebhookError> {
    let result = state
        .messaging
        .send(recipient, message)
        .await
        .map_err(|source| WebhookError::Send {
            what,
            recipient: recipient.to_string(),
            source,
        })?;
    if result.rejected {
        warn!(recipient, what, "Reply rejected by the platform, continuing");
    }
    Ok(())
}
