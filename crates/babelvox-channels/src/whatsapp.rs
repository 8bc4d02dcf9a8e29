//! WhatsApp Business Cloud API channel implementation.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use tracing::{debug, warn};

use babelvox_core::config::WhatsAppConfig;
use babelvox_core::types::{InboundContent, InboundMessage, OutboundMessage};

use crate::{MessagingGateway, SendResult};

// --- Inbound webhook payload ---

/// Top-level webhook body: `entry[].changes[].value.messages[]`.
///
/// Messages are kept as raw JSON so a malformed message only fails when the
/// handler reaches it.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: WebhookValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

impl WebhookPayload {
    /// All messages of the batch, in delivery order.
    pub fn into_messages(self) -> Vec<serde_json::Value> {
        self.entry
            .into_iter()
            .flat_map(|e| e.changes)
            .flat_map(|c| c.value.messages)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    from: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    text: Option<WireText>,
    #[serde(default)]
    audio: Option<WireAudio>,
}

#[derive(Debug, Deserialize)]
struct WireText {
    body: String,
}

#[derive(Debug, Deserialize)]
struct WireAudio {
    id: String,
    #[serde(default)]
    mime_type: Option<String>,
}

/// Parse a webhook body.
pub fn parse_webhook_payload(body: &[u8]) -> serde_json::Result<WebhookPayload> {
    serde_json::from_slice(body)
}

/// Convert one raw webhook message.
///
/// The Cloud API sends exactly one payload per message, the one named by
/// `type`. A message carrying both `text` and `audio` is not something the
/// platform produces; it is read as text and the audio is dropped.
pub fn parse_message(raw: serde_json::Value) -> serde_json::Result<InboundMessage> {
    let wire: WireMessage = serde_json::from_value(raw)?;
    let content = match (wire.text, wire.audio) {
        (Some(text), _) => InboundContent::Text { body: text.body },
        (None, Some(audio)) => InboundContent::Audio {
            media_id: audio.id,
            mime_type: audio.mime_type,
        },
        (None, None) => InboundContent::Unsupported {
            kind: wire.kind.unwrap_or_else(|| "unknown".into()),
        },
    };
    Ok(InboundMessage {
        sender: wire.from,
        content,
    })
}

/// Verify Meta webhook signature (HMAC-SHA256 over the raw body).
pub fn verify_signature(payload: &[u8], signature: &str, app_secret: &str) -> bool {
    use hmac::{Hmac, Mac};
    let expected = signature.strip_prefix("sha256=").unwrap_or(signature);
    let Ok(expected) = hex::decode(expected) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Build the send API body, or `None` when there is nothing to send.
pub fn build_send_payload(to: &str, message: &OutboundMessage) -> Option<serde_json::Value> {
    if let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) {
        return Some(json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": text }
        }));
    }
    if let Some(audio) = message.audio.as_ref().filter(|a| !a.data.is_empty()) {
        return Some(json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "audio",
            "audio": {
                "data": BASE64.encode(&audio.data),
                "mime_type": audio.mime_type,
            }
        }));
    }
    None
}

// --- Outbound ---

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MediaLookup {
    url: Option<String>,
}

pub struct WhatsAppChannel {
    phone_number_id: Option<String>,
    access_token: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(config: &WhatsAppConfig) -> Self {
        Self {
            phone_number_id: config.resolve_phone_number_id(),
            access_token: config.resolve_access_token(),
            api_base: format!(
                "{}/{}",
                config.graph_base_url.trim_end_matches('/'),
                config.api_version
            ),
            client: reqwest::Client::new(),
        }
    }

    fn access_token(&self) -> anyhow::Result<&str> {
        self.access_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("WhatsApp access token not configured"))
    }

    fn messages_url(&self) -> anyhow::Result<String> {
        let phone_number_id = self
            .phone_number_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("WhatsApp phone number id not configured"))?;
        Ok(format!("{}/{phone_number_id}/messages", self.api_base))
    }

    fn media_url(&self, media_id: &str) -> String {
        format!("{}/{media_id}", self.api_base)
    }

    async fn get_authorized(&self, url: &str) -> anyhow::Result<reqwest::Response> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(self.access_token()?)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("WhatsApp API error {status}: {body}");
        }
        Ok(resp)
    }
}

#[async_trait]
impl MessagingGateway for WhatsAppChannel {
    fn id(&self) -> &str {
        "whatsapp"
    }

    async fn send(&self, recipient: &str, message: OutboundMessage) -> anyhow::Result<SendResult> {
        let Some(payload) = build_send_payload(recipient, &message) else {
            debug!(recipient, "Nothing to send");
            return Ok(SendResult::skipped());
        };

        let resp = self
            .client
            .post(self.messages_url()?)
            .bearer_auth(self.access_token()?)
            .json(&payload)
            .send()
            .await?;

        // Non-2xx is reported in the result; only transport failures are errors.
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(recipient, %status, body = %body, "WhatsApp rejected message");
            return Ok(SendResult::rejected());
        }

        let message_id = resp
            .json::<SendResponse>()
            .await
            .ok()
            .and_then(|r| r.messages.into_iter().next())
            .map(|m| m.id);
        debug!(
            recipient,
            ?message_id,
            kind = payload["type"].as_str().unwrap_or_default(),
            "WhatsApp message sent"
        );

        Ok(SendResult {
            message_id,
            ..SendResult::default()
        })
    }

    async fn fetch_media(&self, media_id: &str) -> anyhow::Result<Vec<u8>> {
        let lookup: MediaLookup = self
            .get_authorized(&self.media_url(media_id))
            .await?
            .json()
            .await?;
        let url = lookup
            .url
            .ok_or_else(|| anyhow::anyhow!("Media {media_id} lookup returned no url"))?;

        let bytes = self.get_authorized(&url).await?.bytes().await?;
        debug!(media_id, bytes = bytes.len(), "Downloaded WhatsApp media");
        Ok(bytes.to_vec())
    }
}
