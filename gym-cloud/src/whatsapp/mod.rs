//! WhatsApp Cloud API integration via REST
//!
//! Outbound text messages plus the pieces of the inbound webhook we consume.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::ProviderError;

const GRAPH_API: &str = "https://graph.facebook.com/v20.0";
const PROVIDER: &str = "whatsapp";

/// Messaging provider operations
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a text message to an E.164 number and return the provider message id.
    ///
    /// `from_phone_number_id` selects the sending business number; `None` uses
    /// the configured default.
    async fn send_text(
        &self,
        from_phone_number_id: Option<&str>,
        to: &str,
        body: &str,
    ) -> Result<String, ProviderError>;
}

#[derive(Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    access_token: Option<String>,
    phone_number_id: Option<String>,
    base_url: String,
}

impl WhatsAppClient {
    pub fn new(
        http: reqwest::Client,
        access_token: Option<String>,
        phone_number_id: Option<String>,
    ) -> Self {
        Self {
            http,
            access_token,
            phone_number_id,
            base_url: GRAPH_API.to_string(),
        }
    }
}

#[async_trait]
impl Messenger for WhatsAppClient {
    async fn send_text(
        &self,
        from_phone_number_id: Option<&str>,
        to: &str,
        body: &str,
    ) -> Result<String, ProviderError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(ProviderError::NotConfigured("WHATSAPP_ACCESS_TOKEN"))?;
        let sender = from_phone_number_id
            .or(self.phone_number_id.as_deref())
            .ok_or(ProviderError::NotConfigured("WHATSAPP_PHONE_NUMBER_ID"))?;

        let resp = self
            .http
            .post(format!("{}/{sender}/messages", self.base_url))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": to.trim_start_matches('+'),
                "type": "text",
                "text": { "preview_url": true, "body": body },
            }))
            .send()
            .await?;

        let status = resp.status();
        let json: serde_json::Value = resp.json().await?;
        if !status.is_success() {
            return Err(ProviderError::Rejected {
                provider: PROVIDER,
                status: status.as_u16(),
                message: json["error"]["message"]
                    .as_str()
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        json["messages"][0]["id"]
            .as_str()
            .map(String::from)
            .ok_or(ProviderError::Malformed {
                provider: PROVIDER,
                field: "messages[0].id",
            })
    }
}

/// Verify `X-Hub-Signature-256: sha256=<hex>` over the raw body
pub fn verify_signature(
    payload: &[u8],
    sig_header: &str,
    app_secret: &str,
) -> Result<(), &'static str> {
    let hex_sig = sig_header
        .trim()
        .strip_prefix("sha256=")
        .ok_or("Invalid X-Hub-Signature-256 header")?;
    let sig_bytes = hex::decode(hex_sig).map_err(|_| "Invalid signature hex")?;

    let mut mac =
        Hmac::<Sha256>::new_from_slice(app_secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(payload);
    mac.verify_slice(&sig_bytes)
        .map_err(|_| "Webhook signature mismatch")
}

// ── Inbound webhook payload ──

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
    pub value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChangeValue {
    pub metadata: Option<NumberMetadata>,
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

/// The business number that received the message
#[derive(Debug, Clone, Deserialize)]
pub struct NumberMetadata {
    pub display_phone_number: Option<String>,
    pub phone_number_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    pub from: String,
    /// Present for `type: text` only
    pub text: Option<TextBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// An inbound text message together with the number it was sent to
#[derive(Debug, Clone)]
pub struct InboundText {
    pub from: String,
    pub recipient: Option<String>,
    pub recipient_phone_number_id: Option<String>,
    pub body: String,
}

impl WebhookPayload {
    /// Flatten all text messages; status updates and media are skipped
    pub fn text_messages(&self) -> Vec<InboundText> {
        let mut out = Vec::new();
        for change in self.entry.iter().flat_map(|e| e.changes.iter()) {
            let meta = change.value.metadata.as_ref();
            for msg in &change.value.messages {
                let Some(text) = &msg.text else { continue };
                out.push(InboundText {
                    from: msg.from.clone(),
                    recipient: meta.and_then(|m| m.display_phone_number.clone()),
                    recipient_phone_number_id: meta.and_then(|m| m.phone_number_id.clone()),
                    body: text.body.clone(),
                });
            }
        }
        out
    }
}

#[cfg(test)]
pub(crate) fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
