//! Stripe integration via REST API (no SDK dependency)

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::ProviderError;

const STRIPE_API: &str = "https://api.stripe.com/v1";
const PROVIDER: &str = "stripe";

/// Webhook events older than this are rejected (replay protection)
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Checkout session id prefix
pub const SESSION_PREFIX: &str = "cs_";
const SUBSCRIPTION_PREFIX: &str = "sub_";

/// Whether `id` is `<prefix>` followed by one or more `[A-Za-z0-9_]`.
///
/// Ids are interpolated into request paths, so anything else is refused.
pub fn is_object_id(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix).is_some_and(|rest| {
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Checkout session id check, see [`is_object_id`]
pub fn is_session_id(id: &str) -> bool {
    is_object_id(id, SESSION_PREFIX)
}

/// Stripe checkout `mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    /// Immediate charge
    Payment,
    /// Collect a payment method only, nothing charged
    Setup,
    /// Recurring charge at `recurring[interval]`
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Setup => "setup",
            Self::Subscription => "subscription",
        }
    }
}

/// Parameters for a hosted checkout session
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub mode: CheckoutMode,
    pub product_name: String,
    /// Minor currency units (pence)
    pub unit_amount: i64,
    pub currency: String,
    /// `week` / `month`, subscription mode only
    pub interval: Option<&'static str>,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub metadata: Vec<(String, String)>,
}

impl CheckoutRequest {
    /// Encode as Stripe form fields
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), self.mode.as_str().into()),
            ("success_url".into(), self.success_url.clone()),
            ("cancel_url".into(), self.cancel_url.clone()),
        ];

        match self.mode {
            CheckoutMode::Setup => {
                form.push(("currency".into(), self.currency.clone()));
                form.push(("customer_creation".into(), "always".into()));
            }
            CheckoutMode::Payment | CheckoutMode::Subscription => {
                let item = "line_items[0]";
                form.push((format!("{item}[quantity]"), "1".into()));
                form.push((format!("{item}[price_data][currency]"), self.currency.clone()));
                form.push((
                    format!("{item}[price_data][unit_amount]"),
                    self.unit_amount.to_string(),
                ));
                form.push((
                    format!("{item}[price_data][product_data][name]"),
                    self.product_name.clone(),
                ));
                if let Some(interval) = self.interval {
                    form.push((
                        format!("{item}[price_data][recurring][interval]"),
                        interval.into(),
                    ));
                }
                if self.mode == CheckoutMode::Payment {
                    form.push(("customer_creation".into(), "always".into()));
                }
            }
        }

        if let Some(email) = &self.customer_email {
            form.push(("customer_email".into(), email.clone()));
        }
        for (key, value) in &self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        form
    }
}

/// Session created by [`PaymentGateway::create_checkout_session`]
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub id: String,
    pub url: String,
}

/// Checkout session as returned by `GET /v1/checkout/sessions/{id}`
/// (and embedded in `checkout.session.completed` events)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Metadata value, treating empty strings as absent
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn is_complete(&self) -> bool {
        self.status.as_deref() == Some("complete")
    }
}

/// Subset of a Stripe subscription used for billing fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub id: String,
    pub customer: Option<String>,
    /// Unix seconds
    pub current_period_end: Option<i64>,
}

impl SubscriptionInfo {
    /// Newer API versions moved `current_period_end` onto the subscription items
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let id = value["id"].as_str()?.to_string();
        let customer = match &value["customer"] {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(o) => o.get("id").and_then(|v| v.as_str()).map(String::from),
            _ => None,
        };
        let current_period_end = value["current_period_end"]
            .as_i64()
            .or_else(|| value["items"]["data"][0]["current_period_end"].as_i64());
        Some(Self {
            id,
            customer,
            current_period_end,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Refund {
    pub id: String,
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub payment_intent: String,
}

/// Payment provider operations used by the services
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CreatedSession, ProviderError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, ProviderError>;

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, ProviderError>;

    /// Full refund of the payment intent behind a checkout session
    async fn refund_session(&self, session_id: &str) -> Result<Refund, ProviderError>;
}

/// Stripe REST client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: Option<String>,
    base_url: String,
}

impl StripeClient {
    pub fn new(http: reqwest::Client, secret_key: Option<String>) -> Self {
        Self {
            http,
            secret_key,
            base_url: STRIPE_API.to_string(),
        }
    }

    fn key(&self) -> Result<&str, ProviderError> {
        self.secret_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("STRIPE_SECRET_KEY"))
    }

    async fn get(&self, path: &str) -> Result<serde_json::Value, ProviderError> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .basic_auth(self.key()?, None::<&str>)
            .send()
            .await?;
        read_response(resp).await
    }

    async fn post_form(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<serde_json::Value, ProviderError> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .basic_auth(self.key()?, None::<&str>)
            .form(form)
            .send()
            .await?;
        read_response(resp).await
    }
}

async fn read_response(resp: reqwest::Response) -> Result<serde_json::Value, ProviderError> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await?;
    if !status.is_success() {
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        return Err(ProviderError::Rejected {
            provider: PROVIDER,
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CreatedSession, ProviderError> {
        let resp = self
            .post_form("/checkout/sessions", &request.form_fields())
            .await?;

        let id = resp["id"].as_str().ok_or(ProviderError::Malformed {
            provider: PROVIDER,
            field: "id",
        })?;
        let url = resp["url"].as_str().ok_or(ProviderError::Malformed {
            provider: PROVIDER,
            field: "url",
        })?;
        Ok(CreatedSession {
            id: id.to_string(),
            url: url.to_string(),
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, ProviderError> {
        if !is_session_id(session_id) {
            return Err(ProviderError::InvalidId {
                provider: PROVIDER,
                kind: "checkout session",
            });
        }
        let resp = self.get(&format!("/checkout/sessions/{session_id}")).await?;
        serde_json::from_value(resp).map_err(|_| ProviderError::Malformed {
            provider: PROVIDER,
            field: "checkout.session",
        })
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, ProviderError> {
        if !is_object_id(subscription_id, SUBSCRIPTION_PREFIX) {
            return Err(ProviderError::InvalidId {
                provider: PROVIDER,
                kind: "subscription",
            });
        }
        let resp = self.get(&format!("/subscriptions/{subscription_id}")).await?;
        SubscriptionInfo::from_json(&resp).ok_or(ProviderError::Malformed {
            provider: PROVIDER,
            field: "id",
        })
    }

    async fn refund_session(&self, session_id: &str) -> Result<Refund, ProviderError> {
        let session = self.retrieve_session(session_id).await?;
        let payment_intent = session.payment_intent.ok_or(ProviderError::Malformed {
            provider: PROVIDER,
            field: "payment_intent",
        })?;

        let resp = self
            .post_form(
                "/refunds",
                &[("payment_intent".to_string(), payment_intent.clone())],
            )
            .await?;

        let id = resp["id"].as_str().ok_or(ProviderError::Malformed {
            provider: PROVIDER,
            field: "id",
        })?;
        Ok(Refund {
            id: id.to_string(),
            status: resp["status"].as_str().map(String::from),
            amount: resp["amount"].as_i64(),
            payment_intent,
        })
    }
}

/// Verify Stripe webhook signature (HMAC-SHA256)
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
) -> Result<(), &'static str> {
    verify_webhook_signature_at(payload, sig_header, secret, chrono::Utc::now().timestamp())
}

/// [`verify_webhook_signature`] against an explicit clock (Unix seconds)
pub fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), &'static str> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err("Invalid Stripe-Signature header");
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| "HMAC key error")?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Stripe sends one v1 per active secret during rotation
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err("Webhook signature mismatch");
    }

    let ts: i64 = timestamp.parse().map_err(|_| "Invalid timestamp")?;
    if (now - ts).abs() > WEBHOOK_TOLERANCE_SECS {
        return Err("Webhook timestamp too old");
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    #[test]
    fn valid_signature_accepted() {
        let now = 1_700_000_000;
        let header = sign_payload(BODY, SECRET, now);
        assert!(verify_webhook_signature_at(BODY, &header, SECRET, now + 10).is_ok());
    }

    #[test]
    fn tampered_body_rejected() {
        let now = 1_700_000_000;
        let header = sign_payload(BODY, SECRET, now);
        let tampered = br#"{"id":"evt_2","type":"checkout.session.completed"}"#;
        assert_eq!(
            verify_webhook_signature_at(tampered, &header, SECRET, now),
            Err("Webhook signature mismatch")
        );
    }

    #[test]
    fn wrong_secret_rejected() {
        let now = 1_700_000_000;
        let header = sign_payload(BODY, "whsec_other", now);
        assert!(verify_webhook_signature_at(BODY, &header, SECRET, now).is_err());
    }

    #[test]
    fn stale_timestamp_rejected() {
        let now = 1_700_000_000;
        let header = sign_payload(BODY, SECRET, now);
        assert_eq!(
            verify_webhook_signature_at(BODY, &header, SECRET, now + WEBHOOK_TOLERANCE_SECS + 1),
            Err("Webhook timestamp too old")
        );
    }

    #[test]
    fn any_matching_v1_accepted() {
        let now = 1_700_000_000;
        let good = sign_payload(BODY, SECRET, now);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={now},v1={},v1={good_sig}", "00".repeat(32));
        assert!(verify_webhook_signature_at(BODY, &header, SECRET, now).is_ok());
    }

    #[test]
    fn malformed_header_rejected() {
        assert_eq!(
            verify_webhook_signature_at(BODY, "garbage", SECRET, 0),
            Err("Invalid Stripe-Signature header")
        );
    }

    #[test]
    fn object_ids_are_path_safe() {
        assert!(is_session_id("cs_test_a1B2c3"));
        assert!(is_object_id("sub_1Nx", "sub_"));
        assert!(!is_session_id("cs_"));
        assert!(!is_session_id("pi_123"));
        assert!(!is_session_id("../../customers/cus_x"));
        assert!(!is_session_id("cs_1/../../customers/cus_x"));
        assert!(!is_session_id("cs_1?expand[]=customer"));
        assert!(!is_session_id("cs_1%2F.."));
        assert!(!is_object_id("sub_1#frag", "sub_"));
    }

    #[tokio::test]
    async fn client_refuses_unsafe_ids_without_a_request() {
        // unroutable base url: reaching the network would surface as Transport
        let client = StripeClient {
            http: reqwest::Client::new(),
            secret_key: Some("sk_test".into()),
            base_url: "http://127.0.0.1:9".into(),
        };
        assert!(matches!(
            client.retrieve_session("cs_1/../../charges").await,
            Err(ProviderError::InvalidId { .. })
        ));
        assert!(matches!(
            client.refund_session("../x").await,
            Err(ProviderError::InvalidId { .. })
        ));
        assert!(matches!(
            client.retrieve_subscription("sub_1?expand[]=customer").await,
            Err(ProviderError::InvalidId { .. })
        ));
    }

    #[test]
    fn subscription_mode_form_has_interval() {
        let req = CheckoutRequest {
            mode: CheckoutMode::Subscription,
            product_name: "Monthly PT".into(),
            unit_amount: 4000,
            currency: "gbp".into(),
            interval: Some("month"),
            success_url: "https://gym.test/ok".into(),
            cancel_url: "https://gym.test/cancel".into(),
            customer_email: None,
            metadata: vec![("flow".into(), "coach_slot".into())],
        };
        let form = req.form_fields();
        let get = |k: &str| form.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("mode"), Some("subscription"));
        assert_eq!(get("line_items[0][price_data][recurring][interval]"), Some("month"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("4000"));
        assert_eq!(get("metadata[flow]"), Some("coach_slot"));
        assert_eq!(get("customer_creation"), None);
    }

    #[test]
    fn setup_mode_form_has_no_line_items() {
        let req = CheckoutRequest {
            mode: CheckoutMode::Setup,
            product_name: "Pay as you go".into(),
            unit_amount: 0,
            currency: "gbp".into(),
            interval: None,
            success_url: "s".into(),
            cancel_url: "c".into(),
            customer_email: Some("a@b.test".into()),
            metadata: vec![],
        };
        let form = req.form_fields();
        assert!(form.iter().all(|(k, _)| !k.starts_with("line_items")));
        assert!(form.contains(&("currency".to_string(), "gbp".to_string())));
        assert!(form.contains(&("customer_email".to_string(), "a@b.test".to_string())));
    }

    #[test]
    fn subscription_period_end_falls_back_to_items() {
        let legacy = serde_json::json!({
            "id": "sub_1", "customer": "cus_1", "current_period_end": 1_710_504_000
        });
        let items = serde_json::json!({
            "id": "sub_2",
            "customer": {"id": "cus_2"},
            "items": {"data": [{"current_period_end": 1_710_504_001}]}
        });
        let a = SubscriptionInfo::from_json(&legacy).unwrap();
        let b = SubscriptionInfo::from_json(&items).unwrap();
        assert_eq!(a.current_period_end, Some(1_710_504_000));
        assert_eq!(b.customer.as_deref(), Some("cus_2"));
        assert_eq!(b.current_period_end, Some(1_710_504_001));
    }

    #[test]
    fn session_metadata_blank_is_absent() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "status": "complete",
            "metadata": {"slot_id": "", "class_id": " c1 "}
        }))
        .unwrap();
        assert!(session.is_complete());
        assert_eq!(session.meta("slot_id"), None);
        assert_eq!(session.meta("class_id"), Some("c1"));
    }
}
