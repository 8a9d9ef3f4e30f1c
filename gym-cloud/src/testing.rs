//! Fakes for the provider traits and a ready-made [`AppState`] over them

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::db::memory::MemoryStore;
use crate::email::{EmailMessage, Mailer};
use crate::error::ProviderError;
use crate::state::AppState;
use crate::stripe::{
    CheckoutMode, CheckoutRequest, CheckoutSession, CreatedSession, PaymentGateway, Refund,
    SubscriptionInfo,
};
use crate::whatsapp::Messenger;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_test";
pub const WHATSAPP_VERIFY_TOKEN: &str = "verify-me";
pub const WHATSAPP_APP_SECRET: &str = "wa-app-secret";
pub const BASE_URL: &str = "https://gym.test";
/// 2024-03-15T12:00:00Z
pub const PERIOD_END: i64 = 1_710_504_000;

/// A completed payment-mode session with the given metadata
pub fn completed_session(id: &str, metadata: &[(&str, &str)]) -> CheckoutSession {
    CheckoutSession {
        id: id.to_string(),
        status: Some("complete".into()),
        payment_status: Some("paid".into()),
        mode: Some("payment".into()),
        metadata: metadata
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
        ..Default::default()
    }
}

fn not_found(what: &str) -> ProviderError {
    ProviderError::Rejected {
        provider: "stripe",
        status: 404,
        message: format!("No such {what}"),
    }
}

/// Stripe stand-in: every created session is immediately complete
#[derive(Default)]
pub struct FakePayments {
    pub sessions: DashMap<String, CheckoutSession>,
    pub subscriptions: DashMap<String, SubscriptionInfo>,
    pub requests: Mutex<Vec<CheckoutRequest>>,
    pub refunds: Mutex<Vec<String>>,
    /// Every session id passed to `retrieve_session`
    pub lookups: Mutex<Vec<String>>,
    pub reject_checkout: AtomicBool,
    counter: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for FakePayments {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CreatedSession, ProviderError> {
        if self.reject_checkout.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected {
                provider: "stripe",
                status: 400,
                message: "Invalid currency".into(),
            });
        }
        self.requests.lock().unwrap().push(request.clone());

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("cs_test_{n}");
        let subscription = (request.mode == CheckoutMode::Subscription).then(|| format!("sub_{n}"));
        if let Some(sub_id) = &subscription {
            self.subscriptions.insert(
                sub_id.clone(),
                SubscriptionInfo {
                    id: sub_id.clone(),
                    customer: Some(format!("cus_{n}")),
                    current_period_end: Some(PERIOD_END),
                },
            );
        }

        let session = CheckoutSession {
            id: id.clone(),
            status: Some("complete".into()),
            payment_status: Some(
                if request.mode == CheckoutMode::Setup {
                    "no_payment_required"
                } else {
                    "paid"
                }
                .into(),
            ),
            mode: Some(request.mode.as_str().into()),
            amount_total: Some(if request.mode == CheckoutMode::Setup {
                0
            } else {
                request.unit_amount
            }),
            currency: Some(request.currency.clone()),
            customer: Some(format!("cus_{n}")),
            subscription,
            payment_intent: (request.mode == CheckoutMode::Payment).then(|| format!("pi_{n}")),
            customer_email: request.customer_email.clone(),
            metadata: request.metadata.iter().cloned().collect(),
        };
        self.sessions.insert(id.clone(), session);

        Ok(CreatedSession {
            url: format!("https://checkout.stripe.test/{id}"),
            id,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, ProviderError> {
        self.lookups.lock().unwrap().push(session_id.to_string());
        self.sessions
            .get(session_id)
            .map(|s| s.clone())
            .ok_or_else(|| not_found("checkout.session"))
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionInfo, ProviderError> {
        self.subscriptions
            .get(subscription_id)
            .map(|s| s.clone())
            .ok_or_else(|| not_found("subscription"))
    }

    async fn refund_session(&self, session_id: &str) -> Result<Refund, ProviderError> {
        let session = self.retrieve_session(session_id).await?;
        let payment_intent = session.payment_intent.ok_or(ProviderError::Malformed {
            provider: "stripe",
            field: "payment_intent",
        })?;
        self.refunds.lock().unwrap().push(payment_intent.clone());
        Ok(Refund {
            id: format!("re_{session_id}"),
            status: Some("succeeded".into()),
            amount: session.amount_total,
            payment_intent,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentText {
    pub from_phone_number_id: Option<String>,
    pub to: String,
    pub body: String,
}

#[derive(Default)]
pub struct FakeMessenger {
    pub sent: Mutex<Vec<SentText>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send_text(
        &self,
        from_phone_number_id: Option<&str>,
        to: &str,
        body: &str,
    ) -> Result<String, ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected {
                provider: "whatsapp",
                status: 400,
                message: "Recipient not on WhatsApp".into(),
            });
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(SentText {
            from_phone_number_id: from_phone_number_id.map(String::from),
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(format!("wamid.{}", sent.len()))
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::Sdk("MessageRejected".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// [`AppState`] wired to in-memory fakes, with handles to inspect them
pub struct TestHarness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub payments: Arc<FakePayments>,
    pub messenger: Arc<FakeMessenger>,
    pub mailer: Arc<FakeMailer>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let payments = Arc::new(FakePayments::default());
        let messenger = Arc::new(FakeMessenger::default());
        let mailer = Arc::new(FakeMailer::default());
        let state = AppState {
            store: store.clone(),
            payments: payments.clone(),
            messenger: messenger.clone(),
            mailer: mailer.clone(),
            public_base_url: BASE_URL.into(),
            currency: "gbp".into(),
            stripe_webhook_secret: Some(STRIPE_WEBHOOK_SECRET.into()),
            whatsapp_verify_token: Some(WHATSAPP_VERIFY_TOKEN.into()),
            whatsapp_app_secret: Some(WHATSAPP_APP_SECRET.into()),
            jwt_secret: JWT_SECRET.into(),
        };
        Self {
            state,
            store,
            payments,
            messenger,
            mailer,
        }
    }

    pub fn staff_token(&self) -> String {
        crate::auth::staff_auth::create_token("coach-1", "coach", JWT_SECRET).unwrap()
    }
}

/// Drive a router with one request; the body comes back as JSON, or as a
/// JSON string when it is not JSON.
pub async fn call(
    app: axum::Router,
    request: http::Request<axum::body::Body>,
) -> (http::StatusCode, serde_json::Value) {
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> http::Request<axum::body::Body> {
    let mut builder = http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}
