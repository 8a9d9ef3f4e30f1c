//! Application state for gym-cloud

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_sesv2::Client as SesClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::{PgStore, Store};
use crate::email::{Mailer, SesMailer};
use crate::stripe::{PaymentGateway, StripeClient};
use crate::whatsapp::{Messenger, WhatsAppClient};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound provider calls give up after this long
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Persistence (Postgres in production)
    pub store: Arc<dyn Store>,
    /// Stripe
    pub payments: Arc<dyn PaymentGateway>,
    /// WhatsApp Cloud API
    pub messenger: Arc<dyn Messenger>,
    /// SES
    pub mailer: Arc<dyn Mailer>,
    /// Public site base URL, no trailing slash
    pub public_base_url: String,
    /// Default checkout currency
    pub currency: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: Option<String>,
    /// WhatsApp webhook handshake token
    pub whatsapp_verify_token: Option<String>,
    /// WhatsApp app secret for inbound signatures
    pub whatsapp_app_secret: Option<String>,
    /// JWT secret for staff authentication
    pub jwt_secret: String,
}

impl AppState {
    /// Create a new AppState
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ses = if let Ok(ses_region) = std::env::var("SES_REGION") {
            let ses_config = aws_config
                .to_builder()
                .region(aws_config::Region::new(ses_region))
                .build();
            SesClient::new(&ses_config)
        } else {
            SesClient::new(&aws_config)
        };

        Ok(Self {
            store: Arc::new(PgStore::new(pool)),
            payments: Arc::new(StripeClient::new(
                http.clone(),
                config.stripe_secret_key.clone(),
            )),
            messenger: Arc::new(WhatsAppClient::new(
                http,
                config.whatsapp_access_token.clone(),
                config.whatsapp_phone_number_id.clone(),
            )),
            mailer: Arc::new(SesMailer::new(ses, config.ses_from_email.clone())),
            public_base_url: config.public_base_url.clone(),
            currency: config.currency.clone(),
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
            whatsapp_verify_token: config.whatsapp_verify_token.clone(),
            whatsapp_app_secret: config.whatsapp_app_secret.clone(),
            jwt_secret: config.jwt_secret.clone(),
        })
    }
}
