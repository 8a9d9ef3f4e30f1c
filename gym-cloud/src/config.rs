//! Service configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_SWEEPER_INTERVAL_SECS: u64 = 60;

/// Parse a period in seconds; unset, unparsable and zero fall back to `default`
fn positive_secs(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default)
}

/// gym-cloud configuration, loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Public site base URL (checkout redirects, scheduling links)
    pub public_base_url: String,
    /// ISO currency for checkouts, lower-case as Stripe expects
    pub currency: String,
    /// Stripe secret key
    pub stripe_secret_key: Option<String>,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: Option<String>,
    /// WhatsApp Cloud API access token
    pub whatsapp_access_token: Option<String>,
    /// WhatsApp business phone number id (sender)
    pub whatsapp_phone_number_id: Option<String>,
    /// Token echoed back during the webhook subscription handshake
    pub whatsapp_verify_token: Option<String>,
    /// App secret used to sign inbound webhook bodies
    pub whatsapp_app_secret: Option<String>,
    /// SES sender email address
    pub ses_from_email: String,
    /// JWT secret for staff authentication
    pub jwt_secret: String,
    /// Failed-step sweeper period
    pub sweeper_interval_secs: u64,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Optional credential: unset and empty both mean "not configured"
    fn optional(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|s| !s.is_empty())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: environment.clone(),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            currency: std::env::var("CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| "gbp".into()),
            stripe_secret_key: Self::optional("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: Self::optional("STRIPE_WEBHOOK_SECRET"),
            whatsapp_access_token: Self::optional("WHATSAPP_ACCESS_TOKEN"),
            whatsapp_phone_number_id: Self::optional("WHATSAPP_PHONE_NUMBER_ID"),
            whatsapp_verify_token: Self::optional("WHATSAPP_VERIFY_TOKEN"),
            whatsapp_app_secret: Self::optional("WHATSAPP_APP_SECRET"),
            ses_from_email: std::env::var("SES_FROM_EMAIL")
                .unwrap_or_else(|_| "bookings@localhost".into()),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            sweeper_interval_secs: positive_secs(
                std::env::var("SWEEPER_INTERVAL_SECS").ok().as_deref(),
                DEFAULT_SWEEPER_INTERVAL_SECS,
            ),
        };

        for (name, value) in [
            ("STRIPE_SECRET_KEY", &config.stripe_secret_key),
            ("STRIPE_WEBHOOK_SECRET", &config.stripe_webhook_secret),
            ("WHATSAPP_ACCESS_TOKEN", &config.whatsapp_access_token),
            ("WHATSAPP_APP_SECRET", &config.whatsapp_app_secret),
        ] {
            if value.is_none() {
                tracing::warn!("{name} not set; endpoints that need it will return 500");
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweeper_interval_must_be_positive() {
        assert_eq!(positive_secs(Some("0"), 60), 60);
        assert_eq!(positive_secs(Some("-5"), 60), 60);
        assert_eq!(positive_secs(Some("soon"), 60), 60);
        assert_eq!(positive_secs(None, 60), 60);
        assert_eq!(positive_secs(Some(" 15 "), 60), 15);
    }
}
