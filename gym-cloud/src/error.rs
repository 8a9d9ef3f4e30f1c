//! gym-cloud error types
//!
//! `ServiceError` lets handlers use `?` on store calls: store failures are
//! logged and collapse to `DatabaseError`, business errors pass through.
//! `ProviderError` is what the Stripe, WhatsApp and SES clients return.

use shared::error::{AppError, ErrorCode};

use crate::db::BoxError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Store or infrastructure failure; never shown to the client
    #[error("store error: {0}")]
    Store(BoxError),
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Store(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Store(err) => {
                tracing::error!(error = %err, "Store operation failed");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure talking to an external provider (Stripe, WhatsApp, SES)
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Required credential is not configured
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    /// Transport-level failure (DNS, TLS, timeout, bad JSON)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Provider answered with an error body
    #[error("{provider} rejected request ({status}): {message}")]
    Rejected {
        provider: &'static str,
        status: u16,
        message: String,
    },
    /// Provider answered 2xx but the body lacked an expected field
    #[error("unexpected {provider} response: missing {field}")]
    Malformed {
        provider: &'static str,
        field: &'static str,
    },
    /// SDK-level failure (SES)
    #[error("{0}")]
    Sdk(String),
    /// Object id rejected before it reached the provider
    #[error("invalid {provider} {kind} id")]
    InvalidId {
        provider: &'static str,
        kind: &'static str,
    },
}

impl ProviderError {
    /// Whether the provider reported the object as not existing
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Rejected { status: 404, .. })
    }

    /// Map to an API error with the given code for provider rejections
    pub fn into_app_error(self, code: ErrorCode) -> AppError {
        match self {
            ProviderError::NotConfigured(name) => {
                AppError::config(format!("{name} is not configured"))
            }
            other => {
                tracing::error!(error = %other, "Provider call failed");
                AppError::with_message(code, other.to_string())
            }
        }
    }
}
