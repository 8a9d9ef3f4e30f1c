//! HTTP status mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::BookingNotFound
            | Self::DraftNotFound
            | Self::CheckoutSessionNotFound
            | Self::TransactionNotFound => StatusCode::NOT_FOUND,

            // 410 Gone
            Self::DraftExpired => StatusCode::GONE,

            // 409 Conflict
            Self::AlreadyExists
            | Self::InvalidStatusTransition
            | Self::SlotAlreadyBooked => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::PermissionDenied | Self::StaffRequired | Self::SignatureInvalid => {
                StatusCode::FORBIDDEN
            }

            // 502 Bad Gateway (payment / messaging / email provider rejected the call)
            Self::UpstreamError
            | Self::PaymentFailed
            | Self::PaymentSetupFailed
            | Self::RefundFailed
            | Self::MessageSendFailed
            | Self::EmailSendFailed => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::NetworkError | Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::Unknown | Self::InternalError | Self::DatabaseError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            // 400 Bad Request (default for validation errors)
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::InvalidFormat
            | Self::RequiredField
            | Self::InvalidPhoneNumber => StatusCode::BAD_REQUEST,
        }
    }
}
