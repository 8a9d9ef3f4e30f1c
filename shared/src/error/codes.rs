//! Unified error codes for the gym services
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Booking errors
//! - 5xxx: Payment errors
//! - 6xxx: Messaging errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility with the web frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Coach or admin role required
    StaffRequired = 2002,

    // ==================== 4xxx: Booking ====================
    /// Booking not found
    BookingNotFound = 4001,
    /// Confirmation status cannot move in that direction
    InvalidStatusTransition = 4002,
    /// Coach slot already has an active appointment
    SlotAlreadyBooked = 4003,
    /// Booking draft not found
    DraftNotFound = 4004,
    /// Booking draft has expired
    DraftExpired = 4005,

    // ==================== 5xxx: Payment ====================
    /// Payment processing failed
    PaymentFailed = 5001,
    /// Checkout session could not be created
    PaymentSetupFailed = 5002,
    /// Checkout session not found at the payment provider
    CheckoutSessionNotFound = 5003,
    /// Refund could not be issued
    RefundFailed = 5004,
    /// Webhook signature missing or invalid
    SignatureInvalid = 5005,
    /// No transaction recorded for the session
    TransactionNotFound = 5006,

    // ==================== 6xxx: Messaging ====================
    /// Phone number could not be normalized
    InvalidPhoneNumber = 6001,
    /// Messaging provider rejected the message
    MessageSendFailed = 6002,
    /// Email could not be sent
    EmailSendFailed = 6003,

    // ==================== 9xxx: System ====================
    InternalError = 9001,
    DatabaseError = 9002,
    NetworkError = 9003,
    TimeoutError = 9004,
    ConfigError = 9005,
    UpstreamError = 9006,
}

impl ErrorCode {
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",

            // Auth
            ErrorCode::NotAuthenticated => "Caller is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::StaffRequired => "Coach or admin role is required",

            // Booking
            ErrorCode::BookingNotFound => "Booking not found",
            ErrorCode::InvalidStatusTransition => "Confirmation status cannot change that way",
            ErrorCode::SlotAlreadyBooked => "Slot already has an active appointment",
            ErrorCode::DraftNotFound => "Booking draft not found",
            ErrorCode::DraftExpired => "Booking draft has expired",

            // Payment
            ErrorCode::PaymentFailed => "Payment processing failed",
            ErrorCode::PaymentSetupFailed => "Payment setup failed",
            ErrorCode::CheckoutSessionNotFound => "Checkout session not found",
            ErrorCode::RefundFailed => "Refund failed",
            ErrorCode::SignatureInvalid => "Signature verification failed",
            ErrorCode::TransactionNotFound => "Transaction not found",

            // Messaging
            ErrorCode::InvalidPhoneNumber => "Invalid phone number",
            ErrorCode::MessageSendFailed => "Message could not be sent",
            ErrorCode::EmailSendFailed => "Email could not be sent",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::UpstreamError => "Upstream provider error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::StaffRequired),

            // Booking
            4001 => Ok(ErrorCode::BookingNotFound),
            4002 => Ok(ErrorCode::InvalidStatusTransition),
            4003 => Ok(ErrorCode::SlotAlreadyBooked),
            4004 => Ok(ErrorCode::DraftNotFound),
            4005 => Ok(ErrorCode::DraftExpired),

            // Payment
            5001 => Ok(ErrorCode::PaymentFailed),
            5002 => Ok(ErrorCode::PaymentSetupFailed),
            5003 => Ok(ErrorCode::CheckoutSessionNotFound),
            5004 => Ok(ErrorCode::RefundFailed),
            5005 => Ok(ErrorCode::SignatureInvalid),
            5006 => Ok(ErrorCode::TransactionNotFound),

            // Messaging
            6001 => Ok(ErrorCode::InvalidPhoneNumber),
            6002 => Ok(ErrorCode::MessageSendFailed),
            6003 => Ok(ErrorCode::EmailSendFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9006 => Ok(ErrorCode::UpstreamError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::BookingNotFound.code(), 4001);
        assert_eq!(ErrorCode::SignatureInvalid.code(), 5005);
        assert_eq!(ErrorCode::InvalidPhoneNumber.code(), 6001);
        assert_eq!(ErrorCode::UpstreamError.code(), 9006);
    }

    #[test]
    fn test_try_from_roundtrip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::RequiredField,
            ErrorCode::StaffRequired,
            ErrorCode::DraftExpired,
            ErrorCode::TransactionNotFound,
            ErrorCode::EmailSendFailed,
            ErrorCode::ConfigError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::SlotAlreadyBooked).unwrap();
        assert_eq!(json, "4003");
        let code: ErrorCode = serde_json::from_str("5004").unwrap();
        assert_eq!(code, ErrorCode::RefundFailed);
    }
}
