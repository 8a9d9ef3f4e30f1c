//! Payment ledger model and billing enums

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ConfirmationStatus, UnknownVariant};

/// How a checkout bills the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Single immediate charge for the full price
    OneOff,
    /// Zero-amount checkout that only collects a payment method
    PerSession,
    Weekly,
    Monthly,
}

impl PaymentMethod {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "ONE_OFF" => Some(Self::OneOff),
            "PER_SESSION" => Some(Self::PerSession),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::OneOff => "ONE_OFF",
            Self::PerSession => "PER_SESSION",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }

    /// Stripe `recurring[interval]` for subscription billing modes
    pub fn recurring_interval(&self) -> Option<&'static str> {
        match self {
            Self::Weekly => Some("week"),
            Self::Monthly => Some("month"),
            Self::OneOff | Self::PerSession => None,
        }
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_db(&value).ok_or(UnknownVariant {
            kind: "payment_method",
            value,
        })
    }
}

/// What the money was paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionSource {
    Class,
    PrivateSession,
    GroupSession,
}

impl TransactionSource {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "CLASS" => Some(Self::Class),
            "PRIVATE_SESSION" => Some(Self::PrivateSession),
            "GROUP_SESSION" => Some(Self::GroupSession),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Class => "CLASS",
            Self::PrivateSession => "PRIVATE_SESSION",
            Self::GroupSession => "GROUP_SESSION",
        }
    }
}

impl TryFrom<String> for TransactionSource {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_db(&value).ok_or(UnknownVariant {
            kind: "transaction_source",
            value,
        })
    }
}

/// Which domain rows a completed checkout creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    Class,
    /// Private or group session in a coach's slot
    CoachSlot,
    /// Purchase by a non-member
    Guest,
}

impl FlowType {
    /// Parse the checkout metadata `flow` tag, accepting the older slot aliases
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "class" => Some(Self::Class),
            "coach_slot" | "slot" | "private_session" | "group_session" => Some(Self::CoachSlot),
            "guest" => Some(Self::Guest),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::CoachSlot => "coach_slot",
            Self::Guest => "guest",
        }
    }
}

/// Ledger entry of a completed payment, one per Stripe checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Transaction {
    pub id: String,
    pub member_id: Option<String>,
    pub coach_id: Option<String>,
    pub booking_id: Option<String>,
    pub slot_id: Option<String>,
    pub guest_booking_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub source: TransactionSource,
    /// Idempotency key: unique across the table
    pub stripe_session_id: String,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub confirmation_status: ConfirmationStatus,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub payment_method: PaymentMethod,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    /// `YYYY-MM-DD`
    pub next_billing_date: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
