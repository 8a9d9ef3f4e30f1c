//! Guest (non-member) booking model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ConfirmationStatus, PaymentMethod};

/// Booking paid for by someone without a member account
///
/// Carries its own contact details and the same billing fields as
/// [`super::Transaction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct GuestBooking {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub class_id: Option<String>,
    pub slot_id: Option<String>,
    pub coach_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub payment_method: PaymentMethod,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub confirmation_status: ConfirmationStatus,
    pub stripe_session_id: Option<String>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub next_billing_date: Option<String>,
    pub created_at: i64,
}
