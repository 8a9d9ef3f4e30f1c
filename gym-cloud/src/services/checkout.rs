//! Checkout-session initiation
//!
//! Validates a booking intent, chooses the Stripe billing mode and stamps the
//! checkout with every identifier reconciliation needs later.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{FlowType, PaymentMethod};

use crate::state::AppState;
use crate::stripe::{CheckoutMode, CheckoutRequest};

/// Metadata keys shared with reconciliation
pub mod meta {
    pub const FLOW: &str = "flow";
    pub const CLASS_ID: &str = "class_id";
    pub const SLOT_ID: &str = "slot_id";
    pub const COACH_ID: &str = "coach_id";
    pub const MEMBER_ID: &str = "member_id";
    pub const PARTICIPANT_ID: &str = "participant_id";
    pub const BOOKING_ID: &str = "booking_id";
    pub const SESSION_TYPE: &str = "session_type";
    pub const SESSION_START: &str = "session_start";
    pub const PRICE: &str = "price";
    pub const PAYMENT_METHOD: &str = "payment_method";
    pub const GUEST_BOOKING: &str = "guest_booking";
    pub const GUEST_NAME: &str = "guest_name";
    pub const GUEST_EMAIL: &str = "guest_email";
    pub const GUEST_PHONE: &str = "guest_phone";
    pub const DRAFT_TOKEN: &str = "draft_token";
}

/// Request body of `POST /api/checkout/session`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutIntent {
    /// `class` / `coach_slot` / `guest`; derived from the other fields when absent
    pub flow: Option<String>,
    pub class_id: Option<String>,
    pub slot_id: Option<String>,
    pub coach_id: Option<String>,
    pub member_id: Option<String>,
    pub participant_id: Option<String>,
    pub booking_id: Option<String>,
    /// `private` or `group` for coach slots
    pub session_type: Option<String>,
    pub session_start: Option<String>,
    pub price: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub description: Option<String>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub draft_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutCreated {
    pub session_id: String,
    pub url: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CheckoutIntent {
    fn has_guest_identity(&self) -> bool {
        present(&self.guest_email).is_some() || present(&self.guest_name).is_some()
    }

    fn payment_method(&self) -> PaymentMethod {
        self.payment_method.unwrap_or(PaymentMethod::OneOff)
    }

    /// Which rows the completed checkout will create
    pub fn flow(&self) -> Result<FlowType, AppError> {
        if let Some(tag) = present(&self.flow) {
            return FlowType::from_tag(tag)
                .ok_or_else(|| AppError::validation(format!("unknown flow: {tag}")));
        }
        Ok(if present(&self.slot_id).is_some() {
            FlowType::CoachSlot
        } else if present(&self.member_id).is_none() && self.has_guest_identity() {
            FlowType::Guest
        } else {
            FlowType::Class
        })
    }

    /// Checks that need no I/O; run before anything else
    pub fn validate(&self) -> Result<FlowType, AppError> {
        let price = self.price.ok_or_else(|| AppError::required("price"))?;
        if price <= Decimal::ZERO {
            return Err(AppError::validation("price must be greater than zero")
                .with_detail("field", "price"));
        }
        if present(&self.member_id).is_none() && !self.has_guest_identity() {
            return Err(AppError::validation(
                "member_id or guest contact details are required",
            ));
        }

        let flow = self.flow()?;
        match flow {
            FlowType::Class if present(&self.class_id).is_none() => {
                Err(AppError::required("class_id"))
            }
            FlowType::CoachSlot if present(&self.slot_id).is_none() => {
                Err(AppError::required("slot_id"))
            }
            FlowType::Guest
                if present(&self.class_id).is_none() && present(&self.slot_id).is_none() =>
            {
                Err(AppError::validation("guest checkout needs class_id or slot_id"))
            }
            _ => Ok(flow),
        }
    }

    fn product_name(&self, flow: FlowType) -> String {
        if let Some(d) = present(&self.description) {
            return d.to_string();
        }
        let group = present(&self.session_type).is_some_and(|t| t.eq_ignore_ascii_case("group"));
        match flow {
            FlowType::Class => "Class booking".into(),
            FlowType::CoachSlot if group => "Group session".into(),
            FlowType::CoachSlot => "Private session".into(),
            FlowType::Guest => "Guest booking".into(),
        }
    }

    fn metadata(&self, flow: FlowType, price: Decimal) -> Vec<(String, String)> {
        let mut out = vec![
            (meta::FLOW.to_string(), flow.as_tag().to_string()),
            (meta::PRICE.to_string(), price.to_string()),
            (
                meta::PAYMENT_METHOD.to_string(),
                self.payment_method().as_db().to_string(),
            ),
        ];
        let optional = [
            (meta::CLASS_ID, &self.class_id),
            (meta::SLOT_ID, &self.slot_id),
            (meta::COACH_ID, &self.coach_id),
            (meta::MEMBER_ID, &self.member_id),
            (meta::PARTICIPANT_ID, &self.participant_id),
            (meta::BOOKING_ID, &self.booking_id),
            (meta::SESSION_TYPE, &self.session_type),
            (meta::SESSION_START, &self.session_start),
            (meta::GUEST_NAME, &self.guest_name),
            (meta::GUEST_EMAIL, &self.guest_email),
            (meta::GUEST_PHONE, &self.guest_phone),
            (meta::DRAFT_TOKEN, &self.draft_token),
        ];
        for (key, value) in optional {
            if let Some(v) = present(value) {
                out.push((key.to_string(), v.to_string()));
            }
        }
        if flow == FlowType::Guest {
            out.push((meta::GUEST_BOOKING.to_string(), "true".to_string()));
        }
        out
    }

    /// Build the provider request. `validate` must have passed.
    pub fn to_request(
        &self,
        flow: FlowType,
        base_url: &str,
        currency: &str,
    ) -> Result<CheckoutRequest, AppError> {
        let price = self.price.ok_or_else(|| AppError::required("price"))?;
        let method = self.payment_method();
        let unit_amount = (price * Decimal::ONE_HUNDRED)
            .round()
            .to_i64()
            .ok_or_else(|| AppError::validation("price out of range"))?;

        let mode = match method {
            PaymentMethod::OneOff => CheckoutMode::Payment,
            PaymentMethod::PerSession => CheckoutMode::Setup,
            PaymentMethod::Weekly | PaymentMethod::Monthly => CheckoutMode::Subscription,
        };

        Ok(CheckoutRequest {
            mode,
            product_name: self.product_name(flow),
            unit_amount,
            currency: currency.to_string(),
            interval: method.recurring_interval(),
            success_url: format!(
                "{base_url}/booking/success?session_id={{CHECKOUT_SESSION_ID}}"
            ),
            cancel_url: format!("{base_url}/booking/cancel"),
            customer_email: present(&self.guest_email).map(String::from),
            metadata: self.metadata(flow, price),
        })
    }
}

/// Validate the intent and open a Stripe checkout session
pub async fn create_checkout(
    state: &AppState,
    intent: &CheckoutIntent,
) -> Result<CheckoutCreated, AppError> {
    let flow = intent.validate()?;

    if let Some(token) = present(&intent.draft_token) {
        let draft = state.store.find_draft(token).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to load booking draft");
            AppError::new(ErrorCode::DatabaseError)
        })?;
        match draft {
            Some(d) if !d.is_expired(shared::util::now_millis()) => {}
            Some(_) => {
                return Err(AppError::validation("booking draft has expired")
                    .with_detail("draft_token", token));
            }
            None => {
                return Err(AppError::validation("unknown booking draft")
                    .with_detail("draft_token", token));
            }
        }
    }

    let request = intent.to_request(flow, &state.public_base_url, &state.currency)?;
    let created = state
        .payments
        .create_checkout_session(&request)
        .await
        .map_err(|e| e.into_app_error(ErrorCode::PaymentSetupFailed))?;

    tracing::info!(
        session_id = %created.id,
        flow = flow.as_tag(),
        mode = request.mode.as_str(),
        "Checkout session created"
    );

    Ok(CheckoutCreated {
        session_id: created.id,
        url: created.url,
    })
}
