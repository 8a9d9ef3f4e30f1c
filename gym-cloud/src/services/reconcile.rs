//! Checkout-completion reconciliation
//!
//! Turns a completed Stripe checkout session into domain rows: a class
//! booking, a coach-slot appointment or a guest booking, plus exactly one
//! ledger transaction per session. Runs from the webhook, the client finalize
//! call and the failed-step sweeper, in any order and any number of times.
//!
//! A failed write is logged and recorded in the `failed_steps` outbox; the
//! remaining steps still run and the caller still gets an outcome.

use std::str::FromStr;

use rust_decimal::Decimal;
use shared::models::{
    Booking, CoachAppointment, ConfirmationStatus, FlowType, GuestBooking, PaymentMethod,
    Transaction, TransactionSource,
};
use shared::util::{date_from_unix_secs, now_millis};
use uuid::Uuid;

use super::checkout::meta;
use crate::db::AppointmentInsert;
use crate::state::AppState;
use crate::stripe::CheckoutSession;

/// Outbox step names
pub mod step {
    pub const BOOKING: &str = "booking";
    pub const APPOINTMENT: &str = "appointment";
    pub const GUEST_BOOKING: &str = "guest_booking";
    pub const TRANSACTION: &str = "transaction";
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    pub flow: Option<FlowType>,
    pub booking_id: Option<String>,
    pub appointment_id: Option<String>,
    pub guest_booking_id: Option<String>,
    pub transaction_id: Option<String>,
    /// Steps that failed in this run and were queued for replay
    pub failed_steps: Vec<&'static str>,
}

impl ReconcileOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed_steps.is_empty()
    }
}

/// Stable id for a row created on behalf of a checkout session
pub fn derived_id(kind: &str, session_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{kind}:{session_id}").as_bytes()).to_string()
}

/// Flow from the metadata tag, else inferred from which identifiers are present
pub fn derive_flow(session: &CheckoutSession) -> FlowType {
    if let Some(flow) = session.meta(meta::FLOW).and_then(FlowType::from_tag) {
        return flow;
    }
    if session.meta(meta::SLOT_ID).is_some() {
        FlowType::CoachSlot
    } else if session.meta(meta::GUEST_BOOKING) == Some("true")
        || session.meta(meta::GUEST_EMAIL).is_some()
    {
        FlowType::Guest
    } else {
        FlowType::Class
    }
}

fn slot_source(session: &CheckoutSession) -> TransactionSource {
    let group = session
        .meta(meta::SESSION_TYPE)
        .is_some_and(|t| t.eq_ignore_ascii_case("group"))
        || session
            .meta(meta::FLOW)
            .is_some_and(|t| t.eq_ignore_ascii_case("group_session"));
    if group {
        TransactionSource::GroupSession
    } else {
        TransactionSource::PrivateSession
    }
}

fn source_for(flow: FlowType, session: &CheckoutSession) -> TransactionSource {
    match flow {
        FlowType::Class => TransactionSource::Class,
        FlowType::CoachSlot => slot_source(session),
        FlowType::Guest if session.meta(meta::SLOT_ID).is_some() => slot_source(session),
        FlowType::Guest => TransactionSource::Class,
    }
}

/// `amount_total` is in minor units; fall back to the metadata price
fn amount_for(session: &CheckoutSession) -> Decimal {
    if let Some(total) = session.amount_total {
        return Decimal::new(total, 2);
    }
    session
        .meta(meta::PRICE)
        .and_then(|p| Decimal::from_str(p).ok())
        .unwrap_or(Decimal::ZERO)
}

fn payment_method_for(session: &CheckoutSession) -> PaymentMethod {
    if let Some(method) = session.meta(meta::PAYMENT_METHOD).and_then(PaymentMethod::from_db) {
        return method;
    }
    match session.mode.as_deref() {
        Some("setup") => PaymentMethod::PerSession,
        Some("subscription") => PaymentMethod::Monthly,
        _ => PaymentMethod::OneOff,
    }
}

/// Billing fields from the subscription behind a subscription-mode checkout
#[derive(Debug, Default)]
struct BillingFields {
    customer_id: Option<String>,
    subscription_id: Option<String>,
    next_billing_date: Option<String>,
}

async fn billing_fields(state: &AppState, session: &CheckoutSession) -> BillingFields {
    let mut fields = BillingFields {
        customer_id: session.customer.clone(),
        subscription_id: None,
        next_billing_date: None,
    };

    let Some(sub_id) = session
        .subscription
        .as_deref()
        .filter(|_| session.mode.as_deref() == Some("subscription"))
    else {
        return fields;
    };
    fields.subscription_id = Some(sub_id.to_string());

    match state.payments.retrieve_subscription(sub_id).await {
        Ok(sub) => {
            if sub.customer.is_some() {
                fields.customer_id = sub.customer;
            }
            fields.next_billing_date = sub.current_period_end.and_then(date_from_unix_secs);
        }
        Err(e) => {
            tracing::error!(
                session_id = %session.id,
                subscription_id = sub_id,
                error = %e,
                "Failed to fetch subscription; next billing date left empty"
            );
        }
    }
    fields
}

struct Run<'a> {
    state: &'a AppState,
    session_id: &'a str,
    now: i64,
    outcome: ReconcileOutcome,
}

impl Run<'_> {
    /// Log a failed write and queue it for replay
    async fn failed(&mut self, step: &'static str, error: &str) {
        tracing::error!(session_id = self.session_id, step, error, "Reconciliation step failed");
        self.outcome.failed_steps.push(step);
        if let Err(e) = self
            .state
            .store
            .record_failed_step(self.session_id, step, error, self.now)
            .await
        {
            tracing::error!(
                session_id = self.session_id,
                step,
                error = %e,
                "Failed to record failed step"
            );
        }
    }
}

/// Reconcile one completed checkout session
pub async fn reconcile(state: &AppState, session: &CheckoutSession) -> ReconcileOutcome {
    let flow = derive_flow(session);
    let now = now_millis();
    let mut run = Run {
        state,
        session_id: &session.id,
        now,
        outcome: ReconcileOutcome {
            flow: Some(flow),
            ..Default::default()
        },
    };

    let amount = amount_for(session);
    let currency = session
        .currency
        .clone()
        .unwrap_or_else(|| state.currency.clone());
    let payment_method = payment_method_for(session);
    let member_id = session.meta(meta::MEMBER_ID).map(String::from);
    let coach_id = session.meta(meta::COACH_ID).map(String::from);
    let slot_id = session.meta(meta::SLOT_ID).map(String::from);
    let billing = billing_fields(state, session).await;

    let mut booking_id = None;
    let mut guest_booking_id = None;

    match flow {
        FlowType::Class => {
            booking_id = reconcile_class(&mut run, session).await;
        }
        FlowType::CoachSlot => {
            reconcile_slot(&mut run, session).await;
        }
        FlowType::Guest => {
            let guest = GuestBooking {
                id: derived_id("guest_booking", &session.id),
                name: session.meta(meta::GUEST_NAME).map(String::from),
                email: session
                    .meta(meta::GUEST_EMAIL)
                    .map(String::from)
                    .or_else(|| session.customer_email.clone()),
                phone: session.meta(meta::GUEST_PHONE).map(String::from),
                class_id: session.meta(meta::CLASS_ID).map(String::from),
                slot_id: slot_id.clone(),
                coach_id: coach_id.clone(),
                amount,
                currency: currency.clone(),
                payment_method,
                confirmation_status: ConfirmationStatus::Pending,
                stripe_session_id: Some(session.id.clone()),
                stripe_customer_id: billing.customer_id.clone(),
                stripe_subscription_id: billing.subscription_id.clone(),
                next_billing_date: billing.next_billing_date.clone(),
                created_at: now,
            };
            match state.store.insert_guest_booking_if_absent(&guest).await {
                Ok(inserted) => {
                    tracing::info!(session_id = %session.id, guest_booking_id = %guest.id, inserted, "Guest booking reconciled");
                    guest_booking_id = Some(guest.id);
                }
                Err(e) => run.failed(step::GUEST_BOOKING, &e.to_string()).await,
            }
        }
    }
    run.outcome.booking_id = booking_id.clone();
    run.outcome.guest_booking_id = guest_booking_id.clone();

    let tx = Transaction {
        id: derived_id("transaction", &session.id),
        member_id,
        coach_id,
        booking_id,
        slot_id,
        guest_booking_id,
        amount,
        currency,
        source: source_for(flow, session),
        stripe_session_id: session.id.clone(),
        confirmation_status: ConfirmationStatus::Pending,
        payment_method,
        stripe_customer_id: billing.customer_id,
        stripe_subscription_id: billing.subscription_id,
        next_billing_date: billing.next_billing_date,
        created_at: now,
        updated_at: now,
    };
    match state.store.upsert_transaction(&tx).await {
        Ok(stored) => {
            tracing::info!(
                session_id = %session.id,
                transaction_id = %stored.id,
                amount = %stored.amount,
                source = stored.source.as_db(),
                "Transaction recorded"
            );
            run.outcome.transaction_id = Some(stored.id);
        }
        Err(e) => run.failed(step::TRANSACTION, &e.to_string()).await,
    }

    let outcome = run.outcome;
    if outcome.is_clean() {
        if let Err(e) = state.store.resolve_failed_steps(&session.id, now).await {
            tracing::error!(session_id = %session.id, error = %e, "Failed to resolve outbox rows");
        }
    }

    let detail = serde_json::json!({
        "session_id": session.id,
        "flow": flow.as_tag(),
        "failed_steps": outcome.failed_steps,
    });
    let _ = state
        .store
        .audit("stripe", "checkout.reconciled", Some(&detail), now)
        .await;

    outcome
}

async fn reconcile_class(run: &mut Run<'_>, session: &CheckoutSession) -> Option<String> {
    let (Some(member_id), Some(class_id)) =
        (session.meta(meta::MEMBER_ID), session.meta(meta::CLASS_ID))
    else {
        tracing::warn!(session_id = %session.id, "Class checkout missing member_id or class_id; no booking created");
        return None;
    };

    let booking = Booking {
        id: session
            .meta(meta::BOOKING_ID)
            .map(String::from)
            .unwrap_or_else(|| derived_id("booking", &session.id)),
        member_id: member_id.to_string(),
        participant_id: session
            .meta(meta::PARTICIPANT_ID)
            .unwrap_or(member_id)
            .to_string(),
        class_id: class_id.to_string(),
        paid: true,
        attended: false,
        confirmation_status: ConfirmationStatus::Pending,
        stripe_session_id: Some(session.id.clone()),
        session_start: session.meta(meta::SESSION_START).map(String::from),
        created_at: run.now,
    };

    match run.state.store.insert_booking_if_absent(&booking).await {
        Ok(inserted) => {
            tracing::info!(session_id = %session.id, booking_id = %booking.id, inserted, "Class booking reconciled");
            Some(booking.id)
        }
        Err(e) => {
            run.failed(step::BOOKING, &e.to_string()).await;
            // the id is still the one the replay will write
            Some(booking.id)
        }
    }
}

async fn reconcile_slot(run: &mut Run<'_>, session: &CheckoutSession) {
    let Some(slot_id) = session.meta(meta::SLOT_ID) else {
        tracing::warn!(session_id = %session.id, "Slot checkout missing slot_id; no appointment created");
        return;
    };

    let member_id = session.meta(meta::MEMBER_ID).map(String::from);
    let appointment = CoachAppointment {
        id: derived_id("appointment", &session.id),
        slot_id: slot_id.to_string(),
        coach_id: session.meta(meta::COACH_ID).map(String::from),
        participant_id: session
            .meta(meta::PARTICIPANT_ID)
            .map(String::from)
            .or_else(|| member_id.clone()),
        member_id,
        confirmation_status: ConfirmationStatus::Confirmed,
        stripe_session_id: Some(session.id.clone()),
        created_at: run.now,
    };

    match run.state.store.insert_appointment_if_absent(&appointment).await {
        Ok(AppointmentInsert::SlotTaken) => {
            run.failed(
                step::APPOINTMENT,
                &format!("slot {slot_id} already has an active appointment"),
            )
            .await;
        }
        Ok(result) => {
            tracing::info!(
                session_id = %session.id,
                appointment_id = %appointment.id,
                inserted = result == AppointmentInsert::Inserted,
                "Coach appointment reconciled"
            );
            run.outcome.appointment_id = Some(appointment.id);
        }
        Err(e) => run.failed(step::APPOINTMENT, &e.to_string()).await,
    }
}
