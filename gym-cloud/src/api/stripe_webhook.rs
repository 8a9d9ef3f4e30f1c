//! Stripe webhook handler
//!
//! POST /stripe/webhook: handles Stripe events (raw body for signature verification)

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use crate::services::reconcile::reconcile;
use crate::state::AppState;
use crate::stripe::{self, CheckoutSession};

/// Handle incoming Stripe webhook events
///
/// Must receive raw body (not JSON) for HMAC signature verification.
/// Replays of the same event are harmless: reconciliation is idempotent per
/// checkout session.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(secret) = state.stripe_webhook_secret.as_deref() else {
        tracing::error!("STRIPE_WEBHOOK_SECRET not configured; rejecting webhook");
        return StatusCode::INTERNAL_SERVER_ERROR;
    };

    // 1. Get Stripe-Signature header
    let Some(sig_header) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Missing Stripe-Signature header");
        return StatusCode::FORBIDDEN;
    };

    // 2. Verify signature
    if let Err(e) = stripe::verify_webhook_signature(&body, sig_header, secret) {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::FORBIDDEN;
    }

    // 3. Parse JSON event
    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    tracing::info!(
        event_type = event_type,
        event_id = event["id"].as_str().unwrap_or(""),
        "Received Stripe webhook"
    );

    // 4. Handle event types
    match event_type {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            handle_checkout_completed(&state, &event).await
        }
        _ => {
            tracing::debug!(event_type = event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    }
}

/// checkout.session.completed → reconcile bookings and ledger
async fn handle_checkout_completed(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let Some(obj) = event.get("data").and_then(|d| d.get("object")) else {
        tracing::warn!("checkout event missing data.object");
        return StatusCode::OK;
    };

    let session: CheckoutSession = match serde_json::from_value(obj.clone()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(%e, "checkout event has unexpected session shape");
            return StatusCode::OK;
        }
    };

    let outcome = reconcile(state, &session).await;
    if !outcome.is_clean() {
        tracing::warn!(
            session_id = %session.id,
            failed_steps = ?outcome.failed_steps,
            "Checkout reconciled with failures queued for replay"
        );
    }
    StatusCode::OK
}
