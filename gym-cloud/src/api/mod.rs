//! API routes for gym-cloud

pub mod bookings;
pub mod checkout;
pub mod drafts;
pub mod health;
pub mod messages;
pub mod notifications;
pub mod refunds;
pub mod stripe_webhook;
pub mod whatsapp;

use axum::routing::{get, patch, post};
use axum::{Router, middleware};
use shared::error::AppError;
use tower_http::trace::TraceLayer;

use crate::auth::staff_auth::staff_auth_middleware;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Trimmed, required checkout session id that is safe to put in a Stripe path
pub(crate) fn session_id_param(raw: Option<&str>) -> Result<&str, AppError> {
    let session_id = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::required("session_id"))?;
    if !crate::stripe::is_session_id(session_id) {
        return Err(AppError::validation("session_id is not a checkout session id")
            .with_detail("field", "session_id"));
    }
    Ok(session_id)
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Staff-only (JWT authenticated)
    let staff = Router::new()
        .route("/api/messages/send", post(messages::send_message))
        .route("/api/refunds", post(refunds::create_refund))
        .route("/api/statements", post(notifications::send_statement))
        .route("/api/reminders", post(notifications::send_reminder))
        .route("/api/bookings/{id}/status", patch(bookings::update_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            staff_auth_middleware,
        ));

    // Public booking flow (no auth)
    let public = Router::new()
        .route("/api/checkout/session", post(checkout::create_session))
        .route("/api/checkout/finalize", post(checkout::finalize))
        .route("/api/booking-drafts", post(drafts::create_draft))
        .route("/api/booking-drafts/{token}", get(drafts::get_draft));

    // Provider webhooks (signature-verified, raw body)
    let webhooks = Router::new()
        .route("/stripe/webhook", post(stripe_webhook::handle_webhook))
        .route(
            "/whatsapp/webhook",
            get(whatsapp::verify_subscription).post(whatsapp::handle_webhook),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .merge(public)
        .merge(webhooks)
        .merge(staff)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
