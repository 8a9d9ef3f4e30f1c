//! Checkout endpoints
//!
//! POST /api/checkout/session: open a Stripe checkout for a booking intent
//! POST /api/checkout/finalize: reconcile synchronously when the customer returns

use std::collections::HashMap;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::services::checkout::{CheckoutCreated, CheckoutIntent, create_checkout};
use crate::services::reconcile::reconcile;
use crate::state::AppState;

use super::{ApiResult, session_id_param};

pub async fn create_session(
    State(state): State<AppState>,
    Json(intent): Json<CheckoutIntent>,
) -> ApiResult<CheckoutCreated> {
    Ok(Json(create_checkout(&state, &intent).await?))
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub session_id: String,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub metadata: HashMap<String, String>,
    /// Whether reconciliation ran (only for completed sessions)
    pub reconciled: bool,
    pub transaction_id: Option<String>,
}

pub async fn finalize(
    State(state): State<AppState>,
    Json(req): Json<FinalizeRequest>,
) -> ApiResult<FinalizeResponse> {
    let session_id = session_id_param(req.session_id.as_deref())?;

    let session = state
        .payments
        .retrieve_session(session_id)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                AppError::new(ErrorCode::CheckoutSessionNotFound)
                    .with_detail("session_id", session_id)
            } else {
                e.into_app_error(ErrorCode::UpstreamError)
            }
        })?;

    let (reconciled, transaction_id) = if session.is_complete() {
        let outcome = reconcile(&state, &session).await;
        (true, outcome.transaction_id)
    } else {
        tracing::info!(
            session_id = %session.id,
            status = ?session.status,
            "Checkout not complete; nothing to reconcile"
        );
        (false, None)
    };

    Ok(Json(FinalizeResponse {
        session_id: session.id,
        status: session.status,
        payment_status: session.payment_status,
        amount_total: session.amount_total,
        currency: session.currency,
        metadata: session.metadata,
        reconciled,
        transaction_id,
    }))
}
