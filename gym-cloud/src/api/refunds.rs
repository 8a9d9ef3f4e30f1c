//! POST /api/refunds: refund a checkout session's payment

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::auth::StaffIdentity;
use crate::state::AppState;

use super::{ApiResult, session_id_param};

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub refund_id: String,
    pub status: Option<String>,
    pub amount: Option<i64>,
    pub payment_intent: String,
}

pub async fn create_refund(
    State(state): State<AppState>,
    Extension(staff): Extension<StaffIdentity>,
    Json(req): Json<RefundRequest>,
) -> ApiResult<RefundResponse> {
    let session_id = session_id_param(req.session_id.as_deref())?;

    let refund = state
        .payments
        .refund_session(session_id)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                AppError::new(ErrorCode::CheckoutSessionNotFound)
                    .with_detail("session_id", session_id)
            } else {
                e.into_app_error(ErrorCode::RefundFailed)
            }
        })?;

    tracing::info!(
        staff_id = %staff.staff_id,
        session_id = %session_id,
        refund_id = %refund.id,
        "Refund issued"
    );

    let detail = serde_json::json!({
        "session_id": session_id,
        "refund_id": refund.id,
        "amount": refund.amount,
        "role": staff.role,
    });
    if let Err(e) = state
        .store
        .audit(
            &staff.staff_id,
            "refund.issued",
            Some(&detail),
            shared::util::now_millis(),
        )
        .await
    {
        tracing::warn!(error = %e, "Failed to write refund audit entry");
    }

    Ok(Json(RefundResponse {
        refund_id: refund.id,
        status: refund.status,
        amount: refund.amount,
        payment_intent: refund.payment_intent,
    }))
}
