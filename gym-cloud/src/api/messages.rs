//! Staff-initiated WhatsApp messages
//!
//! POST /api/messages/send

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::services::phone::normalize_phone;
use crate::state::AppState;

use super::ApiResult;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub to: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message_id: String,
    /// Normalized E.164 recipient
    pub to: String,
}

pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<SendMessageResponse> {
    let to = normalize_phone(&req.to).ok_or_else(|| {
        AppError::new(ErrorCode::InvalidPhoneNumber).with_detail("to", req.to.clone())
    })?;
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::required("text"));
    }

    let message_id = state
        .messenger
        .send_text(None, &to, text)
        .await
        .map_err(|e| e.into_app_error(ErrorCode::MessageSendFailed))?;

    tracing::info!(to = %to, message_id = %message_id, "WhatsApp message sent");
    Ok(Json(SendMessageResponse { message_id, to }))
}
