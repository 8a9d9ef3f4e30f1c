//! WhatsApp webhook
//!
//! GET  /whatsapp/webhook: subscription handshake
//! POST /whatsapp/webhook: inbound messages (raw body for signature verification)

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::services::autoresponder;
use crate::state::AppState;
use crate::whatsapp::{self, InboundText, WebhookPayload};

/// Echo `hub.challenge` when `hub.verify_token` matches
pub async fn verify_subscription(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(expected) = state.whatsapp_verify_token.as_deref() else {
        tracing::error!("WHATSAPP_VERIFY_TOKEN not configured");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    match (mode, token, params.get("hub.challenge")) {
        (Some("subscribe"), Some(t), Some(challenge)) if t == expected => {
            tracing::info!("WhatsApp webhook subscription verified");
            (StatusCode::OK, challenge.clone()).into_response()
        }
        _ => {
            tracing::warn!(mode = ?mode, "WhatsApp webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// Inbound message events; always 200 once the signature checks out
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(secret) = state.whatsapp_app_secret.as_deref() else {
        tracing::error!("WHATSAPP_APP_SECRET not configured; rejecting webhook");
        return StatusCode::INTERNAL_SERVER_ERROR;
    };

    let Some(sig_header) = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Missing X-Hub-Signature-256 header");
        return StatusCode::FORBIDDEN;
    };

    if let Err(e) = whatsapp::verify_signature(&body, sig_header, secret) {
        tracing::warn!(error = e, "WhatsApp signature verification failed");
        return StatusCode::FORBIDDEN;
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse WhatsApp webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let messages = payload.text_messages();
    if messages.is_empty() {
        return StatusCode::OK;
    }

    let coaches = match state.store.coaches_with_phone().await {
        Ok(c) => c,
        Err(e) => {
            // still reply, just without coach personalisation
            tracing::error!(error = %e, "Failed to load coaches for auto-reply");
            Vec::new()
        }
    };

    for message in &messages {
        respond(&state, message, &coaches).await;
    }
    StatusCode::OK
}

async fn respond(state: &AppState, message: &InboundText, coaches: &[shared::models::Coach]) {
    let Some(reply) = autoresponder::reply_for(
        &message.body,
        message.recipient.as_deref(),
        coaches,
        &state.public_base_url,
    ) else {
        tracing::debug!(from = %message.from, "No auto-reply for message");
        return;
    };

    match state
        .messenger
        .send_text(
            message.recipient_phone_number_id.as_deref(),
            &message.from,
            &reply,
        )
        .await
    {
        Ok(id) => tracing::info!(to = %message.from, message_id = %id, "Auto-reply sent"),
        Err(e) => tracing::error!(to = %message.from, error = %e, "Auto-reply failed"),
    }
}
