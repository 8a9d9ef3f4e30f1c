//! Member emails sent on staff request
//!
//! POST /api/statements: billing statement
//! POST /api/reminders: payment reminder

use axum::{Json, extract::State};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};

use crate::email::{EmailMessage, ReminderEmail, StatementEmail};
use crate::state::AppState;

use super::ApiResult;

#[derive(Debug, Serialize)]
pub struct EmailSent {
    pub sent: bool,
}

pub async fn send_statement(
    State(state): State<AppState>,
    Json(statement): Json<StatementEmail>,
) -> ApiResult<EmailSent> {
    deliver(&state, statement.to_message(), "statement").await
}

pub async fn send_reminder(
    State(state): State<AppState>,
    Json(reminder): Json<ReminderEmail>,
) -> ApiResult<EmailSent> {
    deliver(&state, reminder.to_message(), "reminder").await
}

async fn deliver(state: &AppState, message: EmailMessage, kind: &str) -> ApiResult<EmailSent> {
    if message.to.trim().is_empty() {
        return Err(AppError::required("to"));
    }
    state
        .mailer
        .send(&message)
        .await
        .map_err(|e| e.into_app_error(ErrorCode::EmailSendFailed))?;

    tracing::info!(to = %message.to, kind, "Email sent");
    Ok(Json(EmailSent { sent: true }))
}
