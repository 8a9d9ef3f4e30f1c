//! Booking drafts
//!
//! POST /api/booking-drafts: save a booking intent before checkout
//! GET  /api/booking-drafts/{token}: read it back on return

use axum::{
    Json,
    extract::{Path, State},
};
use rand::Rng;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::BookingDraft;

use crate::error::ServiceError;
use crate::state::AppState;

use super::ApiResult;

/// Drafts outlive a checkout session by a comfortable margin
pub const DRAFT_TTL_MS: i64 = 30 * 60 * 1000;

#[derive(Debug, Deserialize)]
pub struct CreateDraftRequest {
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn new_token() -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

pub async fn create_draft(
    State(state): State<AppState>,
    Json(req): Json<CreateDraftRequest>,
) -> ApiResult<BookingDraft> {
    if !req.payload.is_object() {
        return Err(AppError::validation("payload must be a JSON object"));
    }

    let now = shared::util::now_millis();
    let draft = BookingDraft {
        token: new_token(),
        payload: req.payload,
        expires_at: now + DRAFT_TTL_MS,
        created_at: now,
    };
    state
        .store
        .insert_draft(&draft)
        .await
        .map_err(ServiceError::from)?;

    tracing::debug!(token = %draft.token, "Booking draft saved");
    Ok(Json(draft))
}

pub async fn get_draft(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<BookingDraft> {
    let draft = state
        .store
        .find_draft(&token)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::new(ErrorCode::DraftNotFound))?;

    if draft.is_expired(shared::util::now_millis()) {
        return Err(AppError::new(ErrorCode::DraftExpired));
    }
    Ok(Json(draft))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use serde_json::json;
    use shared::models::BookingDraft;

    use crate::api::create_router;
    use crate::testing::{TestHarness, call, json_request};

    fn get(uri: &str) -> http::Request<Body> {
        http::Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn create_then_read_back() {
        let h = TestHarness::new();
        let app = create_router(h.state.clone());
        let (status, body) = call(
            app.clone(),
            json_request(
                "POST",
                "/api/booking-drafts",
                None,
                json!({ "payload": { "class_id": "c1", "member_id": "m1" } }),
            ),
        )
        .await;
        assert_eq!(status, http::StatusCode::OK, "{body}");
        let token = body["token"].as_str().unwrap().to_string();
        assert_eq!(token.len(), 32);
        assert_eq!(
            body["expires_at"].as_i64().unwrap() - body["created_at"].as_i64().unwrap(),
            super::DRAFT_TTL_MS
        );

        let (status, body) = call(app, get(&format!("/api/booking-drafts/{token}"))).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body["payload"]["class_id"], "c1");
    }

    #[tokio::test]
    async fn missing_and_expired_drafts() {
        let h = TestHarness::new();
        h.store.drafts.insert(
            "old".into(),
            BookingDraft {
                token: "old".into(),
                payload: json!({}),
                expires_at: 1,
                created_at: 0,
            },
        );
        let app = create_router(h.state.clone());

        let (status, body) = call(app.clone(), get("/api/booking-drafts/nope")).await;
        assert_eq!(status, http::StatusCode::NOT_FOUND);
        assert_eq!(body["code"], 4004);

        let (status, body) = call(app, get("/api/booking-drafts/old")).await;
        assert_eq!(status, http::StatusCode::GONE);
        assert_eq!(body["code"], 4005);
    }

    #[tokio::test]
    async fn payload_must_be_object() {
        let h = TestHarness::new();
        let (status, body) = call(
            create_router(h.state.clone()),
            json_request("POST", "/api/booking-drafts", None, json!({ "payload": "x" })),
        )
        .await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 2);
        assert!(h.store.drafts.is_empty());
    }
}
