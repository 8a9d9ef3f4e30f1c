//! PATCH /api/bookings/{id}/status: staff confirmation or cancellation

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{Booking, BookingStatusUpdate};

use crate::auth::StaffIdentity;
use crate::error::{ServiceError, ServiceResult};
use crate::state::AppState;

use super::ApiResult;

/// Load a booking or fail with BookingNotFound
async fn load_booking(state: &AppState, id: &str) -> ServiceResult<Booking> {
    state
        .store
        .find_booking(id)
        .await?
        .ok_or_else(|| {
            ServiceError::App(AppError::new(ErrorCode::BookingNotFound).with_detail("id", id))
        })
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(staff): Extension<StaffIdentity>,
    Path(id): Path<String>,
    Json(req): Json<BookingStatusUpdate>,
) -> ApiResult<Booking> {
    let booking = load_booking(&state, &id).await?;
    let from = booking.confirmation_status;
    let to = req.confirmation_status;

    if !from.can_transition_to(to) {
        return Err(AppError::new(ErrorCode::InvalidStatusTransition)
            .with_detail("from", from.as_db())
            .with_detail("to", to.as_db()));
    }

    if from != to {
        state
            .store
            .set_booking_status(&id, to)
            .await
            .map_err(ServiceError::from)?;

        let detail = serde_json::json!({
            "booking_id": id,
            "from": from.as_db(),
            "to": to.as_db(),
            "role": staff.role,
        });
        if let Err(e) = state
            .store
            .audit(
                &staff.staff_id,
                "booking.status_changed",
                Some(&detail),
                shared::util::now_millis(),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to write booking audit entry");
        }
        tracing::info!(booking_id = %id, from = from.as_db(), to = to.as_db(), "Booking status changed");
    }

    Ok(Json(load_booking(&state, &id).await?))
}
