use shared::models::{Booking, ConfirmationStatus};
use sqlx::PgPool;

/// Insert a booking unless one with the same id already exists.
///
/// Returns `true` when a row was written.
pub async fn insert_if_absent(pool: &PgPool, booking: &Booking) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO bookings (id, member_id, participant_id, class_id, paid, attended,
            confirmation_status, stripe_session_id, session_start, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(&booking.id)
    .bind(&booking.member_id)
    .bind(&booking.participant_id)
    .bind(&booking.class_id)
    .bind(booking.paid)
    .bind(booking.attended)
    .bind(booking.confirmation_status.as_db())
    .bind(&booking.stripe_session_id)
    .bind(&booking.session_start)
    .bind(booking.created_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Booking>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Set the confirmation status. Callers check the transition first; the
/// `<> 'CANCELED'` guard keeps a concurrent cancel from being undone.
pub async fn update_status(
    pool: &PgPool,
    id: &str,
    status: ConfirmationStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE bookings SET confirmation_status = $1
         WHERE id = $2 AND confirmation_status <> 'CANCELED'",
    )
    .bind(status.as_db())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
