use shared::models::BookingDraft;
use sqlx::PgPool;

pub async fn insert(pool: &PgPool, draft: &BookingDraft) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO booking_drafts (token, payload, expires_at, created_at)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(&draft.token)
    .bind(&draft.payload)
    .bind(draft.expires_at)
    .bind(draft.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find(pool: &PgPool, token: &str) -> Result<Option<BookingDraft>, sqlx::Error> {
    sqlx::query_as("SELECT token, payload, expires_at, created_at FROM booking_drafts WHERE token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await
}

/// Delete drafts that have expired at `now`, returning how many went
pub async fn delete_expired(pool: &PgPool, now: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM booking_drafts WHERE expires_at <= $1")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
