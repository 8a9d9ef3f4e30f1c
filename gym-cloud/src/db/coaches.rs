use shared::models::Coach;
use sqlx::PgPool;

/// Coaches that have a phone number on file (auto-responder candidates)
pub async fn list_with_phone(pool: &PgPool) -> Result<Vec<Coach>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, name, phone, auto_reply_enabled, auto_reply_message
         FROM coaches
         WHERE phone IS NOT NULL AND phone <> ''
         ORDER BY created_at",
    )
    .fetch_all(pool)
    .await
}
