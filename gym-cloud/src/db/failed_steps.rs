//! Outbox of reconciliation steps that failed and are waiting for replay

use sqlx::PgPool;

/// Replays stop after this many attempts; the row stays as a dead letter
pub const MAX_ATTEMPTS: i32 = 10;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FailedStep {
    pub id: i64,
    pub session_id: String,
    pub step: String,
    pub error: String,
    pub attempts: i32,
    pub next_attempt_at: i64,
    pub resolved_at: Option<i64>,
    pub created_at: i64,
}

/// Record a failure. A second failure of the same open step refreshes the
/// error text instead of adding a row.
pub async fn record(
    pool: &PgPool,
    session_id: &str,
    step: &str,
    error: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO failed_steps (session_id, step, error, attempts, next_attempt_at, created_at)
         VALUES ($1, $2, $3, 0, $4, $4)
         ON CONFLICT (session_id, step) WHERE resolved_at IS NULL
         DO UPDATE SET error = EXCLUDED.error",
    )
    .bind(session_id)
    .bind(step)
    .bind(error)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn due(pool: &PgPool, now: i64, limit: i64) -> Result<Vec<FailedStep>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM failed_steps
         WHERE resolved_at IS NULL AND next_attempt_at <= $1 AND attempts < $2
         ORDER BY next_attempt_at
         LIMIT $3",
    )
    .bind(now)
    .bind(MAX_ATTEMPTS)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Mark every open step of a session as resolved
pub async fn resolve_session(pool: &PgPool, session_id: &str, now: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE failed_steps SET resolved_at = $1 WHERE session_id = $2 AND resolved_at IS NULL",
    )
    .bind(now)
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn defer(
    pool: &PgPool,
    id: i64,
    error: &str,
    next_attempt_at: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE failed_steps SET attempts = attempts + 1, error = $1, next_attempt_at = $2
         WHERE id = $3",
    )
    .bind(error)
    .bind(next_attempt_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}
