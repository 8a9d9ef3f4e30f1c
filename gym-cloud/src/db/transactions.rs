use shared::models::Transaction;
use sqlx::PgPool;

/// Insert or update the ledger row for a checkout session in one statement.
///
/// On conflict the incoming fields win, except:
/// - `id`, `created_at` and `confirmation_status` keep the stored values
///   (staff may already have confirmed the payment);
/// - booking links and Stripe customer / subscription / billing-date fields
///   are only replaced by non-null values, so a retry whose booking insert or
///   subscription lookup failed does not erase what an earlier run captured.
pub async fn upsert(pool: &PgPool, tx: &Transaction) -> Result<Transaction, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO transactions (id, member_id, coach_id, booking_id, slot_id,
            guest_booking_id, amount, currency, source, stripe_session_id,
            confirmation_status, payment_method, stripe_customer_id,
            stripe_subscription_id, next_billing_date, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
         ON CONFLICT (stripe_session_id) DO UPDATE SET
            member_id = EXCLUDED.member_id,
            coach_id = EXCLUDED.coach_id,
            booking_id = COALESCE(EXCLUDED.booking_id, transactions.booking_id),
            slot_id = EXCLUDED.slot_id,
            guest_booking_id = COALESCE(EXCLUDED.guest_booking_id, transactions.guest_booking_id),
            amount = EXCLUDED.amount,
            currency = EXCLUDED.currency,
            source = EXCLUDED.source,
            payment_method = EXCLUDED.payment_method,
            stripe_customer_id = COALESCE(EXCLUDED.stripe_customer_id, transactions.stripe_customer_id),
            stripe_subscription_id = COALESCE(EXCLUDED.stripe_subscription_id, transactions.stripe_subscription_id),
            next_billing_date = COALESCE(EXCLUDED.next_billing_date, transactions.next_billing_date),
            updated_at = EXCLUDED.updated_at
         RETURNING *",
    )
    .bind(&tx.id)
    .bind(&tx.member_id)
    .bind(&tx.coach_id)
    .bind(&tx.booking_id)
    .bind(&tx.slot_id)
    .bind(&tx.guest_booking_id)
    .bind(tx.amount)
    .bind(&tx.currency)
    .bind(tx.source.as_db())
    .bind(&tx.stripe_session_id)
    .bind(tx.confirmation_status.as_db())
    .bind(tx.payment_method.as_db())
    .bind(&tx.stripe_customer_id)
    .bind(&tx.stripe_subscription_id)
    .bind(&tx.next_billing_date)
    .bind(tx.created_at)
    .bind(tx.updated_at)
    .fetch_one(pool)
    .await
}

pub async fn find_by_session(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM transactions WHERE stripe_session_id = $1")
        .bind(session_id)
        .fetch_optional(pool)
        .await
}
