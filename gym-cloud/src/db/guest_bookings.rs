use shared::models::GuestBooking;
use sqlx::PgPool;

/// Insert a guest booking unless one with the same id already exists.
pub async fn insert_if_absent(pool: &PgPool, guest: &GuestBooking) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO guest_bookings (id, name, email, phone, class_id, slot_id, coach_id,
            amount, currency, payment_method, confirmation_status, stripe_session_id,
            stripe_customer_id, stripe_subscription_id, next_billing_date, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(&guest.id)
    .bind(&guest.name)
    .bind(&guest.email)
    .bind(&guest.phone)
    .bind(&guest.class_id)
    .bind(&guest.slot_id)
    .bind(&guest.coach_id)
    .bind(guest.amount)
    .bind(&guest.currency)
    .bind(guest.payment_method.as_db())
    .bind(guest.confirmation_status.as_db())
    .bind(&guest.stripe_session_id)
    .bind(&guest.stripe_customer_id)
    .bind(&guest.stripe_subscription_id)
    .bind(&guest.next_billing_date)
    .bind(guest.created_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}
