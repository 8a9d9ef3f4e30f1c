use shared::models::CoachAppointment;
use sqlx::PgPool;

const ACTIVE_SLOT_INDEX: &str = "coach_appointments_active_slot_idx";

/// Outcome of inserting a coach appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentInsert {
    Inserted,
    /// Same appointment id already stored (replayed checkout)
    AlreadyExists,
    /// Another live appointment occupies the slot
    SlotTaken,
}

pub async fn insert_if_absent(
    pool: &PgPool,
    appt: &CoachAppointment,
) -> Result<AppointmentInsert, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO coach_appointments (id, slot_id, coach_id, member_id, participant_id,
            confirmation_status, stripe_session_id, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(&appt.id)
    .bind(&appt.slot_id)
    .bind(&appt.coach_id)
    .bind(&appt.member_id)
    .bind(&appt.participant_id)
    .bind(appt.confirmation_status.as_db())
    .bind(&appt.stripe_session_id)
    .bind(appt.created_at)
    .execute(pool)
    .await;

    match result {
        Ok(r) if r.rows_affected() == 1 => Ok(AppointmentInsert::Inserted),
        Ok(_) => Ok(AppointmentInsert::AlreadyExists),
        Err(sqlx::Error::Database(db)) if db.constraint() == Some(ACTIVE_SLOT_INDEX) => {
            Ok(AppointmentInsert::SlotTaken)
        }
        Err(e) => Err(e),
    }
}
