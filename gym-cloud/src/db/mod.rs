//! Database access layer
//!
//! Each table has a module of free functions over `&PgPool`. Services talk to
//! the [`Store`] trait so the reconciliation flow can run against the
//! in-memory store in tests; [`PgStore`] is the production implementation and
//! only delegates.

pub mod appointments;
pub mod audit;
pub mod bookings;
pub mod coaches;
pub mod drafts;
pub mod failed_steps;
pub mod guest_bookings;
pub mod transactions;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use shared::models::{
    Booking, BookingDraft, Coach, CoachAppointment, ConfirmationStatus, GuestBooking, Transaction,
};
use sqlx::PgPool;

pub use appointments::AppointmentInsert;
pub use failed_steps::FailedStep;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Persistence operations used by the services
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert unless a booking with the same id exists. Returns `true` when inserted.
    async fn insert_booking_if_absent(&self, booking: &Booking) -> Result<bool, BoxError>;
    async fn find_booking(&self, id: &str) -> Result<Option<Booking>, BoxError>;
    async fn set_booking_status(
        &self,
        id: &str,
        status: ConfirmationStatus,
    ) -> Result<(), BoxError>;

    async fn insert_appointment_if_absent(
        &self,
        appointment: &CoachAppointment,
    ) -> Result<AppointmentInsert, BoxError>;

    /// Insert unless a guest booking with the same id exists. Returns `true` when inserted.
    async fn insert_guest_booking_if_absent(&self, guest: &GuestBooking)
    -> Result<bool, BoxError>;

    /// Atomic insert-or-update keyed by `stripe_session_id`; returns the stored row.
    async fn upsert_transaction(&self, tx: &Transaction) -> Result<Transaction, BoxError>;
    async fn find_transaction_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Transaction>, BoxError>;

    async fn coaches_with_phone(&self) -> Result<Vec<Coach>, BoxError>;

    async fn insert_draft(&self, draft: &BookingDraft) -> Result<(), BoxError>;
    async fn find_draft(&self, token: &str) -> Result<Option<BookingDraft>, BoxError>;
    async fn prune_expired_drafts(&self, now: i64) -> Result<u64, BoxError>;

    /// Record (or refresh) an unresolved failed step for a session
    async fn record_failed_step(
        &self,
        session_id: &str,
        step: &str,
        error: &str,
        now: i64,
    ) -> Result<(), BoxError>;
    async fn due_failed_steps(&self, now: i64, limit: i64) -> Result<Vec<FailedStep>, BoxError>;
    async fn resolve_failed_steps(&self, session_id: &str, now: i64) -> Result<u64, BoxError>;
    async fn defer_failed_step(
        &self,
        id: i64,
        error: &str,
        next_attempt_at: i64,
    ) -> Result<(), BoxError>;

    async fn audit(
        &self,
        actor: &str,
        action: &str,
        detail: Option<&serde_json::Value>,
        now: i64,
    ) -> Result<(), BoxError>;
}

/// PostgreSQL-backed [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_booking_if_absent(&self, booking: &Booking) -> Result<bool, BoxError> {
        Ok(bookings::insert_if_absent(&self.pool, booking).await?)
    }

    async fn find_booking(&self, id: &str) -> Result<Option<Booking>, BoxError> {
        Ok(bookings::find_by_id(&self.pool, id).await?)
    }

    async fn set_booking_status(
        &self,
        id: &str,
        status: ConfirmationStatus,
    ) -> Result<(), BoxError> {
        Ok(bookings::update_status(&self.pool, id, status).await?)
    }

    async fn insert_appointment_if_absent(
        &self,
        appointment: &CoachAppointment,
    ) -> Result<AppointmentInsert, BoxError> {
        Ok(appointments::insert_if_absent(&self.pool, appointment).await?)
    }

    async fn insert_guest_booking_if_absent(
        &self,
        guest: &GuestBooking,
    ) -> Result<bool, BoxError> {
        Ok(guest_bookings::insert_if_absent(&self.pool, guest).await?)
    }

    async fn upsert_transaction(&self, tx: &Transaction) -> Result<Transaction, BoxError> {
        Ok(transactions::upsert(&self.pool, tx).await?)
    }

    async fn find_transaction_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Transaction>, BoxError> {
        Ok(transactions::find_by_session(&self.pool, session_id).await?)
    }

    async fn coaches_with_phone(&self) -> Result<Vec<Coach>, BoxError> {
        Ok(coaches::list_with_phone(&self.pool).await?)
    }

    async fn insert_draft(&self, draft: &BookingDraft) -> Result<(), BoxError> {
        Ok(drafts::insert(&self.pool, draft).await?)
    }

    async fn find_draft(&self, token: &str) -> Result<Option<BookingDraft>, BoxError> {
        Ok(drafts::find(&self.pool, token).await?)
    }

    async fn prune_expired_drafts(&self, now: i64) -> Result<u64, BoxError> {
        Ok(drafts::delete_expired(&self.pool, now).await?)
    }

    async fn record_failed_step(
        &self,
        session_id: &str,
        step: &str,
        error: &str,
        now: i64,
    ) -> Result<(), BoxError> {
        Ok(failed_steps::record(&self.pool, session_id, step, error, now).await?)
    }

    async fn due_failed_steps(&self, now: i64, limit: i64) -> Result<Vec<FailedStep>, BoxError> {
        Ok(failed_steps::due(&self.pool, now, limit).await?)
    }

    async fn resolve_failed_steps(&self, session_id: &str, now: i64) -> Result<u64, BoxError> {
        Ok(failed_steps::resolve_session(&self.pool, session_id, now).await?)
    }

    async fn defer_failed_step(
        &self,
        id: i64,
        error: &str,
        next_attempt_at: i64,
    ) -> Result<(), BoxError> {
        Ok(failed_steps::defer(&self.pool, id, error, next_attempt_at).await?)
    }

    async fn audit(
        &self,
        actor: &str,
        action: &str,
        detail: Option<&serde_json::Value>,
        now: i64,
    ) -> Result<(), BoxError> {
        audit::log(&self.pool, actor, action, detail, now).await
    }
}
