//! In-memory [`Store`] for tests
//!
//! Mirrors the Postgres statements: insert-if-absent by id, one live
//! appointment per slot, transaction upsert keyed by session id with the same
//! merge rules, one open failed step per `(session_id, step)`.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::models::{
    Booking, BookingDraft, Coach, CoachAppointment, ConfirmationStatus, GuestBooking, Transaction,
};

use super::failed_steps::MAX_ATTEMPTS;
use super::{AppointmentInsert, BoxError, FailedStep, Store};

#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub actor: String,
    pub action: String,
    pub detail: Option<serde_json::Value>,
}

#[derive(Default)]
pub struct MemoryStore {
    pub bookings: DashMap<String, Booking>,
    pub appointments: DashMap<String, CoachAppointment>,
    pub guest_bookings: DashMap<String, GuestBooking>,
    pub transactions: DashMap<String, Transaction>,
    pub coaches: Mutex<Vec<Coach>>,
    pub drafts: DashMap<String, BookingDraft>,
    pub failed_steps: DashMap<i64, FailedStep>,
    pub audit_log: Mutex<Vec<AuditEntry>>,
    next_step_id: AtomicI64,
    /// Operations forced to fail: "booking", "appointment", "guest_booking", "transaction"
    failing: Mutex<HashSet<&'static str>>,
    appointment_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coaches(coaches: Vec<Coach>) -> Self {
        let store = Self::default();
        *store.coaches.lock().unwrap() = coaches;
        store
    }

    /// Make every call of `op` fail until [`MemoryStore::heal`]
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    fn check(&self, op: &'static str) -> Result<(), BoxError> {
        if self.failing.lock().unwrap().contains(op) {
            return Err(format!("{op} store unavailable").into());
        }
        Ok(())
    }

    pub fn open_steps(&self, session_id: &str) -> Vec<FailedStep> {
        let mut steps: Vec<FailedStep> = self
            .failed_steps
            .iter()
            .filter(|s| s.session_id == session_id && s.resolved_at.is_none())
            .map(|s| s.clone())
            .collect();
        steps.sort_by_key(|s| s.id);
        steps
    }

    pub fn audit_actions(&self) -> Vec<String> {
        self.audit_log
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.action.clone())
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_booking_if_absent(&self, booking: &Booking) -> Result<bool, BoxError> {
        self.check("booking")?;
        match self.bookings.entry(booking.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(booking.clone());
                Ok(true)
            }
        }
    }

    async fn find_booking(&self, id: &str) -> Result<Option<Booking>, BoxError> {
        self.check("booking")?;
        Ok(self.bookings.get(id).map(|b| b.clone()))
    }

    async fn set_booking_status(
        &self,
        id: &str,
        status: ConfirmationStatus,
    ) -> Result<(), BoxError> {
        self.check("booking")?;
        if let Some(mut booking) = self.bookings.get_mut(id)
            && booking.confirmation_status != ConfirmationStatus::Canceled
        {
            booking.confirmation_status = status;
        }
        Ok(())
    }

    async fn insert_appointment_if_absent(
        &self,
        appointment: &CoachAppointment,
    ) -> Result<AppointmentInsert, BoxError> {
        self.check("appointment")?;
        let _guard = self.appointment_lock.lock().unwrap();
        if self.appointments.contains_key(&appointment.id) {
            return Ok(AppointmentInsert::AlreadyExists);
        }
        let occupied = self.appointments.iter().any(|a| {
            a.slot_id == appointment.slot_id
                && a.confirmation_status != ConfirmationStatus::Canceled
        });
        if occupied && appointment.confirmation_status != ConfirmationStatus::Canceled {
            return Ok(AppointmentInsert::SlotTaken);
        }
        self.appointments
            .insert(appointment.id.clone(), appointment.clone());
        Ok(AppointmentInsert::Inserted)
    }

    async fn insert_guest_booking_if_absent(
        &self,
        guest: &GuestBooking,
    ) -> Result<bool, BoxError> {
        self.check("guest_booking")?;
        match self.guest_bookings.entry(guest.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(guest.clone());
                Ok(true)
            }
        }
    }

    async fn upsert_transaction(&self, tx: &Transaction) -> Result<Transaction, BoxError> {
        self.check("transaction")?;
        let stored = match self.transactions.entry(tx.stripe_session_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(tx.clone());
                tx.clone()
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                let merged = Transaction {
                    id: existing.id.clone(),
                    created_at: existing.created_at,
                    confirmation_status: existing.confirmation_status,
                    booking_id: tx.booking_id.clone().or_else(|| existing.booking_id.clone()),
                    guest_booking_id: tx
                        .guest_booking_id
                        .clone()
                        .or_else(|| existing.guest_booking_id.clone()),
                    stripe_customer_id: tx
                        .stripe_customer_id
                        .clone()
                        .or_else(|| existing.stripe_customer_id.clone()),
                    stripe_subscription_id: tx
                        .stripe_subscription_id
                        .clone()
                        .or_else(|| existing.stripe_subscription_id.clone()),
                    next_billing_date: tx
                        .next_billing_date
                        .clone()
                        .or_else(|| existing.next_billing_date.clone()),
                    ..tx.clone()
                };
                *existing = merged.clone();
                merged
            }
        };
        Ok(stored)
    }

    async fn find_transaction_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Transaction>, BoxError> {
        self.check("transaction")?;
        Ok(self.transactions.get(session_id).map(|t| t.clone()))
    }

    async fn coaches_with_phone(&self) -> Result<Vec<Coach>, BoxError> {
        Ok(self
            .coaches
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.phone.as_deref().is_some_and(|p| !p.is_empty()))
            .cloned()
            .collect())
    }

    async fn insert_draft(&self, draft: &BookingDraft) -> Result<(), BoxError> {
        self.drafts.insert(draft.token.clone(), draft.clone());
        Ok(())
    }

    async fn find_draft(&self, token: &str) -> Result<Option<BookingDraft>, BoxError> {
        Ok(self.drafts.get(token).map(|d| d.clone()))
    }

    async fn prune_expired_drafts(&self, now: i64) -> Result<u64, BoxError> {
        self.check("drafts")?;
        let before = self.drafts.len();
        self.drafts.retain(|_, d| !d.is_expired(now));
        Ok((before - self.drafts.len()) as u64)
    }

    async fn record_failed_step(
        &self,
        session_id: &str,
        step: &str,
        error: &str,
        now: i64,
    ) -> Result<(), BoxError> {
        if let Some(mut open) = self.failed_steps.iter_mut().find(|s| {
            s.session_id == session_id && s.step == step && s.resolved_at.is_none()
        }) {
            open.error = error.to_string();
            return Ok(());
        }
        let id = self.next_step_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.failed_steps.insert(
            id,
            FailedStep {
                id,
                session_id: session_id.to_string(),
                step: step.to_string(),
                error: error.to_string(),
                attempts: 0,
                next_attempt_at: now,
                resolved_at: None,
                created_at: now,
            },
        );
        Ok(())
    }

    async fn due_failed_steps(&self, now: i64, limit: i64) -> Result<Vec<FailedStep>, BoxError> {
        let mut due: Vec<FailedStep> = self
            .failed_steps
            .iter()
            .filter(|s| {
                s.resolved_at.is_none() && s.next_attempt_at <= now && s.attempts < MAX_ATTEMPTS
            })
            .map(|s| s.clone())
            .collect();
        due.sort_by_key(|s| s.next_attempt_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn resolve_failed_steps(&self, session_id: &str, now: i64) -> Result<u64, BoxError> {
        let mut resolved = 0;
        for mut step in self.failed_steps.iter_mut() {
            if step.session_id == session_id && step.resolved_at.is_none() {
                step.resolved_at = Some(now);
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    async fn defer_failed_step(
        &self,
        id: i64,
        error: &str,
        next_attempt_at: i64,
    ) -> Result<(), BoxError> {
        if let Some(mut step) = self.failed_steps.get_mut(&id) {
            step.attempts += 1;
            step.error = error.to_string();
            step.next_attempt_at = next_attempt_at;
        }
        Ok(())
    }

    async fn audit(
        &self,
        actor: &str,
        action: &str,
        detail: Option<&serde_json::Value>,
        _now: i64,
    ) -> Result<(), BoxError> {
        self.audit_log.lock().unwrap().push(AuditEntry {
            actor: actor.to_string(),
            action: action.to_string(),
            detail: detail.cloned(),
        });
        Ok(())
    }
}
