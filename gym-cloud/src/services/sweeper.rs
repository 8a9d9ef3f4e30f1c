//! Replays reconciliation for sessions with unresolved failed steps

use std::collections::BTreeMap;
use std::time::Duration;

use shared::util::now_millis;

use super::reconcile::reconcile;
use crate::db::FailedStep;
use crate::state::AppState;

const BATCH_SIZE: i64 = 50;
const BASE_BACKOFF_MS: i64 = 60_000;
const MAX_BACKOFF_MS: i64 = 3_600_000;

/// Delay before the next attempt after `attempts` failures, doubling up to one hour
pub fn backoff_ms(attempts: i32) -> i64 {
    let exp = attempts.clamp(0, 16) as u32;
    BASE_BACKOFF_MS
        .saturating_mul(1_i64 << exp)
        .min(MAX_BACKOFF_MS)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: usize,
    pub resolved: usize,
    pub deferred: usize,
}

/// One pass over due failed steps
pub async fn sweep_once(state: &AppState, now: i64) -> SweepReport {
    let due = match state.store.due_failed_steps(now, BATCH_SIZE).await {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load due failed steps");
            return SweepReport::default();
        }
    };

    let mut by_session: BTreeMap<String, Vec<FailedStep>> = BTreeMap::new();
    for step in due {
        by_session.entry(step.session_id.clone()).or_default().push(step);
    }

    let mut report = SweepReport {
        sessions: by_session.len(),
        ..Default::default()
    };

    for (session_id, steps) in by_session {
        let error = match state.payments.retrieve_session(&session_id).await {
            Ok(session) => {
                let outcome = reconcile(state, &session).await;
                if outcome.is_clean() {
                    tracing::info!(session_id = %session_id, "Failed steps replayed");
                    report.resolved += 1;
                    continue;
                }
                format!("replay failed: {}", outcome.failed_steps.join(", "))
            }
            Err(e) => e.to_string(),
        };

        for step in &steps {
            let next = now + backoff_ms(step.attempts + 1);
            if let Err(e) = state.store.defer_failed_step(step.id, &error, next).await {
                tracing::error!(step_id = step.id, error = %e, "Failed to defer step");
            }
        }
        tracing::warn!(
            session_id = %session_id,
            error = %error,
            "Replay unsuccessful; deferred"
        );
        report.deferred += 1;
    }

    report
}

/// Delete booking drafts past their expiry. Returns the number removed.
pub async fn prune_drafts(state: &AppState, now: i64) -> u64 {
    match state.store.prune_expired_drafts(now).await {
        Ok(removed) => {
            if removed > 0 {
                tracing::info!(removed, "Pruned expired booking drafts");
            }
            removed
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to prune booking drafts");
            0
        }
    }
}

/// Floor for the sweep period; `tokio::time::interval` panics on zero
const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Run [`sweep_once`] forever on a fixed period
pub async fn run(state: AppState, period: Duration) {
    let mut interval = tokio::time::interval(period.max(MIN_PERIOD));
    loop {
        interval.tick().await;
        let now = now_millis();
        let report = sweep_once(&state, now).await;
        if report.sessions > 0 {
            tracing::info!(
                sessions = report.sessions,
                resolved = report.resolved,
                deferred = report.deferred,
                "Sweep finished"
            );
        }
        prune_drafts(&state, now).await;
    }
}
