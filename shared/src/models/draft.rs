//! Server-issued booking draft
//!
//! Replaces the browser-local "pending booking": the client saves its intent
//! here before redirecting to checkout and carries the token through.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BookingDraft {
    pub token: String,
    pub payload: serde_json::Value,
    pub expires_at: i64,
    pub created_at: i64,
}

impl BookingDraft {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}
