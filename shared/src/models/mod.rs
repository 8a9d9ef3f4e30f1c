//! Data models
//!
//! Shared between gym-cloud and the web frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Status-like enums are stored as upper-case TEXT columns.

pub mod appointment;
pub mod booking;
pub mod coach;
pub mod draft;
pub mod guest_booking;
pub mod transaction;

// Re-exports
pub use appointment::*;
pub use booking::*;
pub use coach::*;
pub use draft::*;
pub use guest_booking::*;
pub use transaction::*;

/// A stored enum column held a value this build does not know about
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
