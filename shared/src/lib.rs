//! Shared types for the gym services
//!
//! Error system, domain models and small utilities used by gym-cloud and
//! mirrored by the web frontend.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
