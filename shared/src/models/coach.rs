//! Coach Model

use serde::{Deserialize, Serialize};

/// Coach entity (only the fields the messaging auto-responder needs)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Coach {
    pub id: String,
    pub name: String,
    /// Stored as entered by the coach; normalized at comparison time
    pub phone: Option<String>,
    pub auto_reply_enabled: bool,
    /// Custom reply; `{name}` and `{link}` placeholders are substituted
    pub auto_reply_message: Option<String>,
}
