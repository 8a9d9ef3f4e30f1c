//! Coach slot appointment model

use serde::{Deserialize, Serialize};

use super::ConfirmationStatus;

/// Occupancy of one coach slot by one member/participant pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CoachAppointment {
    pub id: String,
    pub slot_id: String,
    pub coach_id: Option<String>,
    pub member_id: Option<String>,
    pub participant_id: Option<String>,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub confirmation_status: ConfirmationStatus,
    pub stripe_session_id: Option<String>,
    pub created_at: i64,
}
