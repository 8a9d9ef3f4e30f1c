//! Class booking model

use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Confirmation status shared by bookings, appointments, guest bookings and transactions
///
/// Moves forward only: PENDING → CONFIRMED, PENDING/CONFIRMED → CANCELED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    /// Paid but not yet confirmed by staff
    Pending,
    Confirmed,
    Canceled,
}

impl ConfirmationStatus {
    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "CANCELED" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Whether a record in this status may move to `next`.
    ///
    /// Staying in the same status is allowed (idempotent writes); nothing
    /// leaves CANCELED.
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (a, b) if *a == b => true,
            (Self::Pending, Self::Confirmed) => true,
            (Self::Pending | Self::Confirmed, Self::Canceled) => true,
            _ => false,
        }
    }
}

impl TryFrom<String> for ConfirmationStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_db(&value).ok_or(UnknownVariant {
            kind: "confirmation_status",
            value,
        })
    }
}

/// Booking of a scheduled class occurrence
///
/// `member_id` owns the booking; `participant_id` is who attends (a dependent
/// for family accounts, otherwise the member themselves).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Booking {
    pub id: String,
    pub member_id: String,
    pub participant_id: String,
    pub class_id: String,
    pub paid: bool,
    pub attended: bool,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub confirmation_status: ConfirmationStatus,
    pub stripe_session_id: Option<String>,
    pub session_start: Option<String>,
    pub created_at: i64,
}

/// Staff request to move a booking's confirmation status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingStatusUpdate {
    pub confirmation_status: ConfirmationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_allowed() {
        use ConfirmationStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Canceled));
        assert!(Confirmed.can_transition_to(Canceled));
        assert!(Confirmed.can_transition_to(Confirmed));
    }

    #[test]
    fn canceled_is_terminal() {
        use ConfirmationStatus::*;
        assert!(!Canceled.can_transition_to(Pending));
        assert!(!Canceled.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Pending));
    }

    #[test]
    fn db_strings() {
        assert_eq!(ConfirmationStatus::Pending.as_db(), "PENDING");
        assert_eq!(
            ConfirmationStatus::try_from("CANCELED".to_string()),
            Ok(ConfirmationStatus::Canceled)
        );
        assert!(ConfirmationStatus::try_from("DONE".to_string()).is_err());
        let json = serde_json::to_string(&ConfirmationStatus::Confirmed).unwrap();
        assert_eq!(json, "\"CONFIRMED\"");
    }
}
