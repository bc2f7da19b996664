// src/models/appointment.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Appointment state machine: pending -> approved | declined, both terminal.
/// There is no re-open path; a finished appointment stays finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Declined,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Declined => "declined",
        }
    }

    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "pending" => Some(AppointmentStatus::Pending),
            "approved" => Some(AppointmentStatus::Approved),
            "declined" => Some(AppointmentStatus::Declined),
            _ => None,
        }
    }

    /// Only pending appointments may move anywhere.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (
                AppointmentStatus::Pending,
                AppointmentStatus::Approved | AppointmentStatus::Declined
            )
        )
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: i32,
    pub user_id: i32,
    pub therapist_id: i32,
    pub status: String,
    pub notes: Option<String>,
    pub requested_at: chrono::DateTime<chrono::Utc>,
    pub approved_at: Option<chrono::DateTime<chrono::Utc>>,
    pub admin_id: Option<i32>,
    pub scheduled_for: Option<chrono::DateTime<chrono::Utc>>,
    pub meeting_link: Option<String>,
}

/// Appointment joined with the participants' display details, the shape the
/// admin request list and approval notification both need.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AppointmentDetails {
    pub id: i32,
    pub user_id: i32,
    pub therapist_id: i32,
    pub status: String,
    pub notes: Option<String>,
    pub requested_at: chrono::DateTime<chrono::Utc>,
    pub approved_at: Option<chrono::DateTime<chrono::Utc>>,
    pub admin_id: Option<i32>,
    pub scheduled_for: Option<chrono::DateTime<chrono::Utc>>,
    pub meeting_link: Option<String>,
    pub user_username: String,
    pub user_email: String,
    pub therapist_name: String,
}

#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    pub therapist_id: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveAppointmentRequest {
    pub date: chrono::DateTime<chrono::Utc>,
    pub zoom_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_transitions() {
        assert!(AppointmentStatus::Pending.can_transition_to(AppointmentStatus::Approved));
        assert!(AppointmentStatus::Pending.can_transition_to(AppointmentStatus::Declined));
        assert!(!AppointmentStatus::Approved.can_transition_to(AppointmentStatus::Declined));
        assert!(!AppointmentStatus::Declined.can_transition_to(AppointmentStatus::Approved));
        assert!(!AppointmentStatus::Approved.can_transition_to(AppointmentStatus::Pending));
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Approved,
            AppointmentStatus::Declined,
        ] {
            assert_eq!(AppointmentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AppointmentStatus::parse("cancelled"), None);
    }
}
