//! Appointment Models
//! Mission: Appointment data structures and the status state machine

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Appointment workflow status.
///
/// Scheduled is the initial state; Completed and Missed end the workflow but
/// are not immutable, a status may be set back to Scheduled. There are no
/// automatic transitions: every change is an explicit client request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    #[serde(rename = "S")]
    Scheduled,
    #[serde(rename = "C")]
    Completed,
    #[serde(rename = "M")]
    Missed,
}

impl AppointmentStatus {
    pub fn code(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "S",
            AppointmentStatus::Completed => "C",
            AppointmentStatus::Missed => "M",
        }
    }

    /// Parse a status code; anything outside {S, C, M} is invalid.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "S" => Some(AppointmentStatus::Scheduled),
            "C" => Some(AppointmentStatus::Completed),
            "M" => Some(AppointmentStatus::Missed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Missed => "Missed",
        }
    }
}

/// A scheduled clinical encounter linking a clinician to a patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub account_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: String,
}

/// Appointment joined with clinician and patient names for listing views
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetail {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    pub status_label: String,
    pub notes: String,
}

/// Booking request. `doctor_id` defaults to the caller; whoever is chosen
/// must resolve to the Doctor role.
#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    #[serde(default)]
    pub notes: String,
}

/// Full edit of an existing appointment
#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: String,
}

/// Status-update request body. The code stays a raw string here so unknown
/// values reach the handler and come back as a client fault instead of a
/// deserialization error.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip() {
        for status in [
            AppointmentStatus::Scheduled,
            AppointmentStatus::Completed,
            AppointmentStatus::Missed,
        ] {
            assert_eq!(AppointmentStatus::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn test_unknown_codes_rejected() {
        assert_eq!(AppointmentStatus::from_code("X"), None);
        assert_eq!(AppointmentStatus::from_code(""), None);
        assert_eq!(AppointmentStatus::from_code("s"), None);
        assert_eq!(AppointmentStatus::from_code("Scheduled"), None);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&AppointmentStatus::Completed).unwrap();
        assert_eq!(json, r#""C""#);

        let status: AppointmentStatus = serde_json::from_str(r#""M""#).unwrap();
        assert_eq!(status, AppointmentStatus::Missed);
    }

    #[test]
    fn test_labels() {
        assert_eq!(AppointmentStatus::Scheduled.label(), "Scheduled");
        assert_eq!(AppointmentStatus::Completed.label(), "Completed");
        assert_eq!(AppointmentStatus::Missed.label(), "Missed");
    }
}
