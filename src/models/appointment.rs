use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::status::Lifecycle;

pub const DEFAULT_DURATION_MINUTES: i32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub duration_minutes: i32,
    pub appointment_type: String,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub follow_up_required: bool,
    pub follow_up_date: Option<NaiveDate>,
    pub cancelled_by: Option<i64>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "no_show" => Some(AppointmentStatus::NoShow),
            _ => None,
        }
    }

    /// Statuses that take a slot out of the bookable list.
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }
}

impl Lifecycle for AppointmentStatus {
    fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    fn next_states(&self) -> &'static [Self] {
        use AppointmentStatus::*;
        match self {
            Scheduled => &[Confirmed, Completed, Cancelled, NoShow],
            Confirmed => &[Completed, Cancelled, NoShow],
            Completed | Cancelled | NoShow => &[],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub duration_minutes: Option<i32>,
    pub appointment_type: String,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
}

/// A partial update. Only fields that are present are written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppointmentUpdate {
    pub doctor_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub duration_minutes: Option<i32>,
    pub appointment_type: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub follow_up_required: Option<bool>,
    pub follow_up_date: Option<NaiveDate>,
}

impl AppointmentUpdate {
    /// Names of the fields this update touches.
    pub fn provided_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.doctor_id.is_some() {
            fields.push("doctor_id");
        }
        if self.date.is_some() {
            fields.push("date");
        }
        if self.time.is_some() {
            fields.push("time");
        }
        if self.duration_minutes.is_some() {
            fields.push("duration_minutes");
        }
        if self.appointment_type.is_some() {
            fields.push("appointment_type");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.reason.is_some() {
            fields.push("reason");
        }
        if self.symptoms.is_some() {
            fields.push("symptoms");
        }
        if self.notes.is_some() {
            fields.push("notes");
        }
        if self.diagnosis.is_some() {
            fields.push("diagnosis");
        }
        if self.prescription.is_some() {
            fields.push("prescription");
        }
        if self.follow_up_required.is_some() {
            fields.push("follow_up_required");
        }
        if self.follow_up_date.is_some() {
            fields.push("follow_up_date");
        }
        fields
    }

    /// True when the (doctor, date, time) key changes.
    pub fn moves_slot(&self) -> bool {
        self.doctor_id.is_some() || self.date.is_some() || self.time.is_some()
    }

    pub fn apply(self, appt: &mut Appointment) {
        if let Some(doctor_id) = self.doctor_id {
            appt.doctor_id = doctor_id;
        }
        if let Some(date) = self.date {
            appt.date = date;
        }
        if let Some(time) = self.time {
            appt.time = time;
        }
        if let Some(duration) = self.duration_minutes {
            appt.duration_minutes = duration;
        }
        if let Some(kind) = self.appointment_type {
            appt.appointment_type = kind;
        }
        if let Some(status) = self.status {
            appt.status = status;
        }
        if let Some(reason) = self.reason {
            appt.reason = Some(reason);
        }
        if let Some(symptoms) = self.symptoms {
            appt.symptoms = Some(symptoms);
        }
        if let Some(notes) = self.notes {
            appt.notes = Some(notes);
        }
        if let Some(diagnosis) = self.diagnosis {
            appt.diagnosis = Some(diagnosis);
        }
        if let Some(prescription) = self.prescription {
            appt.prescription = Some(prescription);
        }
        if let Some(flag) = self.follow_up_required {
            appt.follow_up_required = flag;
        }
        if let Some(date) = self.follow_up_date {
            appt.follow_up_date = Some(date);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
    pub doctor_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_strings() {
        for s in ["scheduled", "confirmed", "completed", "cancelled", "no_show"] {
            let status = AppointmentStatus::parse(s).unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert_eq!(AppointmentStatus::parse("pending"), None);
    }

    #[test]
    fn test_holds_slot() {
        assert!(AppointmentStatus::Scheduled.holds_slot());
        assert!(AppointmentStatus::Confirmed.holds_slot());
        assert!(!AppointmentStatus::Cancelled.holds_slot());
        assert!(!AppointmentStatus::Completed.holds_slot());
        assert!(!AppointmentStatus::NoShow.holds_slot());
    }

    #[test]
    fn test_provided_fields() {
        let update = AppointmentUpdate {
            reason: Some("headache".to_string()),
            notes: Some("n/a".to_string()),
            ..Default::default()
        };
        assert_eq!(update.provided_fields(), vec!["reason", "notes"]);
        assert!(!update.moves_slot());

        let reassign = AppointmentUpdate {
            doctor_id: Some(4),
            ..Default::default()
        };
        assert_eq!(reassign.provided_fields(), vec!["doctor_id"]);
        assert!(reassign.moves_slot());
    }

    #[test]
    fn test_unknown_update_field_rejected() {
        let result: Result<AppointmentUpdate, _> =
            serde_json::from_str(r#"{"reason":"x","patient_id":3}"#);
        assert!(result.is_err());
    }
}
