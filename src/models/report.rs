use serde::Serialize;

use super::AppointmentStatus;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusCounts {
    pub scheduled: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub no_show: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: AppointmentStatus, n: i64) {
        match status {
            AppointmentStatus::Scheduled => self.scheduled += n,
            AppointmentStatus::Confirmed => self.confirmed += n,
            AppointmentStatus::Completed => self.completed += n,
            AppointmentStatus::Cancelled => self.cancelled += n,
            AppointmentStatus::NoShow => self.no_show += n,
        }
    }

    pub fn total(&self) -> i64 {
        self.scheduled + self.confirmed + self.completed + self.cancelled + self.no_show
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum Dashboard {
    Clinic(ClinicStats),
    Doctor(DoctorStats),
    Patient(PatientStats),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClinicStats {
    pub total_patients: i64,
    pub total_doctors: i64,
    pub total_staff: i64,
    pub appointments_today: i64,
    pub appointments_by_status: StatusCounts,
    pub pending_feedback: i64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DoctorStats {
    pub appointments_today: i64,
    pub upcoming_appointments: i64,
    pub completed_appointments: i64,
    pub distinct_patients: i64,
    pub pending_lab_results: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientStats {
    pub upcoming_appointments: i64,
    pub active_medications: i64,
    pub pending_lab_results: i64,
    pub unread_messages: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorAppointmentSummary {
    pub doctor_id: i64,
    pub doctor_name: String,
    pub total: i64,
    pub counts: StatusCounts,
}
