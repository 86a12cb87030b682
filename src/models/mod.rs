pub mod appointment;
pub mod availability;
pub mod clinical;
pub mod doctor;
pub mod feedback;
pub mod message;
pub mod patient;
pub mod report;
pub mod status;
pub mod user;

pub use appointment::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentUpdate, NewAppointment,
    DEFAULT_DURATION_MINUTES,
};
pub use availability::{Slot, WorkingHours};
pub use clinical::{
    LabResult, LabResultStatus, LabResultUpdate, MedicalRecord, Medication, MedicationStatus,
    MedicationStatusUpdate, NewLabResult, NewMedicalRecord, NewMedication,
};
pub use doctor::{Department, DepartmentInput, Doctor, NewDoctor, NewStaffMember, StaffMember};
pub use feedback::{Feedback, FeedbackStatus, FeedbackUpdate, NewFeedback};
pub use message::{Message, NewMessage};
pub use patient::{NewPatient, Patient, PatientUpdate};
pub use report::{
    ClinicStats, Dashboard, DoctorAppointmentSummary, DoctorStats, PatientStats, StatusCounts,
};
pub use status::Lifecycle;
pub use user::{NewUser, Role, Session, User, UserUpdate};
