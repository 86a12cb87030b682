use chrono::Duration;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::availability::parse_time;
use crate::models::{Appointment, AppointmentStatus};
use crate::services::appointments;
use crate::services::identity::Caller;
use crate::state::AppState;

const ICS_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Text values in ICS must escape commas, semicolons and newlines.
fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

pub fn generate_ics(appt: &Appointment, doctor_name: &str) -> anyhow::Result<String> {
    let start = appt.date.and_time(parse_time(&appt.time)?);
    let end = start + Duration::minutes(appt.duration_minutes as i64);
    let dtstamp = appt.updated_at.format(ICS_FORMAT);
    let uid = format!("appointment-{}@clinicdesk", appt.id);

    let summary = escape_text(&format!("{} with {}", appt.appointment_type, doctor_name));
    let description = escape_text(appt.reason.as_deref().unwrap_or("No reason given"));
    let status = match appt.status {
        AppointmentStatus::Cancelled => "CANCELLED",
        AppointmentStatus::Scheduled => "TENTATIVE",
        _ => "CONFIRMED",
    };

    Ok(format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//ClinicDesk//Appointments//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{}\r\n\
         DTEND:{}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n",
        start.format(ICS_FORMAT),
        end.format(ICS_FORMAT),
    ))
}

/// Calendar file for one appointment the caller can read.
pub fn appointment_ics(state: &AppState, caller: &Caller, id: i64) -> Result<String, AppError> {
    let appt = appointments::get_appointment(state, caller, id)?;
    let doctor_name = {
        let db = state.db()?;
        queries::get_doctor(&db, appt.doctor_id)?
            .map(|d| d.name)
            .ok_or_else(|| AppError::not_found("doctor"))?
    };
    Ok(generate_ics(&appt, &doctor_name)?)
}
