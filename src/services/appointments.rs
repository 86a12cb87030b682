use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::{Map, Value};

use crate::db::queries::{self, AppointmentInsert};
use crate::errors::{ensure_transition, is_constraint_violation, AppError};
use crate::models::availability::parse_time;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentUpdate, Doctor, NewAppointment,
    Slot, DEFAULT_DURATION_MINUTES,
};
use crate::services::identity::Caller;
use crate::services::invalidation::{appointment_paths, invalidate};
use crate::services::policy::{updatable_appointment_fields, Operation, Owners, Scope};
use crate::services::scheduling;
use crate::state::AppState;

const MAX_DURATION_MINUTES: i32 = 8 * 60;
const MAX_LIST_LIMIT: i64 = 500;

fn validate_time(time: &str) -> Result<(), AppError> {
    parse_time(time)
        .map(|_| ())
        .map_err(|e| AppError::invalid(e.to_string()))
}

fn validate_duration(minutes: i32) -> Result<(), AppError> {
    if minutes <= 0 || minutes > MAX_DURATION_MINUTES {
        return Err(AppError::invalid(format!(
            "duration must be between 1 and {MAX_DURATION_MINUTES} minutes"
        )));
    }
    Ok(())
}

fn slot_taken(doctor_id: i64, date: &NaiveDate, time: &str) -> AppError {
    AppError::Conflict(format!(
        "doctor {doctor_id} already has an appointment on {date} at {time}"
    ))
}

fn load_appointment(conn: &Connection, id: i64) -> Result<Appointment, AppError> {
    queries::get_appointment(conn, id)?.ok_or_else(|| AppError::not_found("appointment"))
}

fn load_doctor(conn: &Connection, id: i64) -> Result<Doctor, AppError> {
    queries::get_doctor(conn, id)?.ok_or_else(|| AppError::not_found("doctor"))
}

pub fn create_appointment(
    state: &AppState,
    caller: &Caller,
    input: NewAppointment,
) -> Result<Appointment, AppError> {
    caller.scope_for(Operation::CreateAppointment)?;

    validate_time(&input.time)?;
    let duration = input.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    validate_duration(duration)?;
    let appointment_type = input.appointment_type.trim();
    if appointment_type.is_empty() {
        return Err(AppError::invalid("appointment type is required"));
    }

    let appointment = {
        let db = state.db()?;

        let patient = queries::get_patient(&db, input.patient_id)?
            .ok_or_else(|| AppError::not_found("patient"))?;
        let doctor = load_doctor(&db, input.doctor_id)?;
        caller.authorize(Operation::CreateAppointment, &Owners::new(patient.id, doctor.id))?;

        // Check and insert together; the partial unique index backs this up.
        let tx = db.unchecked_transaction()?;
        if scheduling::check_conflict(&tx, doctor.id, &input.date, &input.time, None)? {
            return Err(slot_taken(doctor.id, &input.date, &input.time));
        }

        let id = queries::insert_appointment(
            &tx,
            &AppointmentInsert {
                patient_id: patient.id,
                doctor_id: doctor.id,
                date: input.date,
                time: &input.time,
                duration_minutes: duration,
                appointment_type,
                reason: input.reason.as_deref(),
                symptoms: input.symptoms.as_deref(),
                notes: input.notes.as_deref(),
            },
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                slot_taken(doctor.id, &input.date, &input.time)
            } else {
                AppError::Unknown(e)
            }
        })?;
        tx.commit()?;

        load_appointment(&db, id)?
    };

    tracing::info!(
        appointment_id = appointment.id,
        doctor_id = appointment.doctor_id,
        patient_id = appointment.patient_id,
        date = %appointment.date,
        time = %appointment.time,
        created_by = caller.user_id,
        "appointment created"
    );
    invalidate(state, appointment_paths(appointment.id, appointment.doctor_id));

    Ok(appointment)
}

pub fn get_appointment(
    state: &AppState,
    caller: &Caller,
    id: i64,
) -> Result<Appointment, AppError> {
    let db = state.db()?;
    let appointment = load_appointment(&db, id)?;
    caller.authorize(
        Operation::ReadAppointment,
        &Owners::new(appointment.patient_id, appointment.doctor_id),
    )?;
    Ok(appointment)
}

/// Patients and doctors only ever see their own appointments, whatever the filter says.
pub fn list_appointments(
    state: &AppState,
    caller: &Caller,
    mut filter: AppointmentFilter,
) -> Result<Vec<Appointment>, AppError> {
    if caller.scope_for(Operation::ReadAppointment)? == Scope::Own {
        match (caller.patient_id, caller.doctor_id) {
            (Some(patient_id), _) => filter.patient_id = Some(patient_id),
            (None, Some(doctor_id)) => filter.doctor_id = Some(doctor_id),
            (None, None) => return Err(AppError::forbidden("no linked profile")),
        }
    }
    filter.limit = Some(filter.limit.unwrap_or(100).clamp(1, MAX_LIST_LIMIT));

    let db = state.db()?;
    Ok(queries::list_appointments(&db, &filter)?)
}

fn refuse_fields(caller: &Caller, field: &str, allowed: &[&str]) -> AppError {
    tracing::warn!(user_id = caller.user_id, field, "appointment field update refused");
    AppError::forbidden(format!(
        "{} accounts may only update: {}",
        caller.role.as_str(),
        allowed.join(", ")
    ))
}

/// Reads a raw PATCH body. Field restrictions are checked on the key names
/// before any value is parsed, so a restricted caller naming any other key,
/// known or not, is refused whatever the value.
pub fn parse_update(
    caller: &Caller,
    body: Map<String, Value>,
) -> Result<AppointmentUpdate, AppError> {
    if let Some(allowed) = updatable_appointment_fields(caller.role) {
        if let Some(field) = body.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(refuse_fields(caller, field, allowed));
        }
    }
    serde_json::from_value(Value::Object(body)).map_err(|e| AppError::invalid(e.to_string()))
}

pub fn update_appointment(
    state: &AppState,
    caller: &Caller,
    id: i64,
    update: AppointmentUpdate,
) -> Result<Appointment, AppError> {
    caller.scope_for(Operation::UpdateAppointment)?;

    let fields = update.provided_fields();
    if fields.is_empty() {
        return Err(AppError::invalid("no fields to update"));
    }
    if let Some(allowed) = updatable_appointment_fields(caller.role) {
        if let Some(field) = fields.iter().find(|f| !allowed.contains(f)) {
            return Err(refuse_fields(caller, field, allowed));
        }
    }
    if let Some(time) = update.time.as_deref() {
        validate_time(time)?;
    }
    if let Some(duration) = update.duration_minutes {
        validate_duration(duration)?;
    }

    let (before, after) = {
        let db = state.db()?;
        let before = load_appointment(&db, id)?;
        caller.authorize(
            Operation::UpdateAppointment,
            &Owners::new(before.patient_id, before.doctor_id),
        )?;

        if let Some(next) = update.status {
            ensure_transition(before.status, next)?;
        }
        if let Some(doctor_id) = update.doctor_id {
            load_doctor(&db, doctor_id)?;
        }

        let moves_slot = update.moves_slot();
        let mut after = before.clone();
        update.apply(&mut after);

        let tx = db.unchecked_transaction()?;
        if moves_slot
            && after.status != AppointmentStatus::Cancelled
            && scheduling::check_conflict(&tx, after.doctor_id, &after.date, &after.time, Some(id))?
        {
            return Err(slot_taken(after.doctor_id, &after.date, &after.time));
        }

        queries::save_appointment(&tx, &after).map_err(|e| {
            if is_constraint_violation(&e) {
                slot_taken(after.doctor_id, &after.date, &after.time)
            } else {
                AppError::Unknown(e)
            }
        })?;

        if after.status == AppointmentStatus::Cancelled
            && before.status != AppointmentStatus::Cancelled
        {
            queries::cancel_appointment(&tx, id, caller.user_id, None)?;
        }
        tx.commit()?;

        (before, load_appointment(&db, id)?)
    };

    tracing::info!(
        appointment_id = id,
        updated_by = caller.user_id,
        fields = ?fields,
        "appointment updated"
    );
    let mut paths = appointment_paths(after.id, after.doctor_id);
    if before.doctor_id != after.doctor_id {
        paths.push(format!("/doctors/{}/slots", before.doctor_id));
    }
    invalidate(state, paths);

    Ok(after)
}

/// Sets `cancelled` whatever the current status, stamping who cancelled and why.
pub fn cancel_appointment(
    state: &AppState,
    caller: &Caller,
    id: i64,
    reason: Option<String>,
) -> Result<Appointment, AppError> {
    caller.scope_for(Operation::CancelAppointment)?;
    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

    let appointment = {
        let db = state.db()?;
        let appointment = load_appointment(&db, id)?;
        caller.authorize(
            Operation::CancelAppointment,
            &Owners::new(appointment.patient_id, appointment.doctor_id),
        )?;

        queries::cancel_appointment(&db, id, caller.user_id, reason.as_deref())?;
        load_appointment(&db, id)?
    };

    tracing::info!(
        appointment_id = id,
        cancelled_by = caller.user_id,
        reason = reason.as_deref().unwrap_or(""),
        "appointment cancelled"
    );
    invalidate(state, appointment_paths(appointment.id, appointment.doctor_id));

    Ok(appointment)
}

pub fn available_slots(
    state: &AppState,
    caller: &Caller,
    doctor_id: i64,
    date: NaiveDate,
) -> Result<Vec<Slot>, AppError> {
    caller.scope_for(Operation::ViewSlots)?;

    let db = state.db()?;
    let doctor = load_doctor(&db, doctor_id)?;
    Ok(scheduling::generate_slots(&db, doctor.id, &date, &state.hours)?)
}

pub fn has_conflict(
    state: &AppState,
    caller: &Caller,
    doctor_id: i64,
    date: NaiveDate,
    time: &str,
) -> Result<bool, AppError> {
    caller.scope_for(Operation::ViewSlots)?;
    validate_time(time)?;

    let db = state.db()?;
    let doctor = load_doctor(&db, doctor_id)?;
    Ok(scheduling::check_conflict(&db, doctor.id, &date, time, None)?)
}
