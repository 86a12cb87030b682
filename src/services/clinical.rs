use chrono::Utc;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::{ensure_transition, AppError};
use crate::models::{
    LabResult, LabResultStatus, LabResultUpdate, Lifecycle, MedicalRecord, Medication,
    MedicationStatus, MedicationStatusUpdate, NewLabResult, NewMedicalRecord, NewMedication, Role,
};
use crate::services::directory::authorize_patient_access;
use crate::services::identity::Caller;
use crate::services::invalidation::invalidate;
use crate::services::policy::{Operation, Scope};
use crate::state::AppState;

const MAX_LIST_LIMIT: i64 = 500;

fn list_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(100).clamp(1, MAX_LIST_LIMIT)
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid(format!("{field} is required")));
    }
    Ok(())
}

/// The doctor an entry is filed under. Doctors always file as themselves;
/// staff and admins must name one.
fn acting_doctor(
    conn: &Connection,
    caller: &Caller,
    requested: Option<i64>,
) -> Result<i64, AppError> {
    if caller.role == Role::Doctor {
        let own = caller.own_doctor_id()?;
        if requested.is_some_and(|id| id != own) {
            return Err(AppError::forbidden("doctors can only file entries as themselves"));
        }
        return Ok(own);
    }

    let id = requested.ok_or_else(|| AppError::invalid("doctor_id is required"))?;
    queries::get_doctor(conn, id)?.ok_or_else(|| AppError::not_found("doctor"))?;
    Ok(id)
}

fn ensure_patient(conn: &Connection, patient_id: i64) -> Result<(), AppError> {
    queries::get_patient(conn, patient_id)?.ok_or_else(|| AppError::not_found("patient"))?;
    Ok(())
}

/// Access to an existing entry: a doctor reaches what they authored as well
/// as anything about patients they have seen.
fn authorize_entry(
    conn: &Connection,
    caller: &Caller,
    op: Operation,
    patient_id: i64,
    doctor_id: i64,
) -> Result<(), AppError> {
    match caller.scope_for(op)? {
        Scope::Own if caller.role == Role::Doctor && caller.doctor_id == Some(doctor_id) => Ok(()),
        _ => authorize_patient_access(conn, caller, op, patient_id),
    }
}

/// Resolves which patient a list is about, forcing the caller's own profile for patients.
fn list_subject(
    conn: &Connection,
    caller: &Caller,
    op: Operation,
    patient_id: Option<i64>,
) -> Result<Option<i64>, AppError> {
    match caller.scope_for(op)? {
        Scope::Any => Ok(patient_id),
        _ if caller.role == Role::Patient => Ok(Some(caller.own_patient_id()?)),
        _ => {
            if let Some(id) = patient_id {
                authorize_patient_access(conn, caller, op, id)?;
            }
            Ok(patient_id)
        }
    }
}

// ── Medical Records ──

pub fn create_record(
    state: &AppState,
    caller: &Caller,
    input: NewMedicalRecord,
) -> Result<MedicalRecord, AppError> {
    caller.scope_for(Operation::WriteRecord)?;
    require_text(&input.diagnosis, "diagnosis")?;

    let record = {
        let db = state.db()?;
        ensure_patient(&db, input.patient_id)?;
        let doctor_id = acting_doctor(&db, caller, input.doctor_id)?;
        authorize_patient_access(&db, caller, Operation::WriteRecord, input.patient_id)?;

        if let Some(appointment_id) = input.appointment_id {
            let appt = queries::get_appointment(&db, appointment_id)?
                .ok_or_else(|| AppError::not_found("appointment"))?;
            if appt.patient_id != input.patient_id {
                return Err(AppError::invalid("appointment belongs to a different patient"));
            }
        }

        let record_date = input.record_date.unwrap_or_else(|| Utc::now().date_naive());
        let id = queries::create_medical_record(
            &db,
            input.patient_id,
            doctor_id,
            input.appointment_id,
            &input.diagnosis,
            input.treatment.as_deref(),
            input.notes.as_deref(),
            &record_date,
        )?;
        queries::get_medical_record(&db, id)?.ok_or_else(|| AppError::not_found("medical record"))?
    };

    tracing::info!(
        record_id = record.id,
        patient_id = record.patient_id,
        doctor_id = record.doctor_id,
        "medical record created"
    );
    invalidate(state, [format!("/patients/{}/records", record.patient_id)]);
    Ok(record)
}

pub fn get_record(state: &AppState, caller: &Caller, id: i64) -> Result<MedicalRecord, AppError> {
    let db = state.db()?;
    let record = queries::get_medical_record(&db, id)?
        .ok_or_else(|| AppError::not_found("medical record"))?;
    authorize_entry(&db, caller, Operation::ReadRecord, record.patient_id, record.doctor_id)?;
    Ok(record)
}

/// Doctors without a patient filter get the records they authored.
pub fn list_records(
    state: &AppState,
    caller: &Caller,
    patient_id: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<MedicalRecord>, AppError> {
    let db = state.db()?;
    let patient_id = list_subject(&db, caller, Operation::ReadRecord, patient_id)?;
    let doctor_id = match (caller.role, patient_id) {
        (Role::Doctor, None) => Some(caller.own_doctor_id()?),
        _ => None,
    };
    Ok(queries::list_medical_records(&db, patient_id, doctor_id, list_limit(limit))?)
}

// ── Medications ──

pub fn prescribe(
    state: &AppState,
    caller: &Caller,
    input: NewMedication,
) -> Result<Medication, AppError> {
    caller.scope_for(Operation::Prescribe)?;
    require_text(&input.name, "name")?;
    require_text(&input.dosage, "dosage")?;
    require_text(&input.frequency, "frequency")?;
    if input.end_date.is_some_and(|end| end < input.start_date) {
        return Err(AppError::invalid("end_date is before start_date"));
    }

    let medication = {
        let db = state.db()?;
        ensure_patient(&db, input.patient_id)?;
        let doctor_id = acting_doctor(&db, caller, input.doctor_id)?;
        authorize_patient_access(&db, caller, Operation::Prescribe, input.patient_id)?;

        let id = queries::create_medication(
            &db,
            input.patient_id,
            doctor_id,
            &input.name,
            &input.dosage,
            &input.frequency,
            &input.start_date,
            input.end_date.as_ref(),
            input.notes.as_deref(),
        )?;
        queries::get_medication(&db, id)?.ok_or_else(|| AppError::not_found("medication"))?
    };

    tracing::info!(
        medication_id = medication.id,
        patient_id = medication.patient_id,
        name = %medication.name,
        "medication prescribed"
    );
    invalidate(
        state,
        [
            format!("/patients/{}/medications", medication.patient_id),
            "/dashboard".to_string(),
        ],
    );
    Ok(medication)
}

pub fn list_medications(
    state: &AppState,
    caller: &Caller,
    patient_id: Option<i64>,
    status: Option<MedicationStatus>,
    limit: Option<i64>,
) -> Result<Vec<Medication>, AppError> {
    let db = state.db()?;
    let patient_id = list_subject(&db, caller, Operation::ReadMedication, patient_id)?;
    if caller.role == Role::Doctor && patient_id.is_none() {
        return Err(AppError::invalid("patient_id is required"));
    }
    Ok(queries::list_medications(&db, patient_id, status, list_limit(limit))?)
}

/// Moves a medication along active → completed | discontinued. The end date
/// defaults to today when the course ends.
pub fn update_medication_status(
    state: &AppState,
    caller: &Caller,
    id: i64,
    update: MedicationStatusUpdate,
) -> Result<Medication, AppError> {
    caller.scope_for(Operation::UpdateMedication)?;

    let medication = {
        let db = state.db()?;
        let current = queries::get_medication(&db, id)?
            .ok_or_else(|| AppError::not_found("medication"))?;
        authorize_entry(
            &db,
            caller,
            Operation::UpdateMedication,
            current.patient_id,
            current.doctor_id,
        )?;
        ensure_transition(current.status, update.status)?;

        let end_date = match (update.end_date, update.status) {
            (Some(date), _) => Some(date),
            (None, MedicationStatus::Active) => None,
            (None, _) => Some(current.end_date.unwrap_or_else(|| Utc::now().date_naive())),
        };
        if end_date.is_some_and(|end| end < current.start_date) {
            return Err(AppError::invalid("end_date is before start_date"));
        }

        queries::update_medication_status(&db, id, update.status, end_date.as_ref())?;
        queries::get_medication(&db, id)?.ok_or_else(|| AppError::not_found("medication"))?
    };

    tracing::info!(
        medication_id = id,
        status = medication.status.as_str(),
        "medication status changed"
    );
    invalidate(
        state,
        [
            format!("/patients/{}/medications", medication.patient_id),
            "/dashboard".to_string(),
        ],
    );
    Ok(medication)
}

// ── Lab Results ──

pub fn order_lab(
    state: &AppState,
    caller: &Caller,
    input: NewLabResult,
) -> Result<LabResult, AppError> {
    caller.scope_for(Operation::OrderLab)?;
    require_text(&input.test_name, "test_name")?;

    let lab = {
        let db = state.db()?;
        ensure_patient(&db, input.patient_id)?;
        let doctor_id = acting_doctor(&db, caller, input.doctor_id)?;
        authorize_patient_access(&db, caller, Operation::OrderLab, input.patient_id)?;

        let id = queries::create_lab_result(
            &db,
            input.patient_id,
            doctor_id,
            &input.test_name,
            input.normal_range.as_deref(),
            &input.test_date,
            input.notes.as_deref(),
        )?;
        queries::get_lab_result(&db, id)?.ok_or_else(|| AppError::not_found("lab result"))?
    };

    tracing::info!(
        lab_result_id = lab.id,
        patient_id = lab.patient_id,
        test = %lab.test_name,
        "lab test ordered"
    );
    invalidate(
        state,
        [
            format!("/patients/{}/lab-results", lab.patient_id),
            "/dashboard".to_string(),
        ],
    );
    Ok(lab)
}

pub fn list_lab_results(
    state: &AppState,
    caller: &Caller,
    patient_id: Option<i64>,
    limit: Option<i64>,
) -> Result<Vec<LabResult>, AppError> {
    let db = state.db()?;
    let patient_id = list_subject(&db, caller, Operation::ReadLab, patient_id)?;
    let doctor_id = match (caller.role, patient_id) {
        (Role::Doctor, None) => Some(caller.own_doctor_id()?),
        _ => None,
    };
    Ok(queries::list_lab_results(&db, patient_id, doctor_id, list_limit(limit))?)
}

/// Records a result and/or moves the status along pending → completed → reviewed.
pub fn update_lab_result(
    state: &AppState,
    caller: &Caller,
    id: i64,
    update: LabResultUpdate,
) -> Result<LabResult, AppError> {
    caller.scope_for(Operation::UpdateLab)?;
    if update.result.is_none() && update.status.is_none() && update.notes.is_none() {
        return Err(AppError::invalid("no fields to update"));
    }

    let lab = {
        let db = state.db()?;
        let mut lab = queries::get_lab_result(&db, id)?
            .ok_or_else(|| AppError::not_found("lab result"))?;
        authorize_entry(&db, caller, Operation::UpdateLab, lab.patient_id, lab.doctor_id)?;

        if let Some(status) = update.status {
            ensure_transition(lab.status, status)?;
            lab.status = status;
        }
        if let Some(result) = update.result {
            lab.result = Some(result);
        }
        if let Some(notes) = update.notes {
            lab.notes = Some(notes);
        }
        if lab.status != LabResultStatus::Pending && lab.result.is_none() {
            return Err(AppError::invalid("a lab result must be recorded before completing"));
        }

        queries::save_lab_result(&db, &lab)?;
        lab
    };

    tracing::info!(lab_result_id = id, status = lab.status.as_str(), "lab result updated");
    invalidate(
        state,
        [
            format!("/patients/{}/lab-results", lab.patient_id),
            "/dashboard".to_string(),
        ],
    );
    Ok(lab)
}
