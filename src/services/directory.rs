use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::{conflict_on_constraint, AppError};
use crate::models::{
    Department, DepartmentInput, Doctor, NewDoctor, NewPatient, NewStaffMember, NewUser, Patient,
    PatientUpdate, Role, Session, StaffMember, User, UserUpdate,
};
use crate::services::identity::Caller;
use crate::services::invalidation::invalidate;
use crate::services::policy::{Operation, Owners, Scope};
use crate::state::AppState;

const MAX_LIST_LIMIT: i64 = 500;

/// The signed-in user with whichever profile their role carries.
#[derive(Debug, Serialize)]
pub struct Profile {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Patient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Doctor>,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| AppError::invalid("email must contain '@'"))?;
    if local.is_empty() || domain.is_empty() || email.contains(char::is_whitespace) {
        return Err(AppError::invalid(format!("malformed email: {email}")));
    }
    Ok(())
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid(format!("{field} is required")));
    }
    Ok(())
}

fn load_user(conn: &Connection, id: i64) -> Result<User, AppError> {
    queries::get_user(conn, id)?.ok_or_else(|| AppError::not_found("user"))
}

/// A profile can only be attached to a user whose role matches it.
fn load_user_with_role(conn: &Connection, id: i64, role: Role) -> Result<User, AppError> {
    let user = load_user(conn, id)?;
    if user.role != role {
        return Err(AppError::invalid(format!(
            "user {id} has role {}, expected {}",
            user.role.as_str(),
            role.as_str()
        )));
    }
    Ok(user)
}

fn ensure_department(conn: &Connection, department_id: Option<i64>) -> Result<(), AppError> {
    if let Some(id) = department_id {
        queries::get_department(conn, id)?.ok_or_else(|| AppError::not_found("department"))?;
    }
    Ok(())
}

// ── Sessions ──

pub fn issue_session(state: &AppState, user_id: i64) -> Result<Session, AppError> {
    let db = state.db()?;
    load_user(&db, user_id)?;
    let session = queries::create_session(&db, user_id, state.config.session_ttl_hours)?;
    tracing::info!(user_id, expires_at = %session.expires_at, "session issued");
    Ok(session)
}

pub fn revoke_session(state: &AppState, token: &str) -> Result<(), AppError> {
    let db = state.db()?;
    if !queries::delete_session(&db, token)? {
        return Err(AppError::not_found("session"));
    }
    Ok(())
}

pub fn me(state: &AppState, caller: &Caller) -> Result<Profile, AppError> {
    let db = state.db()?;
    let user = load_user(&db, caller.user_id)?;
    let patient = match caller.patient_id {
        Some(id) => queries::get_patient(&db, id)?,
        None => None,
    };
    let doctor = match caller.doctor_id {
        Some(id) => queries::get_doctor(&db, id)?,
        None => None,
    };
    Ok(Profile {
        user,
        patient,
        doctor,
    })
}

// ── Users ──

pub fn create_user(state: &AppState, caller: &Caller, input: NewUser) -> Result<User, AppError> {
    caller.scope_for(Operation::ManageUsers)?;
    validate_email(&input.email)?;
    require_text(&input.name, "name")?;

    let db = state.db()?;
    let id = queries::create_user(&db, &input)
        .map_err(|e| conflict_on_constraint(e, format!("email {} is already registered", input.email)))?;
    tracing::info!(user_id = id, role = input.role.as_str(), "user created");
    load_user(&db, id)
}

pub fn list_users(
    state: &AppState,
    caller: &Caller,
    role: Option<Role>,
    limit: Option<i64>,
) -> Result<Vec<User>, AppError> {
    caller.scope_for(Operation::ManageUsers)?;
    let db = state.db()?;
    Ok(queries::list_users(
        &db,
        role,
        limit.unwrap_or(100).clamp(1, MAX_LIST_LIMIT),
    )?)
}

pub fn update_user(
    state: &AppState,
    caller: &Caller,
    id: i64,
    update: UserUpdate,
) -> Result<User, AppError> {
    caller.scope_for(Operation::ManageUsers)?;
    if let Some(email) = update.email.as_deref() {
        validate_email(email)?;
    }
    if let Some(name) = update.name.as_deref() {
        require_text(name, "name")?;
    }

    let db = state.db()?;
    let mut user = load_user(&db, id)?;
    if let Some(role) = update.role {
        if role != user.role {
            return Err(AppError::invalid("a user's role cannot be changed once created"));
        }
    }
    if let Some(email) = update.email {
        user.email = email;
    }
    if let Some(name) = update.name {
        user.name = name;
    }
    if let Some(phone) = update.phone {
        user.phone = Some(phone);
    }

    queries::save_user(&db, &user)
        .map_err(|e| conflict_on_constraint(e, format!("email {} is already registered", user.email)))?;
    tracing::info!(user_id = id, updated_by = caller.user_id, "user updated");
    load_user(&db, id)
}

pub fn delete_user(state: &AppState, caller: &Caller, id: i64) -> Result<(), AppError> {
    caller.scope_for(Operation::ManageUsers)?;
    if id == caller.user_id {
        return Err(AppError::invalid("you cannot delete your own account"));
    }

    let db = state.db()?;
    if !queries::delete_user(&db, id)? {
        return Err(AppError::not_found("user"));
    }
    tracing::info!(user_id = id, deleted_by = caller.user_id, "user deleted");
    Ok(())
}

// ── Departments ──

pub fn list_departments(state: &AppState) -> Result<Vec<Department>, AppError> {
    let db = state.db()?;
    Ok(queries::list_departments(&db)?)
}

pub fn create_department(
    state: &AppState,
    caller: &Caller,
    input: DepartmentInput,
) -> Result<Department, AppError> {
    caller.scope_for(Operation::ManageDepartments)?;
    require_text(&input.name, "name")?;

    let db = state.db()?;
    let id = queries::create_department(&db, &input)
        .map_err(|e| conflict_on_constraint(e, format!("department {} already exists", input.name)))?;
    tracing::info!(department_id = id, name = %input.name, "department created");
    queries::get_department(&db, id)?.ok_or_else(|| AppError::not_found("department"))
}

pub fn update_department(
    state: &AppState,
    caller: &Caller,
    id: i64,
    input: DepartmentInput,
) -> Result<Department, AppError> {
    caller.scope_for(Operation::ManageDepartments)?;
    require_text(&input.name, "name")?;

    let db = state.db()?;
    let updated = queries::update_department(&db, id, &input)
        .map_err(|e| conflict_on_constraint(e, format!("department {} already exists", input.name)))?;
    if !updated {
        return Err(AppError::not_found("department"));
    }
    queries::get_department(&db, id)?.ok_or_else(|| AppError::not_found("department"))
}

pub fn delete_department(state: &AppState, caller: &Caller, id: i64) -> Result<(), AppError> {
    caller.scope_for(Operation::ManageDepartments)?;
    let db = state.db()?;
    if !queries::delete_department(&db, id)? {
        return Err(AppError::not_found("department"));
    }
    tracing::info!(department_id = id, "department deleted");
    Ok(())
}

// ── Patients ──

pub fn create_patient(
    state: &AppState,
    caller: &Caller,
    input: NewPatient,
) -> Result<Patient, AppError> {
    caller.scope_for(Operation::CreatePatient)?;

    let patient = {
        let db = state.db()?;
        load_user_with_role(&db, input.user_id, Role::Patient)?;
        let id = queries::create_patient(&db, &input).map_err(|e| {
            conflict_on_constraint(e, format!("user {} already has a patient profile", input.user_id))
        })?;
        queries::get_patient(&db, id)?.ok_or_else(|| AppError::not_found("patient"))?
    };

    tracing::info!(patient_id = patient.id, created_by = caller.user_id, "patient profile created");
    invalidate(state, ["/patients", "/dashboard"]);
    Ok(patient)
}

/// Staff and admins see everyone; doctors see patients they have appointments with.
pub fn list_patients(
    state: &AppState,
    caller: &Caller,
    limit: Option<i64>,
) -> Result<Vec<Patient>, AppError> {
    let scope = caller.scope_for(Operation::ReadPatient)?;
    let db = state.db()?;

    match (scope, caller.role) {
        (Scope::Any, _) => Ok(queries::list_patients(
            &db,
            limit.unwrap_or(100).clamp(1, MAX_LIST_LIMIT),
        )?),
        (_, Role::Doctor) => Ok(queries::list_patients_for_doctor(&db, caller.own_doctor_id()?)?),
        _ => {
            let own = queries::get_patient(&db, caller.own_patient_id()?)?;
            Ok(own.into_iter().collect())
        }
    }
}

pub fn get_patient(state: &AppState, caller: &Caller, id: i64) -> Result<Patient, AppError> {
    let db = state.db()?;
    let patient = queries::get_patient(&db, id)?.ok_or_else(|| AppError::not_found("patient"))?;
    authorize_patient_access(&db, caller, Operation::ReadPatient, patient.id)?;
    Ok(patient)
}

pub fn update_patient(
    state: &AppState,
    caller: &Caller,
    id: i64,
    update: PatientUpdate,
) -> Result<Patient, AppError> {
    caller.authorize(Operation::UpdatePatient, &Owners::patient(id))?;

    let patient = {
        let db = state.db()?;
        if !queries::update_patient(&db, id, &update)? {
            return Err(AppError::not_found("patient"));
        }
        queries::get_patient(&db, id)?.ok_or_else(|| AppError::not_found("patient"))?
    };

    tracing::info!(patient_id = id, updated_by = caller.user_id, "patient profile updated");
    invalidate(state, [format!("/patients/{id}")]);
    Ok(patient)
}

/// Ownership for patient-scoped data. Doctors own a patient's data once the
/// patient has booked with them.
pub fn authorize_patient_access(
    conn: &Connection,
    caller: &Caller,
    op: Operation,
    patient_id: i64,
) -> Result<(), AppError> {
    if caller.scope_for(op)? == Scope::Own && caller.role == Role::Doctor {
        let doctor_id = caller.own_doctor_id()?;
        if queries::doctor_has_patient(conn, doctor_id, patient_id)? {
            return Ok(());
        }
        tracing::warn!(user_id = caller.user_id, patient_id, ?op, "doctor has no appointment with patient");
        return Err(AppError::forbidden("you do not have access to this resource"));
    }
    caller.authorize(op, &Owners::patient(patient_id))
}

// ── Doctors & staff ──

pub fn list_doctors(
    state: &AppState,
    caller: &Caller,
    department_id: Option<i64>,
) -> Result<Vec<Doctor>, AppError> {
    caller.scope_for(Operation::ListDoctors)?;
    let db = state.db()?;
    Ok(queries::list_doctors(&db, department_id)?)
}

pub fn get_doctor(state: &AppState, caller: &Caller, id: i64) -> Result<Doctor, AppError> {
    caller.scope_for(Operation::ListDoctors)?;
    let db = state.db()?;
    queries::get_doctor(&db, id)?.ok_or_else(|| AppError::not_found("doctor"))
}

pub fn create_doctor(state: &AppState, caller: &Caller, input: NewDoctor) -> Result<Doctor, AppError> {
    caller.scope_for(Operation::ManageProviders)?;
    require_text(&input.specialization, "specialization")?;

    let doctor = {
        let db = state.db()?;
        load_user_with_role(&db, input.user_id, Role::Doctor)?;
        ensure_department(&db, input.department_id)?;
        let id = queries::create_doctor(&db, &input).map_err(|e| {
            conflict_on_constraint(e, format!("user {} already has a doctor profile", input.user_id))
        })?;
        queries::get_doctor(&db, id)?.ok_or_else(|| AppError::not_found("doctor"))?
    };

    tracing::info!(doctor_id = doctor.id, specialization = %doctor.specialization, "doctor profile created");
    invalidate(state, ["/doctors", "/dashboard"]);
    Ok(doctor)
}

pub fn create_staff(
    state: &AppState,
    caller: &Caller,
    input: NewStaffMember,
) -> Result<StaffMember, AppError> {
    caller.scope_for(Operation::ManageProviders)?;
    require_text(&input.position, "position")?;

    let db = state.db()?;
    load_user_with_role(&db, input.user_id, Role::Staff)?;
    ensure_department(&db, input.department_id)?;
    let id = queries::create_staff(&db, &input).map_err(|e| {
        conflict_on_constraint(e, format!("user {} already has a staff profile", input.user_id))
    })?;
    tracing::info!(staff_id = id, position = %input.position, "staff profile created");
    queries::get_staff(&db, id)?.ok_or_else(|| AppError::not_found("staff member"))
}
