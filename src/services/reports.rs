use chrono::{NaiveDate, Utc};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Dashboard, DoctorAppointmentSummary, Role};
use crate::services::identity::Caller;
use crate::services::policy::Operation;
use crate::state::AppState;

const MAX_REPORT_DAYS: i64 = 366;

/// The dashboard for the caller's role, as of `today`.
pub fn dashboard(state: &AppState, caller: &Caller, today: NaiveDate) -> Result<Dashboard, AppError> {
    let db = state.db()?;
    let view = match caller.role {
        Role::Admin | Role::Staff => Dashboard::Clinic(queries::clinic_stats(&db, &today)?),
        Role::Doctor => Dashboard::Doctor(queries::doctor_stats(&db, caller.own_doctor_id()?, &today)?),
        Role::Patient => Dashboard::Patient(queries::patient_stats(
            &db,
            caller.own_patient_id()?,
            caller.user_id,
            &today,
        )?),
    };
    Ok(view)
}

pub fn dashboard_today(state: &AppState, caller: &Caller) -> Result<Dashboard, AppError> {
    dashboard(state, caller, Utc::now().date_naive())
}

/// Per-doctor appointment counts for `[from, to]`.
pub fn appointment_report(
    state: &AppState,
    caller: &Caller,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<DoctorAppointmentSummary>, AppError> {
    caller.scope_for(Operation::ViewClinicReports)?;
    if to < from {
        return Err(AppError::invalid("`to` must not be before `from`"));
    }
    if (to - from).num_days() > MAX_REPORT_DAYS {
        return Err(AppError::invalid(format!(
            "report range is limited to {MAX_REPORT_DAYS} days"
        )));
    }

    let db = state.db()?;
    Ok(queries::appointment_report(&db, &from, &to)?)
}
