use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::handlers::ok;
use crate::models::{
    DepartmentInput, NewDoctor, NewPatient, NewStaffMember, NewUser, PatientUpdate, Role,
    UserUpdate,
};
use crate::services::directory;
use crate::services::identity::authenticate;
use crate::state::AppState;

// ── Users ──

#[derive(Deserialize)]
pub struct UsersQuery {
    pub role: Option<Role>,
    pub limit: Option<i64>,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<UsersQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(directory::list_users(&state, &caller, query.role, query.limit)?)
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let user = directory::create_user(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(user)?))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UserUpdate>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(directory::update_user(&state, &caller, id, body)?)
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    directory::delete_user(&state, &caller, id)?;
    ok(serde_json::json!({ "deleted": id }))
}

// ── Departments ──

pub async fn list_departments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    authenticate(&state, &headers).await?;
    ok(directory::list_departments(&state)?)
}

pub async fn create_department(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<DepartmentInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let department = directory::create_department(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(department)?))
}

pub async fn update_department(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<DepartmentInput>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(directory::update_department(&state, &caller, id, body)?)
}

pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    directory::delete_department(&state, &caller, id)?;
    ok(serde_json::json!({ "deleted": id }))
}

// ── Patients ──

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

pub async fn list_patients(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(directory::list_patients(&state, &caller, query.limit)?)
}

pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<NewPatient>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let patient = directory::create_patient(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(patient)?))
}

pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(directory::get_patient(&state, &caller, id)?)
}

pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<PatientUpdate>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(directory::update_patient(&state, &caller, id, body)?)
}

// ── Doctors & staff ──

#[derive(Deserialize)]
pub struct DoctorsQuery {
    pub department_id: Option<i64>,
}

pub async fn list_doctors(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<DoctorsQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(directory::list_doctors(&state, &caller, query.department_id)?)
}

pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(directory::get_doctor(&state, &caller, id)?)
}

pub async fn create_doctor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<NewDoctor>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let doctor = directory::create_doctor(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(doctor)?))
}

pub async fn create_staff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<NewStaffMember>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let staff = directory::create_staff(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(staff)?))
}
