use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::AppError;
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery, OptionalJson};
use crate::handlers::ok;
use crate::models::{AppointmentFilter, NewAppointment};
use crate::services::appointments;
use crate::services::identity::authenticate;
use crate::state::AppState;

// GET /api/appointments
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(appointments::list_appointments(&state, &caller, filter)?)
}

// POST /api/appointments
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<NewAppointment>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let appointment = appointments::create_appointment(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(appointment)?))
}

// GET /api/appointments/:id
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(appointments::get_appointment(&state, &caller, id)?)
}

// PATCH /api/appointments/:id
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<Map<String, Value>>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let update = appointments::parse_update(&caller, body)?;
    ok(appointments::update_appointment(&state, &caller, id, update)?)
}

// POST /api/appointments/:id/cancel
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
    OptionalJson(body): OptionalJson<CancelRequest>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let reason = body.and_then(|b| b.reason);
    ok(appointments::cancel_appointment(&state, &caller, id, reason)?)
}

// GET /api/doctors/:id/slots?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

pub async fn doctor_slots(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(doctor_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(appointments::available_slots(&state, &caller, doctor_id, query.date)?)
}

// GET /api/doctors/:id/conflict?date=YYYY-MM-DD&time=HH:MM
#[derive(Deserialize)]
pub struct ConflictQuery {
    pub date: NaiveDate,
    pub time: String,
}

pub async fn doctor_conflict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(doctor_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ConflictQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let conflict = appointments::has_conflict(&state, &caller, doctor_id, query.date, &query.time)?;
    ok(serde_json::json!({ "conflict": conflict }))
}
