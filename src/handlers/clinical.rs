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
    LabResultUpdate, MedicationStatus, MedicationStatusUpdate, NewLabResult, NewMedicalRecord,
    NewMedication,
};
use crate::services::clinical;
use crate::services::identity::authenticate;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ClinicalQuery {
    pub patient_id: Option<i64>,
    pub limit: Option<i64>,
}

// ── Medical Records ──

pub async fn list_records(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ClinicalQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(clinical::list_records(&state, &caller, query.patient_id, query.limit)?)
}

pub async fn create_record(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<NewMedicalRecord>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let record = clinical::create_record(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(record)?))
}

pub async fn get_record(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(clinical::get_record(&state, &caller, id)?)
}

// ── Medications ──

#[derive(Deserialize)]
pub struct MedicationsQuery {
    pub patient_id: Option<i64>,
    pub status: Option<MedicationStatus>,
    pub limit: Option<i64>,
}

pub async fn list_medications(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<MedicationsQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(clinical::list_medications(
        &state,
        &caller,
        query.patient_id,
        query.status,
        query.limit,
    )?)
}

pub async fn prescribe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<NewMedication>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let medication = clinical::prescribe(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(medication)?))
}

// PATCH /api/medications/:id/status
pub async fn update_medication_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<MedicationStatusUpdate>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(clinical::update_medication_status(&state, &caller, id, body)?)
}

// ── Lab Results ──

pub async fn list_lab_results(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<ClinicalQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(clinical::list_lab_results(&state, &caller, query.patient_id, query.limit)?)
}

pub async fn order_lab(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<NewLabResult>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let lab = clinical::order_lab(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(lab)?))
}

pub async fn update_lab_result(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<LabResultUpdate>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(clinical::update_lab_result(&state, &caller, id, body)?)
}
