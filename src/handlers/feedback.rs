use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::handlers::ok;
use crate::models::{FeedbackStatus, FeedbackUpdate, NewFeedback};
use crate::services::feedback;
use crate::services::identity::authenticate;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct FeedbackQuery {
    pub status: Option<FeedbackStatus>,
    pub limit: Option<i64>,
}

pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<FeedbackQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(feedback::list_feedback(&state, &caller, query.status, query.limit)?)
}

pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<NewFeedback>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let entry = feedback::submit_feedback(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(entry)?))
}

pub async fn get_feedback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(feedback::get_feedback(&state, &caller, id)?)
}

pub async fn update_feedback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<FeedbackUpdate>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(feedback::update_feedback(&state, &caller, id, body)?)
}
