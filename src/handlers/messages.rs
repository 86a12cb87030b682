use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::handlers::ok;
use crate::models::NewMessage;
use crate::services::identity::authenticate;
use crate::services::messages;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
}

// GET /api/messages
pub async fn inbox(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<MessagesQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let messages = messages::inbox(&state, &caller, query.limit)?;
    let unread = messages::unread_count(&state, &caller)?;
    ok(json!({ "messages": messages, "unread": unread }))
}

// GET /api/messages/sent
pub async fn sent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<MessagesQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(messages::sent(&state, &caller, query.limit)?)
}

// POST /api/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<NewMessage>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let caller = authenticate(&state, &headers).await?;
    let message = messages::send_message(&state, &caller, body)?;
    Ok((StatusCode::CREATED, ok(message)?))
}

// POST /api/messages/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(messages::mark_read(&state, &caller, id)?)
}
