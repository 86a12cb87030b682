use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::handlers::extract::ApiJson;
use crate::handlers::{check_admin_token, ok};
use crate::services::directory;
use crate::services::identity::{authenticate, bearer_token};
use crate::state::AppState;

// POST /api/admin/sessions
#[derive(Deserialize)]
pub struct SessionRequest {
    pub user_id: i64,
}

pub async fn issue_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(body): ApiJson<SessionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    check_admin_token(&headers, &state.config.admin_token)?;
    let session = directory::issue_session(&state, body.user_id)?;
    Ok((StatusCode::CREATED, ok(session)?))
}

// DELETE /api/session
pub async fn revoke_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let token = bearer_token(&headers).ok_or(AppError::Unauthenticated)?;
    directory::revoke_session(&state, token)?;
    tracing::info!(user_id = caller.user_id, "session revoked");
    ok(serde_json::json!({ "revoked": true }))
}

// GET /api/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(directory::me(&state, &caller)?)
}
