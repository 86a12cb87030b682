pub mod appointments;
pub mod calendar;
pub mod clinical;
pub mod directory;
pub mod events;
pub mod extract;
pub mod feedback;
pub mod health;
pub mod messages;
pub mod reports;
pub mod sessions;

use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::services::identity::bearer_token;

/// Wraps a payload as `{ "success": true, "data": ... }`.
pub fn ok<T: Serialize>(data: T) -> Result<Json<Value>, AppError> {
    let data = serde_json::to_value(data).map_err(anyhow::Error::from)?;
    Ok(Json(json!({ "success": true, "data": data })))
}

/// Operator endpoints authenticate with the configured admin token instead of a session.
pub fn check_admin_token(headers: &HeaderMap, expected: &str) -> Result<(), AppError> {
    match bearer_token(headers) {
        Some(token) if token == expected => Ok(()),
        _ => {
            tracing::warn!("rejected request with bad admin token");
            Err(AppError::Unauthenticated)
        }
    }
}
