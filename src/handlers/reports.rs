use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::handlers::extract::ApiQuery;
use crate::handlers::ok;
use crate::services::identity::authenticate;
use crate::services::reports;
use crate::state::AppState;

// GET /api/reports/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(reports::dashboard_today(&state, &caller)?)
}

// GET /api/reports/appointments?from=&to=
#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

pub async fn appointment_report(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(range): ApiQuery<RangeQuery>,
) -> Result<Json<Value>, AppError> {
    let caller = authenticate(&state, &headers).await?;
    ok(reports::appointment_report(&state, &caller, range.from, range.to)?)
}
