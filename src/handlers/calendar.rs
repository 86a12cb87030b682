use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};

use crate::errors::AppError;
use crate::handlers::extract::ApiPath;
use crate::services::calendar::appointment_ics;
use crate::services::identity::authenticate;
use crate::state::AppState;

// GET /api/appointments/:id/ics
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, AppError> {
    let caller = authenticate(&state, &headers).await?;
    let ics = appointment_ics(&state, &caller, id)?;
    let filename = format!("appointment-{id}.ics");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
