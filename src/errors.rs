use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::Lifecycle;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("{0} not found")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("cannot change status from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::Invalid(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Invalid(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Database(_) | AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the caller. Storage details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Unknown(_) => "an unknown error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

/// Rejects a status change the entity's transition table does not allow.
pub fn ensure_transition<S: Lifecycle>(from: S, to: S) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: from.as_str(),
            to: to.as_str(),
        })
    }
}

/// True when the error chain bottoms out in a UNIQUE/constraint violation.
pub fn is_constraint_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Turns a UNIQUE/constraint violation into Conflict; anything else stays Unknown.
pub fn conflict_on_constraint(err: anyhow::Error, msg: impl Into<String>) -> AppError {
    if is_constraint_violation(&err) {
        AppError::Conflict(msg.into())
    } else {
        AppError::Unknown(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Invalid(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Invalid(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Invalid(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "success": false, "error": self.public_message() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;

    #[test]
    fn test_storage_errors_are_hidden() {
        let err = AppError::Unknown(anyhow::anyhow!("disk I/O error at page 7"));
        assert_eq!(err.public_message(), "an unknown error occurred");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_domain_errors_keep_message() {
        let err = AppError::Conflict("slot taken".to_string());
        assert_eq!(err.public_message(), "slot taken");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = AppError::not_found("appointment");
        assert_eq!(err.public_message(), "appointment not found");
    }

    #[test]
    fn test_ensure_transition() {
        assert!(ensure_transition(AppointmentStatus::Scheduled, AppointmentStatus::Confirmed).is_ok());
        let err = ensure_transition(AppointmentStatus::Completed, AppointmentStatus::Scheduled)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot change status from completed to scheduled");
    }

    #[test]
    fn test_constraint_violation_detection() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err: anyhow::Error = conn
            .execute("INSERT INTO t VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(is_constraint_violation(&err));
        assert!(!is_constraint_violation(&anyhow::anyhow!("other")));
    }
}
