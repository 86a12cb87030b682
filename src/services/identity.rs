use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::HeaderMap;
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Role;
use crate::state::AppState;

/// Resolves a bearer token to the signed-in user, if any.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn user_id(&self, token: &str) -> anyhow::Result<Option<i64>>;
}

/// Sessions stored in the `sessions` table.
pub struct DbSessions {
    db: Arc<Mutex<Connection>>,
}

impl DbSessions {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityProvider for DbSessions {
    async fn user_id(&self, token: &str) -> anyhow::Result<Option<i64>> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        queries::session_user(&db, token)
    }
}

/// The signed-in user with their role and linked profile, loaded once per request.
#[derive(Debug, Clone, Serialize)]
pub struct Caller {
    pub user_id: i64,
    pub name: String,
    pub role: Role,
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

impl Caller {
    /// The caller's patient profile id, or NotFound when they have none.
    pub fn own_patient_id(&self) -> Result<i64, AppError> {
        self.patient_id
            .ok_or_else(|| AppError::not_found("patient profile"))
    }

    pub fn own_doctor_id(&self) -> Result<i64, AppError> {
        self.doctor_id
            .ok_or_else(|| AppError::not_found("doctor profile"))
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Maps a user id to a `Caller` by reading the user row and any linked profile.
pub fn resolve_caller(conn: &Connection, user_id: i64) -> Result<Caller, AppError> {
    let user = queries::get_user(conn, user_id)?.ok_or_else(|| AppError::not_found("user"))?;

    let (patient_id, doctor_id) = match user.role {
        Role::Patient => {
            let patient = queries::get_patient_by_user(conn, user.id)?
                .ok_or_else(|| AppError::not_found("patient profile"))?;
            (Some(patient.id), None)
        }
        Role::Doctor => {
            let doctor = queries::get_doctor_by_user(conn, user.id)?
                .ok_or_else(|| AppError::not_found("doctor profile"))?;
            (None, Some(doctor.id))
        }
        Role::Admin | Role::Staff => (None, None),
    };

    Ok(Caller {
        user_id: user.id,
        name: user.name,
        role: user.role,
        patient_id,
        doctor_id,
    })
}

pub async fn authenticate_token(state: &AppState, token: &str) -> Result<Caller, AppError> {
    let user_id = state
        .identity
        .user_id(token)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    let db = state.db()?;
    resolve_caller(&db, user_id)
}

pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Caller, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthenticated)?;
    authenticate_token(state, token).await
}
