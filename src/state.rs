use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::WorkingHours;
use crate::services::identity::IdentityProvider;
use crate::services::invalidation::Invalidation;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub identity: Box<dyn IdentityProvider>,
    pub hours: WorkingHours,
    pub invalidation_tx: broadcast::Sender<Invalidation>,
}

impl AppState {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        config: AppConfig,
        identity: Box<dyn IdentityProvider>,
    ) -> Self {
        let (invalidation_tx, _) = broadcast::channel(256);
        Self {
            db,
            config,
            identity,
            hours: WorkingHours::default(),
            invalidation_tx,
        }
    }

    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Unknown(anyhow::anyhow!("database lock poisoned")))
    }
}
