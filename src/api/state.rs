//! Shared application state handed to every handler.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::api::ApiError;
use crate::config::AppConfig;
use crate::pipeline::extraction::ReceiptProcessor;
use crate::pipeline::import::UploadStore;
use crate::pipeline::reconcile::BankFeed;

/// Shared state. The SQLite connection sits behind a mutex; handlers take
/// the lock for short synchronous sections and never hold it across awaits.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    db: Arc<Mutex<Connection>>,
    pub processor: Arc<ReceiptProcessor>,
    pub uploads: Arc<UploadStore>,
    pub bank_feed: Arc<dyn BankFeed>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: Connection,
        processor: ReceiptProcessor,
        uploads: UploadStore,
        bank_feed: Arc<dyn BankFeed>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            db: Arc::new(Mutex::new(db)),
            processor: Arc::new(processor),
            uploads: Arc::new(uploads),
            bank_feed,
        }
    }

    /// Lock the database connection for one synchronous repository call.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".into()))
    }
}
