use std::sync::Arc;

use db_infra::ConnectionDescriptor;
use sea_orm::DatabaseConnection;

/// Application state containing shared resources
#[derive(Debug, Clone)]
pub struct AppState {
    /// The process-wide connection descriptor, built once at startup
    pub descriptor: Arc<ConnectionDescriptor>,
    /// Database connection (absent in tests that never touch the database)
    pub db: Option<DatabaseConnection>,
}

impl AppState {
    pub fn new(descriptor: Arc<ConnectionDescriptor>, db: DatabaseConnection) -> Self {
        Self {
            descriptor,
            db: Some(db),
        }
    }

    pub fn without_db(descriptor: Arc<ConnectionDescriptor>) -> Self {
        Self {
            descriptor,
            db: None,
        }
    }

    pub fn db(&self) -> Option<&DatabaseConnection> {
        self.db.as_ref()
    }
}
