//! Clinic data store
//!
//! Handlers reach users, services and appointments only through the
//! [`ClinicStore`] trait. [`MemoryStore`] backs tests and local runs;
//! [`PgStore`] talks to PostgreSQL.

mod memory;
pub mod models;
mod postgres;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::DatabaseConfig;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("email '{0}' is already registered")]
    DuplicateEmail(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub type SharedStore = Arc<dyn ClinicStore>;

#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn find_user(&self, id: i32) -> StoreResult<Option<User>>;

    /// Exact, case-sensitive match on the stored email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Fails with [`StoreError::DuplicateEmail`] when the email is taken
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;

    async fn update_user(&self, id: i32, update: UserUpdate) -> StoreResult<Option<User>>;

    async fn find_users(&self, filter: UserFilter) -> StoreResult<Vec<User>>;

    async fn insert_service(&self, service: NewService) -> StoreResult<Service>;

    async fn find_services(&self, filter: ServiceFilter) -> StoreResult<Vec<Service>>;

    async fn insert_appointment(&self, appointment: NewAppointment) -> StoreResult<Appointment>;

    /// Ordered by start time
    async fn find_appointments(&self, filter: AppointmentFilter) -> StoreResult<Vec<Appointment>>;
}

/// Open the store selected by configuration
pub async fn open_store(config: &DatabaseConfig) -> StoreResult<SharedStore> {
    match config.connection_url() {
        Some(url) => {
            let store = PgStore::connect(url).await?;
            store.migrate().await?;
            tracing::info!("Using PostgreSQL store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("No database configured, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
