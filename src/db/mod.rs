mod memory;
mod models;
mod postgres;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub type DbPool = Arc<PgPool>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Row store for registrations and certificate settings.
///
/// Settings are plain `key -> value` rows grouped by scope; typing them is
/// the caller's job (see `certificate::LayoutConfig::from_rows`).
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_registration(
        &self,
        form: &RegistrationForm,
    ) -> Result<Registration, StoreError>;

    async fn list_registrations(&self) -> Result<Vec<Registration>, StoreError>;

    async fn get_registration(&self, id: i64) -> Result<Option<Registration>, StoreError>;

    /// Case-insensitive. When an address registered more than once, the most
    /// recent issued registration wins, then the most recent one.
    async fn find_by_email(&self, email: &str) -> Result<Option<Registration>, StoreError>;

    async fn find_by_certificate_id(
        &self,
        certificate_id: &str,
    ) -> Result<Option<Registration>, StoreError>;

    async fn update_registration(
        &self,
        id: i64,
        form: &RegistrationForm,
    ) -> Result<Option<Registration>, StoreError>;

    async fn delete_registration(&self, id: i64) -> Result<bool, StoreError>;

    /// Records an issued certificate. Returns `false` without writing when the
    /// registration is missing or already carries a certificate id.
    async fn record_certificate(
        &self,
        id: i64,
        certificate_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn load_settings(&self, scope: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Replaces every row of `scope` with `entries`.
    async fn save_settings(
        &self,
        scope: &str,
        entries: &[(String, String)],
    ) -> Result<(), StoreError>;
}

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
