pub mod app_config;
pub mod database;

pub mod analytics_repo;
pub mod booking_repo;
pub mod dayclose_repo;
pub mod settings_repo;

pub use database::DbClient;
use servio_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Tenant scoping is non-negotiable: a nil service id on a scoped call is a
/// caller bug and fails loudly instead of matching nothing.
pub(crate) fn require_tenant(service_id: uuid::Uuid) {
    assert!(
        !service_id.is_nil(),
        "service_id must be set on tenant-scoped queries"
    );
}

/// Maps a Postgres unique violation to a domain conflict; everything else
/// stays a database error.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::Core(CoreError::Conflict(message.to_string()))
        }
        _ => StoreError::Db(err),
    }
}
