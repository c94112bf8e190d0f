pub mod close;
pub mod completion;
pub mod period;
pub mod report;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal service error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<servio_domain::settings::SettingsError> for CoreError {
    fn from(err: servio_domain::settings::SettingsError) -> Self {
        CoreError::Validation(err.to_string())
    }
}
