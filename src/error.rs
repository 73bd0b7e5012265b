use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Quota error: {0}")]
    QuotaError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("State violation: {0}")]
    StateViolation(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Session store error: {0}")]
    StoreError(String),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AppError {
    /// Short line shown to the user. Logs the failure at a level matching its kind.
    pub fn user_message(&self) -> String {
        match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                msg.clone()
            }
            AppError::QuotaError(msg) => {
                log::info!("Quota error: {msg}");
                msg.clone()
            }
            AppError::NetworkError(err) => {
                log::error!("Network error: {err}");
                "Network error, please try again".to_string()
            }
            AppError::BackendError(msg) => {
                log::error!("Backend error: {msg}");
                msg.clone()
            }
            AppError::StateViolation(msg) => {
                log::warn!("State violation: {msg}");
                msg.clone()
            }
            AppError::Busy(msg) => {
                log::warn!("Rejected while busy: {msg}");
                "Please wait for the current action to finish".to_string()
            }
            AppError::NotFound(msg) => msg.clone(),
            AppError::PermissionDenied => {
                log::warn!("Permission denied");
                "Permission denied".to_string()
            }
            _ => {
                log::error!("Internal error: {self}");
                "Something went wrong".to_string()
            }
        }
    }

    /// Whether the user may retry the same action unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::NetworkError(_) | AppError::BackendError(_))
    }
}
