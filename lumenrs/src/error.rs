use thiserror::Error;

pub type Result<T> = std::result::Result<T, LumenError>;

#[derive(Debug, Error)]
pub enum LumenError {
    #[error("field reference error: {0}")]
    FieldReference(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid custom dimension: {0}")]
    InvalidCustomDimension(String),
    #[error("parameter error: {0}")]
    Parameter(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("page too large: {0}")]
    PageTooLarge(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LumenError {
    /// Errors caused by the request itself rather than by the server or the model.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            LumenError::FieldReference(_) | LumenError::Forbidden(_) | LumenError::Parameter(_)
        )
    }
}
