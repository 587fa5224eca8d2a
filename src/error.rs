use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Custom field not found: {0}")]
    FieldNotFound(String),

    #[error("Custom value not found: {0}")]
    CustomValueNotFound(String),

    #[error("Issue does not exist: {0}")]
    IssueNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// 現在のレコードだけを中断すべきエラーかどうか（インポート全体は続行）
    pub fn is_record_fatal(&self) -> bool {
        matches!(
            self,
            Error::FieldNotFound(_)
                | Error::CustomValueNotFound(_)
                | Error::IssueNotFound(_)
                | Error::ValidationFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
