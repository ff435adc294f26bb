use thiserror::Error;

/// Errors surfaced by the widget and its terminal host
#[derive(Debug, Error)]
pub enum TypistError {
    #[error("required element not found: {0}")]
    MissingElement(&'static str),

    #[error("invalid animation options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, TypistError>;
