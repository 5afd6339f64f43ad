use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThothError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ThothError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            ThothError::Config(_) => "CONFIG_ERROR",
            ThothError::Io(_) => "IO_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, ThothError>;
