use thiserror::Error;

#[derive(Error, Debug)]
pub enum MurmurError {
    #[error("Network unavailable")]
    NetworkUnavailable,

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Session expired, please sign in again")]
    AuthExpired,

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl MurmurError {
    /// Errors that may clear up on the next scheduled or user-initiated cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MurmurError::Transport(_) | MurmurError::Api { .. } | MurmurError::Decode(_)
        )
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, MurmurError::AuthExpired)
    }
}

pub type Result<T> = std::result::Result<T, MurmurError>;
