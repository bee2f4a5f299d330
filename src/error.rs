use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypistError {
    /// A run option is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A tuning parameter is out of range.
    #[error("invalid tuning parameter '{name}': {reason}")]
    InvalidTuning { name: &'static str, reason: String },

    /// The requested playback backend cannot be used here.
    #[error("playback backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The input injector failed to deliver an event.
    #[error("injector error: {0}")]
    Injector(String),

    /// Playback was cancelled by the user.
    #[error("aborted")]
    Aborted,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TypistError>;

impl TypistError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn invalid_tuning(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidTuning {
            name,
            reason: reason.into(),
        }
    }

    pub fn injector(message: impl Into<String>) -> Self {
        Self::Injector(message.into())
    }
}
