//! Error types for vidq

use thiserror::Error;

/// Main error type for vidq operations
#[derive(Debug, Error)]
pub enum VidqError {
    #[error("{0}")]
    EmptyInput(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No suitable format found")]
    NoFormatFound,

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Nothing to enqueue, look up a video first")]
    NoPreview,

    #[error("A submission is already in progress")]
    SubmitInProgress,

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task {0} is not finished yet")]
    TaskNotReady(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("No search result #{0}")]
    NoSuchResult(usize),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl VidqError {
    /// Check if error came from bad user input (nothing was sent)
    pub fn is_user_input(&self) -> bool {
        matches!(
            self,
            VidqError::EmptyInput(_)
                | VidqError::InvalidUrl(_)
                | VidqError::UnknownFormat(_)
                | VidqError::NoPreview
                | VidqError::UnknownTask(_)
                | VidqError::TaskNotReady(_)
                | VidqError::NoSuchResult(_)
                | VidqError::UnknownCommand(_)
        )
    }

    /// Check if error came from the network or the server
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            VidqError::RequestFailed(_) | VidqError::Status { .. } | VidqError::Server(_)
        )
    }
}
