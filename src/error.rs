use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParleyError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
    #[error("{0}")]
    Validation(String),
    #[error("No messages to save")]
    EmptyTranscript,
    #[error("could not create archive directory: {0}")]
    Directory(String),
    #[error("could not write archive: {0}")]
    Write(String),
}

impl ParleyError {
    /// Status code used when the error escapes an HTTP handler.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::EmptyTranscript => StatusCode::BAD_REQUEST,
            Self::Http(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_)
            | Self::Serialization(_)
            | Self::Runtime(_)
            | Self::Directory(_)
            | Self::Write(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub use crate::Result;
