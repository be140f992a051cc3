use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RelayError {
    /// A connection id was registered twice. Ids come from a v4 generator, so
    /// this only fires on a programming error.
    #[error("Duplicate connection id: {0}")]
    DuplicateId(Uuid),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Transport failure on connection {0}")]
    TransportFailure(Uuid),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Server error: {0:#}")]
    ServerError(#[from] anyhow::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl RelayError {
    pub fn to_error_code(&self) -> &'static str {
        match self {
            RelayError::DuplicateId(_) => "DUPLICATE_ID",
            RelayError::ProtocolViolation(_) => "PROTOCOL_VIOLATION",
            RelayError::TransportFailure(_) => "TRANSPORT_FAILURE",
            RelayError::InvalidConfig(_) => "INVALID_CONFIG",
            RelayError::HttpError(_) => "HTTP_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.to_error_code().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
