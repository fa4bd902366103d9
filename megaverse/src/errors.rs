use crate::retry::MaxAttemptsExceeded;
use crate::types::{BulkOperation, ObjectType, Position};
use http::StatusCode;
use thiserror::Error;

/// The outbound call never produced an HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// A single failed attempt against the map API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream responded {status}: {reason}")]
    Status { status: StatusCode, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("invalid object type: {0:?}")]
    InvalidObjectType(String),

    #[error("{object_type} create requires a {attribute}")]
    MissingAttribute {
        object_type: ObjectType,
        attribute: &'static str,
    },

    #[error("invalid {attribute}: {value:?}")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
    },

    #[error("invalid upstream base url: {0}")]
    InvalidBaseUrl(String),

    #[error("failed to encode payload: {0}")]
    Encode(String),

    #[error("upstream request failed after {attempts} attempt(s): {last_error}")]
    UpstreamFailed {
        attempts: u32,
        last_error: UpstreamError,
    },
}

impl DispatchError {
    /// True for errors raised before any upstream call was made.
    pub fn is_validation(&self) -> bool {
        !matches!(self, DispatchError::UpstreamFailed { .. })
    }
}

impl From<MaxAttemptsExceeded<UpstreamError>> for DispatchError {
    fn from(e: MaxAttemptsExceeded<UpstreamError>) -> Self {
        DispatchError::UpstreamFailed {
            attempts: e.attempts,
            last_error: e.last_error,
        }
    }
}

#[derive(Error, Debug)]
pub enum ResetError {
    #[error("grid size must be between 1 and {max}, got {size}")]
    InvalidGridSize { size: u32, max: u32 },

    #[error("grid reset halted at {position}: {source}")]
    Halted {
        position: Position,
        /// Cells deleted before the failure.
        completed: usize,
        #[source]
        source: DispatchError,
    },
}

#[derive(Error, Debug)]
pub enum BulkError {
    #[error("invalid plan label {label:?} at {position}: {source}")]
    InvalidLabel {
        position: Position,
        label: String,
        #[source]
        source: DispatchError,
    },

    #[error("operation {index} ({} at {}) failed: {source}", .operation.object_type, .operation.position)]
    OperationFailed {
        index: usize,
        operation: BulkOperation,
        /// Operations applied before the failure.
        completed: usize,
        #[source]
        source: DispatchError,
    },
}

impl BulkError {
    pub fn source_error(&self) -> &DispatchError {
        match self {
            BulkError::InvalidLabel { source, .. } => source,
            BulkError::OperationFailed { source, .. } => source,
        }
    }
}
