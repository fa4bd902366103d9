use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use megaverse::errors::{BulkError, DispatchError, ResetError, UpstreamError};
use megaverse::types::Position;
use serde::Serialize;
use shared::http::make_json_response;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("no route for {0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Reset(#[from] ResetError),

    #[error(transparent)]
    Bulk(#[from] BulkError),
}

#[derive(Debug, Default, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
}

/// Status and message for a failed dispatch.
///
/// Upstream statuses pass through with their reason text. Transport
/// failures surface as a bare 500.
fn dispatch_status(error: &DispatchError) -> (StatusCode, String, Option<u32>) {
    match error {
        DispatchError::UpstreamFailed {
            attempts,
            last_error: UpstreamError::Status { status, reason },
        } => (*status, reason.clone(), Some(*attempts)),
        DispatchError::UpstreamFailed { attempts, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            internal_reason(),
            Some(*attempts),
        ),
        DispatchError::InvalidBaseUrl(_) | DispatchError::Encode(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            internal_reason(),
            None,
        ),
        other => (StatusCode::BAD_REQUEST, other.to_string(), None),
    }
}

fn internal_reason() -> String {
    StatusCode::INTERNAL_SERVER_ERROR
        .canonical_reason()
        .unwrap_or("Internal Server Error")
        .to_string()
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::RequestBody(_) | GatewayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Dispatch(e) => dispatch_status(e).0,
            GatewayError::Reset(ResetError::InvalidGridSize { .. }) => StatusCode::BAD_REQUEST,
            GatewayError::Reset(ResetError::Halted { source, .. }) => dispatch_status(source).0,
            GatewayError::Bulk(e) => dispatch_status(e.source_error()).0,
        }
    }

    pub fn into_response<E>(self) -> Response<BoxBody<Bytes, E>> {
        let (status, body) = match &self {
            GatewayError::Dispatch(e) => {
                let (status, error, attempts) = dispatch_status(e);
                let body = ErrorBody {
                    error,
                    attempts,
                    ..Default::default()
                };
                (status, body)
            }
            GatewayError::Reset(ResetError::Halted {
                position,
                completed,
                source,
            }) => {
                let (status, error, attempts) = dispatch_status(source);
                let body = ErrorBody {
                    error,
                    position: Some(*position),
                    completed: Some(*completed),
                    attempts,
                    ..Default::default()
                };
                (status, body)
            }
            GatewayError::Bulk(BulkError::InvalidLabel { position, .. }) => {
                let body = ErrorBody {
                    error: self.to_string(),
                    position: Some(*position),
                    ..Default::default()
                };
                (StatusCode::BAD_REQUEST, body)
            }
            GatewayError::Bulk(BulkError::OperationFailed {
                index,
                operation,
                completed,
                source,
            }) => {
                let (status, error, attempts) = dispatch_status(source);
                let error = if status == StatusCode::BAD_REQUEST {
                    self.to_string()
                } else {
                    error
                };
                let body = ErrorBody {
                    error,
                    index: Some(*index),
                    position: Some(operation.position),
                    completed: Some(*completed),
                    attempts,
                };
                (status, body)
            }
            GatewayError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: internal_reason(),
                    ..Default::default()
                },
            ),
            other => (
                other.status(),
                ErrorBody {
                    error: other.to_string(),
                    ..Default::default()
                },
            ),
        };

        make_json_response(status, &body)
    }
}
