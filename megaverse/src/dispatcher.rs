use crate::errors::{DispatchError, UpstreamError};
use crate::metrics_defs::{UPSTREAM_REQUEST_DURATION, UPSTREAM_REQUESTS, UPSTREAM_RETRIES};
use crate::retry::RetryPolicy;
use crate::types::{
    AstralObjectPayload, Attributes, BulkOperation, ObjectType, OperationKind, Position,
};
use crate::upstream::{Upstream, UpstreamRequest};
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, Method};
use shared::{counter, histogram};
use std::sync::Arc;
use tokio::time::Instant;
use url::Url;

/// Turns typed create/delete requests into upstream calls.
///
/// Validation happens before any network activity; only the HTTP exchange
/// itself is wrapped in the retry policy.
#[derive(Clone)]
pub struct ObjectDispatcher {
    upstream: Arc<dyn Upstream>,
    base_url: Url,
    candidate_id: Arc<str>,
    retry: RetryPolicy,
}

impl ObjectDispatcher {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        base_url: &Url,
        candidate_id: &str,
        retry: RetryPolicy,
    ) -> Result<Self, DispatchError> {
        if base_url.cannot_be_a_base() {
            return Err(DispatchError::InvalidBaseUrl(base_url.to_string()));
        }

        // Url::join replaces the last path segment unless the path ends in '/'
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(ObjectDispatcher {
            upstream,
            base_url,
            candidate_id: candidate_id.into(),
            retry,
        })
    }

    pub async fn create(
        &self,
        object_type: ObjectType,
        position: Position,
        attributes: Attributes,
    ) -> Result<(), DispatchError> {
        self.execute(BulkOperation::create(object_type, position, attributes))
            .await
    }

    pub async fn delete(
        &self,
        object_type: ObjectType,
        position: Position,
    ) -> Result<(), DispatchError> {
        self.execute(BulkOperation::delete(object_type, position))
            .await
    }

    pub async fn execute(&self, operation: BulkOperation) -> Result<(), DispatchError> {
        let request = self.prepare(&operation)?;
        self.send(&operation, &request).await
    }

    /// Validates `operation` and builds the request that would be sent for it.
    pub fn prepare(&self, operation: &BulkOperation) -> Result<UpstreamRequest, DispatchError> {
        let BulkOperation {
            kind,
            object_type,
            position,
            attributes,
        } = *operation;

        let (method, color, direction) = match (kind, object_type) {
            (OperationKind::Delete, _) => (Method::DELETE, None, None),
            (OperationKind::Create, ObjectType::Polyanet) => (Method::POST, None, None),
            (OperationKind::Create, ObjectType::Soloon) => {
                let color = attributes.color.ok_or(DispatchError::MissingAttribute {
                    object_type,
                    attribute: "color",
                })?;
                (Method::POST, Some(color), None)
            }
            (OperationKind::Create, ObjectType::Cometh) => {
                let direction = attributes
                    .direction
                    .ok_or(DispatchError::MissingAttribute {
                        object_type,
                        attribute: "direction",
                    })?;
                (Method::POST, None, Some(direction))
            }
        };

        let payload = AstralObjectPayload {
            row: position.row.to_string(),
            column: position.column.to_string(),
            candidate_id: &self.candidate_id,
            color,
            direction,
        };

        let url = self
            .base_url
            .join(object_type.as_path())
            .map_err(|e| DispatchError::InvalidBaseUrl(e.to_string()))?;

        let body =
            serde_json::to_value(&payload).map_err(|e| DispatchError::Encode(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(UpstreamRequest {
            method,
            url,
            headers,
            body,
        })
    }

    async fn send(
        &self,
        operation: &BulkOperation,
        request: &UpstreamRequest,
    ) -> Result<(), DispatchError> {
        let object_type = operation.object_type.as_path();
        let method = request.method.as_str().to_owned();

        self.retry
            .retry(|attempt| {
                let method = method.clone();
                async move {
                    if attempt > 1 {
                        counter!(UPSTREAM_RETRIES, "object_type" => object_type).increment(1);
                    }

                    tracing::debug!(
                        attempt,
                        %method,
                        object_type,
                        position = %operation.position,
                        "Sending upstream request"
                    );

                    let started = Instant::now();
                    let result = self.upstream.send(request).await;
                    histogram!(UPSTREAM_REQUEST_DURATION, "object_type" => object_type)
                        .record(started.elapsed().as_secs_f64());

                    let outcome = match &result {
                        Ok(response) if response.is_ok() => "ok",
                        Ok(_) => "status",
                        Err(_) => "transport",
                    };
                    counter!(
                        UPSTREAM_REQUESTS,
                        "object_type" => object_type,
                        "method" => method,
                        "outcome" => outcome
                    )
                    .increment(1);

                    match result {
                        Ok(response) if response.is_ok() => Ok(()),
                        Ok(response) => Err(UpstreamError::Status {
                            status: response.status,
                            reason: response.reason,
                        }),
                        Err(e) => Err(UpstreamError::Transport(e)),
                    }
                }
            })
            .await?;

        Ok(())
    }
}
