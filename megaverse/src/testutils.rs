use crate::errors::TransportError;
use crate::upstream::{Upstream, UpstreamRequest, UpstreamResponse};
use async_trait::async_trait;
use http::{Method, StatusCode};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Asserts that a duration measured on the paused test clock matches
/// `expected` up to timer granularity.
pub fn assert_near(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual <= expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub request: UpstreamRequest,
    pub at: Duration,
}

impl RecordedCall {
    pub fn method(&self) -> &Method {
        &self.request.method
    }

    pub fn path(&self) -> &str {
        self.request.url.path()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.request.body.get(name).and_then(|v| v.as_str())
    }
}

/// In-memory upstream that answers from a script and records every call.
/// Once the script runs out every call succeeds with 200.
pub struct ScriptedUpstream {
    start: Instant,
    script: Mutex<VecDeque<Result<StatusCode, TransportError>>>,
    fail_when: Mutex<Option<Box<dyn Fn(&UpstreamRequest) -> bool + Send>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        ScriptedUpstream {
            start: Instant::now(),
            script: Mutex::new(VecDeque::new()),
            fail_when: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_script(script: Vec<Result<StatusCode, TransportError>>) -> Self {
        let upstream = ScriptedUpstream::new();
        *upstream.script.lock().unwrap() = script.into();
        upstream
    }

    /// Every request matching `predicate` is answered with a 500.
    pub fn failing_when<F>(predicate: F) -> Self
    where
        F: Fn(&UpstreamRequest) -> bool + Send + 'static,
    {
        let upstream = ScriptedUpstream::new();
        *upstream.fail_when.lock().unwrap() = Some(Box::new(predicate));
        upstream
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for ScriptedUpstream {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.clone(),
            at: self.start.elapsed(),
        });

        if let Some(predicate) = self.fail_when.lock().unwrap().as_ref()
            && predicate(request)
        {
            return Ok(UpstreamResponse::new(StatusCode::INTERNAL_SERVER_ERROR));
        }

        match self.script.lock().unwrap().pop_front() {
            Some(Ok(status)) => Ok(UpstreamResponse::new(status)),
            Some(Err(e)) => Err(e),
            None => Ok(UpstreamResponse::new(StatusCode::OK)),
        }
    }
}
