pub mod bulk;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod grid;
pub mod metrics_defs;
mod pacing;
pub mod retry;
#[cfg(test)]
mod testutils;
pub mod types;
pub mod upstream;

use crate::bulk::GridPlan;
use crate::config::{Config, ValidationError};
use crate::dispatcher::ObjectDispatcher;
use crate::errors::{BulkError, DispatchError, ResetError};
use crate::retry::RetryPolicy;
use crate::types::{Attributes, BulkOperation, ObjectType, Position, RunSummary};
use crate::upstream::{HttpUpstream, Upstream};
use std::sync::Arc;
use tokio::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum MegaverseError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Entry point used by the HTTP adapter and the CLI.
///
/// Holds the dispatcher plus the configured grid size and pacing delay, which
/// callers may override per run.
#[derive(Clone)]
pub struct Megaverse {
    dispatcher: ObjectDispatcher,
    grid_size: u32,
    delay: Duration,
}

impl Megaverse {
    /// Builds the service against the real map API.
    pub fn new(config: &Config) -> Result<Self, MegaverseError> {
        config.validate()?;
        let upstream = HttpUpstream::new(config.upstream.timeout())?;
        Self::with_upstream(config, Arc::new(upstream))
    }

    pub fn with_upstream(
        config: &Config,
        upstream: Arc<dyn Upstream>,
    ) -> Result<Self, MegaverseError> {
        let dispatcher = ObjectDispatcher::new(
            upstream,
            &config.upstream.base_url,
            &config.upstream.candidate_id,
            RetryPolicy::from(&config.retry),
        )?;

        Ok(Megaverse {
            dispatcher,
            grid_size: config.grid_size,
            delay: config.pacing.delay(),
        })
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub async fn create_object(
        &self,
        object_type: ObjectType,
        position: Position,
        attributes: Attributes,
    ) -> Result<(), DispatchError> {
        self.dispatcher
            .create(object_type, position, attributes)
            .await
    }

    pub async fn delete_object(
        &self,
        object_type: ObjectType,
        position: Position,
    ) -> Result<(), DispatchError> {
        self.dispatcher.delete(object_type, position).await
    }

    pub async fn reset_grid(
        &self,
        grid_size: Option<u32>,
        delay: Option<Duration>,
    ) -> Result<RunSummary, ResetError> {
        grid::reset_grid(
            &self.dispatcher,
            grid_size.unwrap_or(self.grid_size),
            delay.unwrap_or(self.delay),
        )
        .await
    }

    pub async fn run_bulk_operations(
        &self,
        operations: &[BulkOperation],
        delay: Option<Duration>,
    ) -> Result<RunSummary, BulkError> {
        bulk::run_bulk(&self.dispatcher, operations, delay.unwrap_or(self.delay)).await
    }

    pub async fn run_grid_plan(
        &self,
        plan: &GridPlan,
        delay: Option<Duration>,
    ) -> Result<RunSummary, BulkError> {
        bulk::run_plan(&self.dispatcher, plan, delay.unwrap_or(self.delay)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PacingConfig, RetryConfig, UpstreamConfig};
    use crate::testutils::{ScriptedUpstream, assert_near};
    use tokio::time::Instant;
    use url::Url;

    fn config() -> Config {
        Config {
            upstream: UpstreamConfig {
                base_url: Url::parse("https://map.example.com/api/").unwrap(),
                candidate_id: "candidate-1".to_string(),
                timeout_secs: 30,
            },
            grid_size: 3,
            pacing: PacingConfig { delay_ms: 200 },
            retry: RetryConfig::default(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_uses_configured_defaults() {
        let upstream = Arc::new(ScriptedUpstream::new());
        let megaverse = Megaverse::with_upstream(&config(), upstream.clone()).unwrap();
        let start = Instant::now();

        let summary = megaverse.reset_grid(None, None).await.unwrap();

        assert_eq!(summary.applied, 9);
        assert_eq!(upstream.calls().len(), 9);
        assert_near(start.elapsed(), Duration::from_millis(8 * 200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_run_overrides() {
        let upstream = Arc::new(ScriptedUpstream::new());
        let megaverse = Megaverse::with_upstream(&config(), upstream.clone()).unwrap();
        let start = Instant::now();

        megaverse
            .reset_grid(Some(2), Some(Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(upstream.calls().len(), 4);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grid_size_override_is_validated() {
        let upstream = Arc::new(ScriptedUpstream::new());
        let megaverse = Megaverse::with_upstream(&config(), upstream.clone()).unwrap();

        let err = megaverse.reset_grid(Some(0), None).await.unwrap_err();
        assert!(matches!(err, ResetError::InvalidGridSize { size: 0, .. }));

        let err = megaverse
            .reset_grid(Some(u32::MAX), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ResetError::InvalidGridSize { .. }));
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_object_calls() {
        let upstream = Arc::new(ScriptedUpstream::new());
        let megaverse = Megaverse::with_upstream(&config(), upstream.clone()).unwrap();

        // Bounds are not enforced locally for single-object calls
        megaverse
            .create_object(ObjectType::Polyanet, Position::new(40, 2), Attributes::default())
            .await
            .unwrap();
        megaverse
            .delete_object(ObjectType::Polyanet, Position::new(40, 2))
            .await
            .unwrap();

        let calls = upstream.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].field("row"), Some("40"));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = config();
        config.upstream.candidate_id = String::new();
        assert!(matches!(
            Megaverse::new(&config),
            Err(MegaverseError::InvalidConfig(ValidationError::EmptyCandidateId))
        ));
    }
}
