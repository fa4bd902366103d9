use crate::grid::{DEFAULT_GRID_SIZE, MAX_GRID_SIZE, is_valid_grid_size};
use crate::retry::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Duration;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("upstream base url must use http or https, got {0:?}")]
    UnsupportedScheme(String),

    #[error("candidate id cannot be empty")]
    EmptyCandidateId,

    #[error("retry.max_attempts must be at least 1")]
    InvalidMaxAttempts,

    #[error("grid_size must be between 1 and {max}, got {0}", max = MAX_GRID_SIZE)]
    InvalidGridSize(u32),

    #[error("upstream timeout must be at least 1 second")]
    InvalidTimeout,
}

/// Settings for the core orchestrator.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    pub upstream: UpstreamConfig,
    /// Side length of the square map
    #[serde(default = "default_grid_size")]
    pub grid_size: u32,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.upstream.validate()?;

        if self.retry.max_attempts == 0 {
            return Err(ValidationError::InvalidMaxAttempts);
        }

        if !is_valid_grid_size(self.grid_size) {
            return Err(ValidationError::InvalidGridSize(self.grid_size));
        }

        Ok(())
    }
}

fn default_grid_size() -> u32 {
    DEFAULT_GRID_SIZE
}

/// The map API and the credential attached to every payload.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    pub base_url: Url,
    pub candidate_id: String,
    /// Per-request timeout applied by the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme(
                self.base_url.scheme().to_string(),
            ));
        }

        if self.candidate_id.trim().is_empty() {
            return Err(ValidationError::EmptyCandidateId);
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Delay between consecutive calls of a reset or bulk run.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PacingConfig {
    pub delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig { delay_ms: 1000 }
    }
}

impl PacingConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub first_delay_ms: u64,
    pub subsequent_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            first_delay_ms: 1000,
            subsequent_delay_ms: 3000,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.first_delay_ms),
            Duration::from_millis(config.subsequent_delay_ms),
        )
    }
}
