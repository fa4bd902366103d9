use crate::config::{LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use sentry::ClientInitGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const METRICS_PREFIX: &str = "megaverse";

#[derive(thiserror::Error, Debug)]
pub enum ObservabilityError {
    #[error("invalid sentry dsn: {0}")]
    InvalidDsn(#[from] sentry::types::ParseDsnError),
    #[error("could not build statsd exporter: {0}")]
    Statsd(String),
    #[error("a metrics recorder is already installed")]
    RecorderInstalled,
}

/// Installs the global tracing subscriber.
///
/// Log level comes from `RUST_LOG` and defaults to `info`. When a sentry DSN
/// is configured, events are also forwarded to sentry; the returned guard
/// must be held for the lifetime of the process.
pub fn init_logging(
    logging: Option<&LoggingConfig>,
) -> Result<Option<ClientInitGuard>, ObservabilityError> {
    let guard = match logging {
        Some(logging) => {
            let dsn = logging.sentry_dsn.parse::<sentry::types::Dsn>()?;
            Some(sentry::init(sentry::ClientOptions {
                dsn: Some(dsn),
                release: sentry::release_name!(),
                ..Default::default()
            }))
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    Ok(guard)
}

/// Installs the statsd exporter as the global metrics recorder.
pub fn init_metrics(metrics_config: &MetricsConfig) -> Result<(), ObservabilityError> {
    let recorder = StatsdBuilder::from(metrics_config.statsd_host.clone(), metrics_config.statsd_port)
        .build(Some(METRICS_PREFIX))
        .map_err(|e| ObservabilityError::Statsd(e.to_string()))?;

    metrics::set_global_recorder(recorder).map_err(|_| ObservabilityError::RecorderInstalled)?;
    shared::metrics_defs::describe_all(megaverse::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %metrics_config.statsd_host,
        port = metrics_config.statsd_port,
        "Metrics exporter installed"
    );
    Ok(())
}
