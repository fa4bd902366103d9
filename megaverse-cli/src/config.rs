use gateway::config::Config as GatewayConfig;
use megaverse::config::{Config as MegaverseConfig, PacingConfig, RetryConfig, UpstreamConfig};
use megaverse::grid::DEFAULT_GRID_SIZE;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use url::Url;

pub const ENV_API_BASE_URL: &str = "API_BASE_URL";
pub const ENV_CANDIDATE_ID: &str = "CANDIDATE_ID";
pub const ENV_PORT: &str = "PORT";
pub const DOTENV_FILE: &str = ".env";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

/// Upstream settings as read from the file. Missing values may still be
/// supplied through the environment.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct UpstreamSection {
    pub base_url: Option<String>,
    pub candidate_id: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub upstream: UpstreamSection,
    pub grid_size: Option<u32>,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(flatten)]
    pub server: GatewayConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Reads the optional config file and applies environment overrides.
    pub fn load<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env(env)?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = env(ENV_API_BASE_URL) {
            self.upstream.base_url = Some(base_url);
        }

        if let Some(candidate_id) = env(ENV_CANDIDATE_ID) {
            self.upstream.candidate_id = Some(candidate_id);
        }

        if let Some(port) = env(ENV_PORT) {
            self.server.listener.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_PORT,
                value: port.clone(),
            })?;
        }

        Ok(())
    }

    /// Builds and validates the core settings.
    pub fn megaverse(&self) -> Result<MegaverseConfig, ConfigError> {
        let base_url = self
            .upstream
            .base_url
            .as_deref()
            .ok_or(ConfigError::Missing {
                setting: "upstream.base_url",
                env: ENV_API_BASE_URL,
            })?;
        let candidate_id = self
            .upstream
            .candidate_id
            .clone()
            .ok_or(ConfigError::Missing {
                setting: "upstream.candidate_id",
                env: ENV_CANDIDATE_ID,
            })?;

        let config = MegaverseConfig {
            upstream: UpstreamConfig {
                base_url: Url::parse(base_url)
                    .map_err(|e| ConfigError::InvalidBaseUrl(format!("{base_url}: {e}")))?,
                candidate_id,
                timeout_secs: self.upstream.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
            grid_size: self.grid_size.unwrap_or(DEFAULT_GRID_SIZE),
            pacing: self.pacing.clone(),
            retry: self.retry.clone(),
        };
        config.validate()?;

        Ok(config)
    }

    /// Builds and validates the listener settings.
    pub fn gateway(&self) -> Result<GatewayConfig, ConfigError> {
        self.server.validate()?;
        Ok(self.server.clone())
    }
}

/// Reads `KEY=value` pairs from a dotenv file. A missing file yields no
/// variables. The process environment is not modified.
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    match dotenvy::from_path_iter(path) {
        Ok(vars) => vars.collect::<Result<_, _>>().map_err(ConfigError::DotEnv),
        Err(e) if e.not_found() => Ok(HashMap::new()),
        Err(e) => Err(ConfigError::DotEnv(e)),
    }
}

/// Variable lookup where the process environment takes precedence over the
/// dotenv file.
pub fn env_with_dotenv<F>(
    process_env: F,
    dotenv: HashMap<String, String>,
) -> impl Fn(&str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    move |name: &str| process_env(name).or_else(|| dotenv.get(name).cloned())
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("missing {setting} (set it in the config file or via {env})")]
    Missing {
        setting: &'static str,
        env: &'static str,
    },
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("invalid upstream base url {0}")]
    InvalidBaseUrl(String),
    #[error("could not read dotenv file: {0}")]
    DotEnv(dotenvy::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] megaverse::config::ValidationError),
    #[error("invalid listener config: {0}")]
    InvalidListener(#[from] gateway::config::ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            upstream:
                base_url: https://challenge.example.com/api/
                candidate_id: abc-123
                timeout_secs: 10
            grid_size: 30
            pacing:
                delay_ms: 250
            retry:
                max_attempts: 5
            listener:
                host: 127.0.0.1
                port: 8080
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                sentry_dsn: https://key@sentry.example.com/1
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::load(Some(tmp.path()), env_from(&[])).expect("load config");

        let megaverse = config.megaverse().expect("megaverse config");
        assert_eq!(megaverse.upstream.candidate_id, "abc-123");
        assert_eq!(megaverse.upstream.timeout_secs, 10);
        assert_eq!(megaverse.grid_size, 30);
        assert_eq!(megaverse.pacing.delay_ms, 250);
        assert_eq!(megaverse.retry.max_attempts, 5);
        assert_eq!(megaverse.retry.first_delay_ms, 1000);

        let gateway = config.gateway().expect("gateway config");
        assert_eq!(gateway.listener.address(), "127.0.0.1:8080");
        assert_eq!(gateway.admin_listener.address(), "127.0.0.1:3001");

        assert_eq!(
            config.common.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125
            })
        );
        assert!(config.common.logging.is_some());
    }

    #[test]
    fn environment_only() {
        let env = env_from(&[
            (ENV_API_BASE_URL, "https://challenge.example.com/api"),
            (ENV_CANDIDATE_ID, "abc-123"),
            (ENV_PORT, "4000"),
        ]);
        let config = Config::load(None, env).expect("load config");

        let megaverse = config.megaverse().expect("megaverse config");
        assert_eq!(megaverse.grid_size, DEFAULT_GRID_SIZE);
        assert_eq!(megaverse.pacing.delay_ms, 1000);
        assert_eq!(megaverse.retry.max_attempts, 3);
        assert_eq!(config.gateway().unwrap().listener.port, 4000);
    }

    #[test]
    fn environment_overrides_file() {
        let yaml = r#"
            upstream:
                base_url: https://file.example.com/api/
                candidate_id: from-file
            "#;
        let tmp = write_tmp_file(yaml);
        let env = env_from(&[(ENV_CANDIDATE_ID, "from-env")]);
        let config = Config::load(Some(tmp.path()), env).expect("load config");

        let megaverse = config.megaverse().unwrap();
        assert_eq!(megaverse.upstream.candidate_id, "from-env");
        assert_eq!(
            megaverse.upstream.base_url.as_str(),
            "https://file.example.com/api/"
        );
    }

    #[test]
    fn missing_settings_are_startup_errors() {
        let config = Config::load(None, env_from(&[])).expect("load config");
        assert!(matches!(
            config.megaverse(),
            Err(ConfigError::Missing {
                env: ENV_API_BASE_URL,
                ..
            })
        ));

        let config = Config::load(
            None,
            env_from(&[(ENV_API_BASE_URL, "https://challenge.example.com/api")]),
        )
        .unwrap();
        assert!(matches!(
            config.megaverse(),
            Err(ConfigError::Missing {
                env: ENV_CANDIDATE_ID,
                ..
            })
        ));
    }

    #[test]
    fn invalid_values() {
        let result = Config::load(None, env_from(&[(ENV_PORT, "http")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnv { name: ENV_PORT, .. })));

        let config = Config::load(
            None,
            env_from(&[(ENV_API_BASE_URL, "not a url"), (ENV_CANDIDATE_ID, "abc")]),
        )
        .unwrap();
        assert!(matches!(config.megaverse(), Err(ConfigError::InvalidBaseUrl(_))));

        let config = Config::load(
            None,
            env_from(&[(ENV_API_BASE_URL, "ftp://example.com/"), (ENV_CANDIDATE_ID, "abc")]),
        )
        .unwrap();
        assert!(matches!(config.megaverse(), Err(ConfigError::Invalid(_))));

        let config = Config::load(None, env_from(&[(ENV_PORT, "0")])).unwrap();
        assert!(matches!(config.gateway(), Err(ConfigError::InvalidListener(_))));
    }

    #[test]
    fn dotenv_file_supplies_missing_variables() {
        let dotenv = write_tmp_file(
            "API_BASE_URL=https://dotenv.example.com/api/\nCANDIDATE_ID=from-dotenv\nPORT=5000\n",
        );
        let vars = read_dotenv(dotenv.path()).expect("read dotenv");
        assert_eq!(vars.len(), 3);

        let env = env_with_dotenv(env_from(&[(ENV_CANDIDATE_ID, "from-env")]), vars);
        let config = Config::load(None, env).expect("load config");

        let megaverse = config.megaverse().unwrap();
        assert_eq!(
            megaverse.upstream.base_url.as_str(),
            "https://dotenv.example.com/api/"
        );
        assert_eq!(megaverse.upstream.candidate_id, "from-env");
        assert_eq!(config.gateway().unwrap().listener.port, 5000);
    }

    #[test]
    fn missing_dotenv_file_is_empty() {
        let vars = read_dotenv(Path::new("/nonexistent/.env")).expect("read dotenv");
        assert!(vars.is_empty());
    }

    #[test]
    fn missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/megaverse.yaml"));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
