use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener cannot share {0}")]
    SharedAddress(String),
}

/// HTTP front end configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for incoming API requests
    #[serde(default)]
    pub listener: Listener,
    /// Admin listener for health and readiness checks
    #[serde(default = "Listener::admin_default")]
    pub admin_listener: Listener,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::default(),
            admin_listener: Listener::admin_default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::SharedAddress(self.listener.address()));
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

impl Listener {
    fn admin_default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3001,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
listener:
    host: "0.0.0.0"
    port: 8080
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.listener.address(), "0.0.0.0:8080");
        assert_eq!(config.admin_listener.address(), "127.0.0.1:3001");
    }

    #[test]
    fn test_validation_errors() {
        let mut config = Config::default();
        config.listener.port = 0;
        assert_eq!(config.validate().unwrap_err(), ValidationError::InvalidPort);

        let mut config = Config::default();
        config.admin_listener = config.listener.clone();
        assert!(matches!(
            config.validate().unwrap_err(),
            ValidationError::SharedAddress(_)
        ));
    }
}
