//! Configuration errors and semantic validation.

use thiserror::Error;

use crate::run::RunConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("namespace URI must not be empty")]
    EmptyNamespace,

    #[error("server name must not be empty")]
    EmptyServerName,

    #[error("unknown cadence '{0}' (expected fixed-delay or fixed-rate)")]
    UnknownCadence(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl From<ConfigError> for tm_common::Error {
    fn from(err: ConfigError) -> Self {
        tm_common::Error::Config(err.to_string())
    }
}

/// Check the invariants a resolved `RunConfig` must hold.
pub fn validate(config: &RunConfig) -> Result<(), ConfigError> {
    if config.interval.is_zero() {
        return Err(ConfigError::InvalidInterval(
            "interval must be positive".to_string(),
        ));
    }
    if config.namespace_uri.trim().is_empty() {
        return Err(ConfigError::EmptyNamespace);
    }
    if config.server_name.trim().is_empty() {
        return Err(ConfigError::EmptyServerName);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::Endpoint;
    use std::time::Duration;

    fn config() -> RunConfig {
        RunConfig::new(Endpoint::parse("127.0.0.1:4841").unwrap())
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&config()).is_ok());
    }

    #[test]
    fn zero_interval_rejected() {
        let cfg = config().with_interval(Duration::ZERO);
        assert!(matches!(
            validate(&cfg),
            Err(ConfigError::InvalidInterval(_))
        ));
    }

    #[test]
    fn blank_namespace_rejected() {
        let cfg = config().with_namespace_uri("   ");
        assert!(matches!(validate(&cfg), Err(ConfigError::EmptyNamespace)));
    }

    #[test]
    fn converts_into_unified_error() {
        let err: tm_common::Error = ConfigError::EmptyNamespace.into();
        assert_eq!(err.code(), 10);
    }
}
