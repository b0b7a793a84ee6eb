//! The run configuration applied to a single replay.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::validate::ConfigError;
use crate::{DEFAULT_INTERVAL_SECS, DEFAULT_SERVER_NAME};

/// A `host:port` network address the server binds to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Parse `host:port`. IPv6 hosts must be bracketed (`[::1]:4841`).
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidEndpoint {
            endpoint: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let (host, port) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;

        if host.is_empty() || host == "[]" {
            return Err(invalid("missing host"));
        }
        if host.contains(':') && !(host.starts_with('[') && host.ends_with(']')) {
            return Err(invalid("IPv6 hosts must be bracketed"));
        }
        let port: u16 = port.parse().map_err(|_| invalid("port is not a number"))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Namespace URI advertised for this endpoint when none is configured.
    pub fn default_namespace_uri(&self) -> String {
        format!("http://{}", self)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::parse(s)
    }
}

/// How the wait between ticks is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cadence {
    /// Wait a full interval after each tick's writes finish. Processing time
    /// accumulates as drift.
    #[default]
    FixedDelay,
    /// Schedule tick k at `start + k * interval`, absorbing processing time.
    FixedRate,
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::FixedDelay => write!(f, "fixed-delay"),
            Cadence::FixedRate => write!(f, "fixed-rate"),
        }
    }
}

impl FromStr for Cadence {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed-delay" | "delay" => Ok(Cadence::FixedDelay),
            "fixed-rate" | "rate" => Ok(Cadence::FixedRate),
            other => Err(ConfigError::UnknownCadence(other.to_string())),
        }
    }
}

/// Parameters of one replay. Immutable once handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub interval: Duration,
    pub endpoint: Endpoint,
    pub namespace_uri: String,
    pub cadence: Cadence,
    pub server_name: String,
}

impl RunConfig {
    /// Defaults for everything but the endpoint.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            namespace_uri: endpoint.default_namespace_uri(),
            endpoint,
            cadence: Cadence::default(),
            server_name: DEFAULT_SERVER_NAME.to_string(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_namespace_uri(mut self, uri: impl Into<String>) -> Self {
        self.namespace_uri = uri.into();
        self
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }
}
