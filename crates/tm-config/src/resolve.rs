//! Config resolution: CLI → env → config file → defaults.
//!
//! Environment variables are folded into [`ConfigOverrides`] by the CLI
//! layer, so this module only merges overrides over an optional TOML file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::duration::parse_interval;
use crate::run::{Cadence, Endpoint, RunConfig};
use crate::validate::{validate, ConfigError};
use crate::DEFAULT_ENDPOINT;

/// On-disk configuration file. Every field is optional.
///
/// ```toml
/// interval = "2s"
/// endpoint = "0.0.0.0:4841"
/// namespace_uri = "http://plant.example/time-machine"
/// cadence = "fixed-delay"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub interval: Option<String>,

    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub namespace_uri: Option<String>,

    #[serde(default)]
    pub cadence: Option<Cadence>,

    #[serde(default)]
    pub server_name: Option<String>,
}

impl ConfigFile {
    /// Load and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub interval: Option<String>,
    pub endpoint: Option<String>,
    pub namespace_uri: Option<String>,
    pub cadence: Option<Cadence>,
    pub server_name: Option<String>,
    /// Explicit config file. A missing explicit file is an error; the
    /// default location is only read when it exists.
    pub config_path: Option<PathBuf>,
}

/// Default config location: `$XDG_CONFIG_HOME/time_machine/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("time_machine").join("config.toml"))
}

/// Resolve the effective `RunConfig`.
pub fn resolve_config(overrides: &ConfigOverrides) -> Result<RunConfig, ConfigError> {
    let file = match &overrides.config_path {
        Some(path) => {
            debug!(path = %path.display(), "loading explicit config file");
            ConfigFile::load(path)?
        }
        None => match default_config_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading default config file");
                ConfigFile::load(&path)?
            }
            _ => ConfigFile::default(),
        },
    };
    merge(overrides, &file)
}

/// Merge overrides over a parsed file and fill remaining gaps with defaults.
pub fn merge(overrides: &ConfigOverrides, file: &ConfigFile) -> Result<RunConfig, ConfigError> {
    let endpoint = overrides
        .endpoint
        .as_deref()
        .or(file.endpoint.as_deref())
        .unwrap_or(DEFAULT_ENDPOINT);
    let mut config = RunConfig::new(Endpoint::parse(endpoint)?);

    if let Some(interval) = overrides.interval.as_deref().or(file.interval.as_deref()) {
        config = config.with_interval(parse_interval(interval)?);
    }
    if let Some(uri) = overrides
        .namespace_uri
        .as_deref()
        .or(file.namespace_uri.as_deref())
    {
        config = config.with_namespace_uri(uri);
    }
    if let Some(cadence) = overrides.cadence.or(file.cadence) {
        config = config.with_cadence(cadence);
    }
    if let Some(name) = overrides
        .server_name
        .as_deref()
        .or(file.server_name.as_deref())
    {
        config = config.with_server_name(name);
    }

    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_when_nothing_given() {
        let config = merge(&ConfigOverrides::default(), &ConfigFile::default()).unwrap();
        assert_eq!(config.endpoint.to_string(), "0.0.0.0:4841");
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.namespace_uri, "http://0.0.0.0:4841");
    }

    #[test]
    fn overrides_beat_file() {
        let file = ConfigFile {
            interval: Some("10s".into()),
            endpoint: Some("127.0.0.1:5000".into()),
            cadence: Some(Cadence::FixedRate),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            interval: Some("2s".into()),
            ..Default::default()
        };
        let config = merge(&overrides, &file).unwrap();
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.endpoint.port(), 5000);
        assert_eq!(config.cadence, Cadence::FixedRate);
    }

    #[test]
    fn namespace_follows_resolved_endpoint() {
        let overrides = ConfigOverrides {
            endpoint: Some("10.0.0.5:4841".into()),
            ..Default::default()
        };
        let config = merge(&overrides, &ConfigFile::default()).unwrap();
        assert_eq!(config.namespace_uri, "http://10.0.0.5:4841");
    }

    #[test]
    fn invalid_values_surface_as_config_errors() {
        let overrides = ConfigOverrides {
            interval: Some("0s".into()),
            ..Default::default()
        };
        assert!(merge(&overrides, &ConfigFile::default()).is_err());

        let overrides = ConfigOverrides {
            endpoint: Some("no-port".into()),
            ..Default::default()
        };
        assert!(matches!(
            merge(&overrides, &ConfigFile::default()),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn loads_toml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "interval = \"500ms\"\nendpoint = \"127.0.0.1:4841\"\ncadence = \"fixed-rate\""
        )
        .unwrap();

        let overrides = ConfigOverrides {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = resolve_config(&overrides).unwrap();
        assert_eq!(config.interval, Duration::from_millis(500));
        assert_eq!(config.cadence, Cadence::FixedRate);
    }

    #[test]
    fn unknown_keys_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "intervall = \"5s\"").unwrap();
        assert!(matches!(
            ConfigFile::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let overrides = ConfigOverrides {
            config_path: Some(PathBuf::from("/nonexistent/time_machine.toml")),
            ..Default::default()
        };
        assert!(matches!(
            resolve_config(&overrides),
            Err(ConfigError::Read { .. })
        ));
    }
}
