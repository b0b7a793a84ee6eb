//! Time Machine configuration loading and validation.
//!
//! This crate provides:
//! - The immutable `RunConfig` applied to a replay
//! - Interval parsing (`500ms`, `2s`, `1m`, bare seconds)
//! - Config resolution (CLI → env → config file → defaults)
//! - Semantic validation

pub mod duration;
pub mod resolve;
pub mod run;
pub mod validate;

pub use duration::{format_interval, parse_interval};
pub use resolve::{default_config_path, resolve_config, ConfigFile, ConfigOverrides};
pub use run::{Cadence, Endpoint, RunConfig};
pub use validate::ConfigError;

/// Default interval between ticks, in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Default endpoint the server binds to.
pub const DEFAULT_ENDPOINT: &str = "0.0.0.0:4841";

/// Default advertised server name.
pub const DEFAULT_SERVER_NAME: &str = "OpcUa Time Machine";
