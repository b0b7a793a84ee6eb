//! Exit codes for the time-machine CLI.
//!
//! Exit codes communicate the outcome of a replay without requiring log
//! parsing. Setup failures map to distinct codes so scripts can tell a bad
//! file from an occupied port.

use tm_common::Error;

use crate::replay::RunSummary;

/// Exit codes for time-machine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every row replayed, every write accepted
    Clean = 0,

    /// Replay finished but some variable writes failed
    WriteFailures = 3,

    /// Operator abort before the last row
    Interrupted = 6,

    /// Invalid configuration (interval, endpoint, config file)
    ConfigError = 10,

    /// Dataset unreadable or in an unsupported format
    DatasetError = 11,

    /// Server could not bind its endpoint
    BindError = 12,

    /// Variable registration failed
    ConfigurationError = 13,

    /// I/O error
    IoError = 14,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean)
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Map a fatal error to its exit code.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::Config(_) => ExitCode::ConfigError,
            Error::UnsupportedFormat { .. } | Error::Dataset(_) => ExitCode::DatasetError,
            Error::Bind { .. } => ExitCode::BindError,
            Error::Configuration(_) => ExitCode::ConfigurationError,
            Error::Write { .. } => ExitCode::WriteFailures,
            Error::Interrupted => ExitCode::Interrupted,
            Error::Io(_) | Error::Json(_) => ExitCode::IoError,
            Error::Server(_) | Error::InvalidState { .. } => ExitCode::InternalError,
        }
    }

    /// Exit code for a replay that ran to completion.
    pub fn from_summary(summary: &RunSummary) -> Self {
        if summary.interrupted {
            ExitCode::Interrupted
        } else if summary.writes_failed > 0 {
            ExitCode::WriteFailures
        } else {
            ExitCode::Clean
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
