//! Error types for Time Machine.

use thiserror::Error;

/// Result type alias for Time Machine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Time Machine.
///
/// Setup-phase variants (format, dataset, bind, configuration) are fatal and
/// surface before any live serving starts. `Write` is the only recoverable
/// class and is normally reported per variable rather than returned.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Dataset errors (20-29)
    #[error("unsupported input format: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("dataset error: {0}")]
    Dataset(String),

    // Server setup errors (30-39)
    #[error("cannot bind endpoint {endpoint}: {reason}")]
    Bind { endpoint: String, reason: String },

    #[error("variable registration failed: {0}")]
    Configuration(String),

    #[error("server failure: {0}")]
    Server(String),

    // Steady-state errors (40-49)
    #[error("write to variable '{variable}' failed: {reason}")]
    Write { variable: String, reason: String },

    // Lifecycle errors (50-59)
    #[error("replay interrupted")]
    Interrupted,

    #[error("invalid lifecycle state: cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::UnsupportedFormat { .. } => 20,
            Error::Dataset(_) => 21,
            Error::Bind { .. } => 30,
            Error::Configuration(_) => 31,
            Error::Server(_) => 32,
            Error::Write { .. } => 40,
            Error::Interrupted => 50,
            Error::InvalidState { .. } => 51,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Whether the error belongs to the setup phase and halts the run
    /// before any variable is served.
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::UnsupportedFormat { .. }
                | Error::Dataset(_)
                | Error::Bind { .. }
                | Error::Configuration(_)
        )
    }
}
