//! Time Machine core library.
//!
//! Replays a tabular dataset (CSV/TSV or spreadsheet) into a live
//! process-data server, one row per interval, so that clients connected to
//! the server observe the recorded history as if it were happening now.

pub mod binding;
pub mod cli;
pub mod exit_codes;
pub mod logging;
pub mod replay;
pub mod server;
pub mod source;

pub use binding::{VariableBinding, TIME_VARIABLE};
pub use exit_codes::ExitCode;
pub use replay::{CancelToken, LifecycleState, ReplayEngine, ReplayError, RunSummary};
pub use server::{AddressSpaceServer, ProtocolServer, ServerError};
pub use source::{load_dataset, Dataset, SourceError};
