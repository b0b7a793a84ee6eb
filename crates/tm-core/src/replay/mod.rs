//! Replay: lifecycle, tick loop, timing and run accounting.
//!
//! A [`ReplayEngine`] owns one dataset, one server adapter and the handles
//! it creates. It moves through `Unconfigured → Configured → Running →
//! Stopped` and, while running, pushes one dataset row per interval.

pub mod clock;
pub mod engine;
pub mod state;
pub mod summary;

pub use clock::{CancelToken, Clock, SteppingClock, SystemClock, TIMESTAMP_FORMAT};
pub use engine::{ReplayEngine, ReplayError, OBJECT_NAME};
pub use state::{LifecycleEvent, LifecycleState};
pub use summary::{RunSummary, TickReport, WriteFailure};
