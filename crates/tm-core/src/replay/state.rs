//! Replay lifecycle.
//!
//! ```text
//! Unconfigured ──configure──▶ Configured ──start──▶ Running ──stop──▶ Stopped
//! ```
//!
//! `Stopped` is terminal. The state value is owned by the engine and only
//! changes through the transition helpers below.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a single replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Variables not yet created on the server.
    Unconfigured,
    /// Every variable exists; the server is not serving.
    Configured,
    /// Serving; ticks may push values.
    Running,
    /// Finished. A new engine is required for another replay.
    Stopped,
}

/// Events that drive the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Configured,
    Start,
    Stop,
}

impl LifecycleState {
    pub fn name(self) -> &'static str {
        match self {
            LifecycleState::Unconfigured => "unconfigured",
            LifecycleState::Configured => "configured",
            LifecycleState::Running => "running",
            LifecycleState::Stopped => "stopped",
        }
    }

    /// Next state for `event`, or `None` when the event does not apply.
    pub fn on(self, event: LifecycleEvent) -> Option<LifecycleState> {
        match (self, event) {
            (LifecycleState::Unconfigured, LifecycleEvent::Configured) => {
                Some(LifecycleState::Configured)
            }
            (LifecycleState::Configured, LifecycleEvent::Start) => Some(LifecycleState::Running),
            (LifecycleState::Running, LifecycleEvent::Stop) => Some(LifecycleState::Stopped),
            _ => None,
        }
    }

    /// Whether tick writes are allowed.
    pub fn accepts_writes(self) -> bool {
        self == LifecycleState::Running
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Stopped
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
