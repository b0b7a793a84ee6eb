//! Per-tick reports and the run summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tm_common::RunId;

/// Upper bound on failure records kept in a summary; counts stay exact.
pub const MAX_RECORDED_FAILURES: usize = 1000;

/// A single variable write that failed during a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub row: usize,
    pub variable: String,
    pub reason: String,
}

/// Outcome of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub row: usize,
    pub timestamp: String,
    pub writes_attempted: usize,
    pub writes_succeeded: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<WriteFailure>,
}

impl TickReport {
    pub fn writes_failed(&self) -> usize {
        self.failures.len()
    }
}

/// Summary of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub rows_total: usize,
    pub ticks_completed: usize,
    pub writes_attempted: usize,
    pub writes_failed: usize,
    pub interrupted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub failures: Vec<WriteFailure>,
}

impl RunSummary {
    pub fn new(run_id: RunId, rows_total: usize) -> Self {
        Self {
            run_id,
            rows_total,
            ticks_completed: 0,
            writes_attempted: 0,
            writes_failed: 0,
            interrupted: false,
            started_at: None,
            finished_at: None,
            failures: Vec::new(),
        }
    }

    /// Fold one tick into the totals.
    pub fn record(&mut self, tick: &TickReport) {
        self.ticks_completed += 1;
        self.writes_attempted += tick.writes_attempted;
        self.writes_failed += tick.writes_failed();
        let room = MAX_RECORDED_FAILURES.saturating_sub(self.failures.len());
        self.failures
            .extend(tick.failures.iter().take(room).cloned());
    }

    /// Every row was pushed and no write failed.
    pub fn is_clean(&self) -> bool {
        !self.interrupted && self.writes_failed == 0 && self.ticks_completed == self.rows_total
    }
}
