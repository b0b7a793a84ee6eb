//! Tick timestamps and the interruptible inter-tick wait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};

/// Format of the synthesized `Time` value (second resolution).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of wall-clock timestamps for ticks.
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;

    /// `now()` rendered with [`TIMESTAMP_FORMAT`].
    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Deterministic clock that advances by `step` on every reading.
#[derive(Debug)]
pub struct SteppingClock {
    start: NaiveDateTime,
    step: chrono::Duration,
    readings: AtomicU64,
}

impl SteppingClock {
    pub fn new(start: NaiveDateTime, step: chrono::Duration) -> Self {
        Self {
            start,
            step,
            readings: AtomicU64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    /// Saturates at `NaiveDateTime::MAX` instead of overflowing.
    fn now(&self) -> NaiveDateTime {
        let n = self.readings.fetch_add(1, Ordering::SeqCst);
        let n = i32::try_from(n).unwrap_or(i32::MAX);
        self.step
            .checked_mul(n)
            .and_then(|offset| self.start.checked_add_signed(offset))
            .unwrap_or(NaiveDateTime::MAX)
    }
}

/// Cloneable abort signal observed at the sleep boundary between ticks.
///
/// `wait` blocks for at most the given duration and returns early as soon
/// as [`cancel`](Self::cancel) is called from any clone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, signal) = &*self.inner;
        *flag.lock().unwrap_or_else(|p| p.into_inner()) = true;
        signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Sleep for `duration` unless cancelled first.
    /// Returns `true` when the wait ended because of cancellation.
    pub fn wait(&self, duration: Duration) -> bool {
        self.wait_until(Instant::now() + duration)
    }

    /// Sleep until `deadline` unless cancelled first.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let (flag, signal) = &*self.inner;
        let mut cancelled = flag.lock().unwrap_or_else(|p| p.into_inner());
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = signal
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(|p| p.into_inner());
            cancelled = guard;
        }
        *cancelled
    }
}
