//! The replay engine: lifecycle, tick loop, and per-tick update.

use std::time::Instant;

use chrono::Utc;
use thiserror::Error;
use tm_common::RunId;
use tm_config::{Cadence, RunConfig};
use tracing::{debug, error, info, trace, warn};

use super::clock::{CancelToken, Clock, SystemClock};
use super::state::{LifecycleEvent, LifecycleState};
use super::summary::{RunSummary, TickReport, WriteFailure};
use crate::binding::VariableBinding;
use crate::server::{
    NamespaceId, ObjectHandle, ProtocolServer, ServerError, ServerHandle, VariableHandle,
};
use crate::source::Dataset;

/// Name of the object node holding every replayed variable.
pub const OBJECT_NAME: &str = "Time Machine";

/// Errors from driving a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: ServerError,
    },

    #[error("failed to register '{node}': {source}")]
    Configuration {
        node: String,
        #[source]
        source: ServerError,
    },

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("server error: {0}")]
    Server(#[from] ServerError),

    #[error("replay interrupted after {ticks} ticks")]
    Interrupted { ticks: usize },
}

impl From<ReplayError> for tm_common::Error {
    fn from(err: ReplayError) -> Self {
        match err {
            ReplayError::Bind { endpoint, source } => tm_common::Error::Bind {
                endpoint,
                reason: source.to_string(),
            },
            err @ ReplayError::Configuration { .. } => {
                tm_common::Error::Configuration(err.to_string())
            }
            ReplayError::InvalidState { operation, state } => tm_common::Error::InvalidState {
                operation,
                state: state.name(),
            },
            ReplayError::Server(e) => tm_common::Error::Server(e.to_string()),
            ReplayError::Interrupted { .. } => tm_common::Error::Interrupted,
        }
    }
}

/// Replays one dataset, once, into one server.
///
/// The engine exclusively owns the dataset, the server adapter and every
/// handle it creates for the lifetime of the run. A finished engine cannot
/// be restarted; build a new one for another replay.
pub struct ReplayEngine<S: ProtocolServer> {
    server: S,
    dataset: Dataset,
    binding: VariableBinding,
    config: RunConfig,
    clock: Box<dyn Clock>,
    state: LifecycleState,
    endpoint: Option<(ServerHandle, NamespaceId)>,
    object: Option<ObjectHandle>,
    variables: Vec<VariableHandle>,
    summary: RunSummary,
}

impl<S: ProtocolServer> ReplayEngine<S> {
    pub fn new(server: S, dataset: Dataset, config: RunConfig) -> Self {
        let binding = VariableBinding::derive(&dataset);
        let summary = RunSummary::new(RunId::new(), dataset.len());
        debug!(variables = ?binding.names(), "variables bound");
        Self {
            server,
            dataset,
            binding,
            config,
            clock: Box::new(SystemClock),
            state: LifecycleState::Unconfigured,
            endpoint: None,
            object: None,
            variables: Vec::new(),
            summary,
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn binding(&self) -> &VariableBinding {
        &self.binding
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// Handle of the created server, once bound.
    pub fn server_handle(&self) -> Option<ServerHandle> {
        self.endpoint.map(|(server, _)| server)
    }

    pub fn namespace(&self) -> Option<NamespaceId> {
        self.endpoint.map(|(_, namespace)| namespace)
    }

    fn transition(&mut self, event: LifecycleEvent) -> bool {
        match self.state.on(event) {
            Some(next) => {
                info!(from = %self.state, to = %next, "lifecycle transition");
                self.state = next;
                true
            }
            None => false,
        }
    }

    /// Create the server and register the namespace. Repeated calls return
    /// the existing handles.
    pub fn bind(&mut self) -> Result<(ServerHandle, NamespaceId), ReplayError> {
        if let Some(endpoint) = self.endpoint {
            return Ok(endpoint);
        }
        if self.state != LifecycleState::Unconfigured {
            return Err(ReplayError::InvalidState {
                operation: "bind",
                state: self.state,
            });
        }

        let server = self
            .server
            .create_server(&self.config.endpoint, &self.config.server_name)
            .map_err(|source| ReplayError::Bind {
                endpoint: self.config.endpoint.to_string(),
                source,
            })?;
        let namespace = self
            .server
            .register_namespace(server, &self.config.namespace_uri)?;

        info!(
            endpoint = %self.config.endpoint,
            namespace_uri = %self.config.namespace_uri,
            %namespace,
            "server bound"
        );
        self.endpoint = Some((server, namespace));
        Ok((server, namespace))
    }

    /// Create the object node and one variable per bound name.
    ///
    /// Binds first if needed. Either every variable is created and the
    /// engine becomes `Configured`, or it stays `Unconfigured`. A retry
    /// after a failure reuses the object and the variables already created,
    /// so the server never holds a second, partial object.
    pub fn configure(&mut self) -> Result<(), ReplayError> {
        if self.state != LifecycleState::Unconfigured {
            return Err(ReplayError::InvalidState {
                operation: "configure",
                state: self.state,
            });
        }
        let (server, namespace) = self.bind()?;

        let object = match self.object {
            Some(object) => object,
            None => {
                let object = self
                    .server
                    .create_object(server, namespace, OBJECT_NAME)
                    .map_err(|source| ReplayError::Configuration {
                        node: OBJECT_NAME.to_string(),
                        source,
                    })?;
                self.object = Some(object);
                object
            }
        };

        if !self.variables.is_empty() {
            debug!(created = self.variables.len(), "resuming variable registration");
        }
        for variable in self.binding.variables().iter().skip(self.variables.len()) {
            match self.server.create_variable(
                object,
                namespace,
                &variable.name,
                variable.initial_value(),
            ) {
                Ok(handle) => self.variables.push(handle),
                Err(source) => {
                    error!(variable = %variable.name, error = %source, "variable registration failed");
                    return Err(ReplayError::Configuration {
                        node: variable.name.clone(),
                        source,
                    });
                }
            }
        }

        self.transition(LifecycleEvent::Configured);
        info!(variables = self.variables.len(), object = OBJECT_NAME, "variables registered");
        Ok(())
    }

    /// Start serving. No-op when already running; ignored (with a warning)
    /// before configuration or after stop.
    pub fn start(&mut self) -> Result<(), ReplayError> {
        match self.state {
            LifecycleState::Configured => {
                if let Some(server) = self.server_handle() {
                    self.server.start(server)?;
                }
                self.transition(LifecycleEvent::Start);
                Ok(())
            }
            LifecycleState::Running => {
                debug!("start ignored: already running");
                Ok(())
            }
            state => {
                warn!(%state, "start ignored");
                Ok(())
            }
        }
    }

    /// Stop serving. No-op unless running. The engine is `Stopped` afterwards
    /// even when the server reports an error while stopping.
    pub fn stop(&mut self) -> Result<(), ReplayError> {
        if self.state != LifecycleState::Running {
            debug!(state = %self.state, "stop ignored: not running");
            return Ok(());
        }
        self.transition(LifecycleEvent::Stop);
        match self.server_handle() {
            Some(server) => self.server.stop(server).map_err(ReplayError::from),
            None => Ok(()),
        }
    }

    /// Push dataset row `index` into the server.
    ///
    /// Silent no-op (returns `None`) unless running, so a stale tick after
    /// `stop` cannot write. A failed write is logged and recorded, and the
    /// remaining variables are still written.
    pub fn update(&mut self, index: usize) -> Option<TickReport> {
        if !self.state.accepts_writes() {
            trace!(index, state = %self.state, "update skipped");
            return None;
        }
        let row = self.dataset.row(index)?;
        let timestamp = self.clock.timestamp();
        let tick = self.binding.tick_row(&timestamp, &row);

        let mut failures = Vec::new();
        for ((variable, handle), value) in self
            .binding
            .variables()
            .iter()
            .zip(&self.variables)
            .zip(tick.values)
        {
            if let Err(err) = self.server.set_value(*handle, value) {
                warn!(row = index, variable = %variable.name, error = %err, "write failed; continuing");
                failures.push(WriteFailure {
                    row: index,
                    variable: variable.name.clone(),
                    reason: err.to_string(),
                });
            }
        }

        let attempted = self.variables.len();
        let report = TickReport {
            row: index,
            timestamp,
            writes_attempted: attempted,
            writes_succeeded: attempted - failures.len(),
            failures,
        };
        debug!(
            row = index,
            timestamp = %report.timestamp,
            failed = report.writes_failed(),
            "tick"
        );
        self.summary.record(&report);
        Some(report)
    }

    /// Replay every row in order, one per interval.
    ///
    /// Requires `Running`. There is no wait after the final row, and the
    /// engine keeps running afterwards; the caller still calls [`stop`].
    /// Cancellation is observed at the wait between ticks, in which case the
    /// engine stops the server and returns [`ReplayError::Interrupted`].
    ///
    /// [`stop`]: Self::stop
    pub fn run(&mut self, cancel: &CancelToken) -> Result<RunSummary, ReplayError> {
        if self.state != LifecycleState::Running {
            return Err(ReplayError::InvalidState {
                operation: "run",
                state: self.state,
            });
        }

        let total = self.dataset.len();
        let interval = self.config.interval;
        let cadence = self.config.cadence;
        self.summary.started_at = Some(Utc::now());
        info!(
            rows = total,
            interval_ms = interval.as_millis() as u64,
            %cadence,
            "replay started"
        );

        let origin = Instant::now();
        for index in 0..total {
            if cancel.is_cancelled() {
                return Err(self.interrupt());
            }
            self.update(index);
            if index + 1 == total {
                break;
            }
            let cancelled = match cadence {
                Cadence::FixedDelay => cancel.wait(interval),
                Cadence::FixedRate => {
                    let ticks = u32::try_from(index + 1).unwrap_or(u32::MAX);
                    cancel.wait_until(origin + interval.saturating_mul(ticks))
                }
            };
            if cancelled {
                return Err(self.interrupt());
            }
        }

        self.summary.finished_at = Some(Utc::now());
        info!(
            ticks = self.summary.ticks_completed,
            writes_failed = self.summary.writes_failed,
            "replay finished"
        );
        Ok(self.summary.clone())
    }

    fn interrupt(&mut self) -> ReplayError {
        let ticks = self.summary.ticks_completed;
        warn!(ticks, "replay interrupted; stopping server");
        self.summary.interrupted = true;
        self.summary.finished_at = Some(Utc::now());
        if let Err(err) = self.stop() {
            error!(error = %err, "failed to stop server after interrupt");
        }
        ReplayError::Interrupted { ticks }
    }
}

impl<S: ProtocolServer> Drop for ReplayEngine<S> {
    fn drop(&mut self) {
        if self.state == LifecycleState::Running {
            warn!("engine dropped while running; stopping server");
            if let Err(err) = self.stop() {
                error!(error = %err, "failed to stop server on drop");
            }
        }
    }
}
