//! Command-line front end: argument parsing and the end-to-end run flow.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use tm_common::Error;
use tm_config::{resolve_config, Cadence, ConfigOverrides};
use tracing::{error, info, warn};

use crate::exit_codes::ExitCode;
use crate::logging::{init_logging, LogFormat};
use crate::replay::{CancelToken, ReplayEngine, ReplayError, RunSummary};
use crate::server::AddressSpaceServer;
use crate::source::load_dataset;

/// Replay a recorded dataset into a live process-data server.
#[derive(Parser, Debug)]
#[command(name = "time-machine", version, about)]
pub struct Cli {
    /// Dataset to replay (.csv, .tsv, .xls, .xlsx)
    #[arg(value_name = "DATA")]
    pub dataset: PathBuf,

    /// Time between ticks (e.g. 500ms, 2s, 1m; bare numbers are seconds)
    #[arg(short, long, env = "TIME_MACHINE_INTERVAL")]
    pub interval: Option<String>,

    /// Endpoint to bind, as host:port
    #[arg(short, long, env = "TIME_MACHINE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Namespace URI for the replayed nodes
    #[arg(long, env = "TIME_MACHINE_NAMESPACE")]
    pub namespace: Option<String>,

    /// Tick scheduling (fixed-delay, fixed-rate)
    #[arg(long, env = "TIME_MACHINE_CADENCE")]
    pub cadence: Option<Cadence>,

    /// Advertised server name
    #[arg(long, env = "TIME_MACHINE_SERVER_NAME")]
    pub server_name: Option<String>,

    /// Config file (TOML)
    #[arg(short, long, env = "TIME_MACHINE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the run summary as JSON to this path
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "TIME_MACHINE_LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Cli {
    /// Configuration values given on the command line or environment.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            interval: self.interval.clone(),
            endpoint: self.endpoint.clone(),
            namespace_uri: self.namespace.clone(),
            cadence: self.cadence,
            server_name: self.server_name.clone(),
            config_path: self.config.clone(),
        }
    }
}

/// Run the CLI to completion and report the process exit code.
pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose, cli.log_format);
    match execute(&cli) {
        Ok(summary) => {
            let code = ExitCode::from_summary(&summary);
            info!(
                run_id = %summary.run_id,
                ticks = summary.ticks_completed,
                writes_failed = summary.writes_failed,
                exit_code = code.as_i32(),
                "done"
            );
            code
        }
        Err(err) => {
            error!(code = err.code(), error = %err, "time machine failed");
            ExitCode::from_error(&err)
        }
    }
}

fn execute(cli: &Cli) -> Result<RunSummary, Error> {
    // Format and content errors surface before the endpoint is touched.
    let dataset = load_dataset(&cli.dataset)?;
    let config = resolve_config(&cli.overrides())?;

    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel);

    let server = AddressSpaceServer::new();
    let reader = server.reader();
    let mut engine = ReplayEngine::new(server, dataset, config);

    engine.configure()?;
    engine.start()?;
    if let Some(url) = engine.server_handle().and_then(|h| reader.endpoint_url(h)) {
        info!(%url, variables = ?engine.binding().names(), "serving");
    }

    let outcome = engine.run(&cancel);
    engine.stop()?;

    let summary = engine.summary().clone();
    if let Some(path) = &cli.summary {
        write_summary(path, &summary)?;
    }

    match outcome {
        Ok(_) | Err(ReplayError::Interrupted { .. }) => Ok(summary),
        Err(err) => Err(err.into()),
    }
}

fn install_interrupt_handler(cancel: &CancelToken) {
    let token = cancel.clone();
    if let Err(err) = ctrlc::set_handler(move || token.cancel()) {
        warn!(error = %err, "Ctrl-C handler not installed");
    }
}

/// Write `summary` as pretty-printed JSON.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), Error> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "summary written");
    Ok(())
}
