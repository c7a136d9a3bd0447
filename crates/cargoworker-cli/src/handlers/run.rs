use crate::args::GlobalArgs;
use crate::logging::{self, LogOptions};
use anyhow::{Context, Result, bail};
use cargoworker_index::Database;
use cargoworker_runtime::{EventBus, Limits, RunContext};
use cargoworker_types::{CancelToken, Event};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

const BUS_BUFFER: usize = 1024;
const EVENT_LOG_BUFFER: usize = 256;
const IR_SCHEMA: &str = "v1";

/// Everything a command gets back from run setup
pub struct RunSetup {
    pub input: PathBuf,
    pub db: Arc<Database>,
    pub rc: RunContext,
}

/// Resolve the input, create the run directory, install logging, open the
/// store and start the event bus. Logger and bus are registered as closers.
pub fn start(
    global: &GlobalArgs,
    positional: Option<&Path>,
    cancel: CancelToken,
) -> Result<RunSetup> {
    let input = resolve_input(global.input.as_deref().or(positional))?;
    let run_id = parse_run_id(global.run_id.as_deref())?;

    let run_dir = global.out.join(run_id.to_string());
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("Failed to create run directory {}", run_dir.display()))?;

    let log_file = global.log_file.then(|| {
        global
            .log_file_path
            .clone()
            .unwrap_or_else(|| run_dir.join("logs").join("run.log"))
    });
    let opts = LogOptions {
        console: global.log_console,
        console_format: global.log_console_format,
        console_level: global.log_console_level,
        file: log_file,
        file_format: global.log_file_format,
        file_level: global.log_file_level,
        quiet: global.quiet,
    };
    let log_guard = logging::init(&opts).context("Failed to set up logging")?;

    let db_path = global
        .db
        .clone()
        .unwrap_or_else(|| global.out.join("cargoworker.db"));
    let db = Arc::new(
        Database::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?,
    );

    let bus = EventBus::new(BUS_BUFFER).context("Failed to start event bus")?;
    let event_log = spawn_event_logger(bus.subscribe(EVENT_LOG_BUFFER))?;
    debug!(
        buffer = BUS_BUFFER,
        subscribers = bus.subscriber_count(),
        "Event bus started"
    );

    let concurrency = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let mut rc = RunContext::new(run_id)
        .with_input_path(&input)
        .with_out_dir(&run_dir)
        .with_versions(env!("CARGO_PKG_VERSION"), IR_SCHEMA)
        .with_limits(Limits {
            concurrency,
            mem_mb: 0,
        })
        .with_store(db.clone())
        .with_events(bus.sink())
        .with_cancel(cancel);

    rc.add_closer("logger", move || {
        drop(log_guard);
        Ok(())
    });
    rc.add_closer("event-bus", move || {
        bus.close();
        if event_log.join().is_err() {
            warn!("Event log thread panicked");
        }
        Ok(())
    });

    info!(
        parent: &rc.span,
        out = %run_dir.display(),
        db = %db_path.display(),
        console = opts.console,
        file = ?opts.file,
        level = %opts.console_level,
        "Logger initialized"
    );

    Ok(RunSetup { input, db, rc })
}

/// Run closers in reverse order
pub fn finish(rc: RunContext) -> Result<()> {
    info!(parent: &rc.span, "Shutdown complete");
    rc.close().context("Teardown failed")
}

fn resolve_input(input: Option<&Path>) -> Result<PathBuf> {
    let Some(input) = input.filter(|p| !p.as_os_str().is_empty()) else {
        bail!("missing input path: provide [PATH] or --in or CARGOWORKER_IN");
    };

    let input = std::path::absolute(input).unwrap_or_else(|_| input.to_path_buf());
    if !input.is_dir() {
        bail!("input path not found or not a directory: {}", input.display());
    }
    Ok(input)
}

fn parse_run_id(run_id: Option<&str>) -> Result<Uuid> {
    match run_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => Uuid::parse_str(id).with_context(|| format!("Invalid run id '{}'", id)),
        None => Ok(Uuid::new_v4()),
    }
}

fn spawn_event_logger(events: Receiver<Event>) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("event-log".to_string())
        .spawn(move || {
            // Ends when the bus closes and drops its side of the queue
            for event in events {
                if let Some(error) = &event.error {
                    warn!(
                        step = %event.step,
                        unit = %event.unit_id,
                        error = %error,
                        "Run event failed"
                    );
                    continue;
                }
                debug!(
                    scope = ?event.scope,
                    state = ?event.state,
                    step = %event.step,
                    unit = %event.unit_id,
                    value = event.value,
                    total = event.total,
                    "Run event"
                );
            }
        })
        .context("Failed to start event log thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_input() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_input(Some(dir.path())).unwrap();
        assert!(resolved.is_absolute());

        assert!(resolve_input(None).is_err());
        assert!(resolve_input(Some(Path::new(""))).is_err());

        let file = dir.path().join("main.go");
        std::fs::write(&file, "package main").unwrap();
        let err = resolve_input(Some(&file)).unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_parse_run_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_run_id(Some(&id.to_string())).unwrap(), id);
        assert!(parse_run_id(Some("  ")).is_ok());
        assert!(parse_run_id(None).is_ok());
        assert!(parse_run_id(Some("run-1")).is_err());
    }
}
