use crate::types::{LogFormat, LogLevel};
use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Where and how run logs are written
#[derive(Debug, Clone)]
pub struct LogOptions {
    pub console: bool,
    pub console_format: LogFormat,
    pub console_level: LogLevel,
    /// `None` disables the file sink
    pub file: Option<PathBuf>,
    pub file_format: LogFormat,
    pub file_level: LogLevel,
    pub quiet: bool,
}

impl LogOptions {
    fn console_filter(&self) -> EnvFilter {
        let level = if self.quiet {
            LogLevel::Error
        } else {
            self.console_level
        };
        EnvFilter::new(level.to_string())
    }
}

/// Install the global subscriber. The returned guard flushes the file sink
/// when dropped and must outlive the run.
pub fn init(opts: &LogOptions) -> Result<Option<WorkerGuard>> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guard = None;

    if opts.console {
        let ansi = std::io::stderr().is_terminal();
        let layer: BoxedLayer = match opts.console_format {
            LogFormat::Text => fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(ansi)
                .with_filter(opts.console_filter())
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_filter(opts.console_filter())
                .boxed(),
        };
        layers.push(layer);
    }

    if let Some(path) = &opts.file {
        let (dir, file_name) = split_log_path(path)?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        let filter = EnvFilter::new(opts.file_level.to_string());
        let layer: BoxedLayer = match opts.file_format {
            LogFormat::Text => fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(filter)
                .boxed(),
        };
        layers.push(layer);
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("out/run/logs/run.log")).unwrap();
        assert_eq!(dir, Path::new("out/run/logs"));
        assert_eq!(name, "run.log");

        let (dir, name) = split_log_path(Path::new("run.log")).unwrap();
        assert_eq!(dir, Path::new("."));
        assert_eq!(name, "run.log");

        assert!(split_log_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_quiet_forces_error_level() {
        let opts = LogOptions {
            console: true,
            console_format: LogFormat::Text,
            console_level: LogLevel::Debug,
            file: None,
            file_format: LogFormat::Json,
            file_level: LogLevel::Debug,
            quiet: true,
        };
        assert_eq!(opts.console_filter().to_string(), "error");
    }
}
