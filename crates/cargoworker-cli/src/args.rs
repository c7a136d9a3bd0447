use crate::types::{LogFormat, LogLevel};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cargoworker")]
#[command(about = "Discover a codebase and record run telemetry", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Run-wide settings shared by every command. Each flag also reads a
/// `CARGOWORKER_*` environment variable.
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Input directory (falls back to the positional PATH)
    #[arg(long = "in", env = "CARGOWORKER_IN", global = true)]
    pub input: Option<PathBuf>,

    /// Output root; each run writes into <out>/<run-id>
    #[arg(long, env = "CARGOWORKER_OUT", default_value = "./cargoworkerout", global = true)]
    pub out: PathBuf,

    /// Override the generated run id (must be a UUID)
    #[arg(long, env = "CARGOWORKER_RUN_ID", global = true)]
    pub run_id: Option<String>,

    /// SQLite database path (default: <out>/cargoworker.db)
    #[arg(long, env = "CARGOWORKER_DB", global = true)]
    pub db: Option<PathBuf>,

    #[arg(
        long,
        env = "CARGOWORKER_LOG_CONSOLE",
        default_value_t = true,
        action = ArgAction::Set,
        global = true
    )]
    pub log_console: bool,

    #[arg(long, env = "CARGOWORKER_LOG_CONSOLE_FORMAT", default_value = "text", global = true)]
    pub log_console_format: LogFormat,

    #[arg(long, env = "CARGOWORKER_LOG_CONSOLE_LEVEL", default_value = "info", global = true)]
    pub log_console_level: LogLevel,

    #[arg(
        long,
        env = "CARGOWORKER_LOG_FILE",
        default_value_t = true,
        action = ArgAction::Set,
        global = true
    )]
    pub log_file: bool,

    /// File log path (default: <out>/<run-id>/logs/run.log)
    #[arg(long, env = "CARGOWORKER_LOG_FILE_PATH", global = true)]
    pub log_file_path: Option<PathBuf>,

    #[arg(long, env = "CARGOWORKER_LOG_FILE_FORMAT", default_value = "json", global = true)]
    pub log_file_format: LogFormat,

    #[arg(long, env = "CARGOWORKER_LOG_FILE_LEVEL", default_value = "debug", global = true)]
    pub log_file_level: LogLevel,

    /// Only errors on the console
    #[arg(long, env = "CARGOWORKER_QUIET", global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover the project and record what a later pass would process
    Plan(PlanArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PlanArgs {
    /// Input directory
    pub path: Option<PathBuf>,

    /// Language to plan for; detected from the files when omitted
    #[arg(long, env = "CARGOWORKER_PLAN_LANGUAGE")]
    pub language: Option<String>,

    /// Globs to leave out (gitignore syntax); repeatable or comma separated
    #[arg(long, env = "CARGOWORKER_PLAN_IGNORE", value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Only select files matching these globs; repeatable or comma separated
    #[arg(long, env = "CARGOWORKER_PLAN_INCLUDE", value_delimiter = ',')]
    pub include: Vec<String>,

    /// Include module and package dependencies in planning
    #[arg(long, env = "CARGOWORKER_PLAN_WITH_DEPS")]
    pub with_deps: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_plan_flags() {
        let cli = Cli::try_parse_from([
            "cargoworker",
            "--out",
            "/tmp/out",
            "plan",
            "repo",
            "--ignore",
            "vendor/,*.pb.go",
            "--ignore",
            "testdata",
            "--language",
            "go",
            "--log-console",
            "false",
        ])
        .unwrap();

        assert_eq!(cli.global.out, PathBuf::from("/tmp/out"));
        assert!(!cli.global.log_console);
        assert!(cli.global.log_file);
        assert_eq!(cli.global.log_file_format, LogFormat::Json);
        let Commands::Plan(args) = cli.command;
        assert_eq!(args.path, Some(PathBuf::from("repo")));
        assert_eq!(args.ignore, vec!["vendor/", "*.pb.go", "testdata"]);
        assert_eq!(args.language.as_deref(), Some("go"));
        assert!(!args.with_deps);
    }
}
