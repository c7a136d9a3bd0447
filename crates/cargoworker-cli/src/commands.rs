use super::args::{Cli, Commands};
use super::handlers;
use anyhow::{Context, Result};
use cargoworker_types::CancelToken;

pub fn run(cli: Cli) -> Result<()> {
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel()).context("Failed to install ctrl-c handler")?;
    }

    match cli.command {
        Commands::Plan(args) => handlers::plan::handle(&cli.global, &args, cancel),
    }
}
