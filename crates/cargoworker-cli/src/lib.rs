mod args;
mod commands;
mod handlers;
pub mod logging;
pub mod types;
mod views;

pub use args::{Cli, Commands, GlobalArgs, PlanArgs};
pub use commands::run;
