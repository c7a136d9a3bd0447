pub mod bus;
pub mod config;
pub mod context;
pub mod detect;
pub mod discovery;
pub mod error;
pub mod ignore_rules;
pub mod language_cache;
pub mod plan;
pub mod store;

pub use bus::{EventBus, EventSink};
pub use config::{Config, PlanConfig};
pub use context::{Limits, RunContext};
pub use detect::{decide_language, detect_language};
pub use discovery::Runner;
pub use error::{Error, Result};
pub use ignore_rules::{IgnoreReason, IgnoreRules};
pub use language_cache::LanguageCache;
pub use plan::Plan;
pub use store::{LanguageStore, Store};
