pub mod cancel;
pub mod event;
pub mod file;
pub mod language;
pub mod plan;
pub mod stats;

pub use cancel::CancelToken;
pub use event::{Event, EventScope, EventState};
pub use file::{FileMeta, PlanContext};
pub use language::{Language, SourceBasename, SourceExtension};
pub use plan::{LanguageSource, PlanSnapshot};
pub use stats::{RunStats, Stats};
