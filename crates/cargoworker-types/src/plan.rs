use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Where the run's language decision came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageSource {
    /// Command-line flag
    Flag,
    /// Detected from discovered files
    #[default]
    Auto,
    /// Project configuration file
    Config,
}

impl LanguageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageSource::Flag => "flag",
            LanguageSource::Auto => "auto",
            LanguageSource::Config => "config",
        }
    }
}

impl fmt::Display for LanguageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable point-in-time copy of a discovery run's statistics.
///
/// Owns every collection it exposes, so it is safe to hand to other threads,
/// log, serialize or persist while the accumulator keeps changing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
    pub db_init_ms: i64,

    pub language: String,
    pub language_source: LanguageSource,

    pub root: String,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub gitignore_found: bool,

    pub files_discovered: u64,
    pub files_selected: u64,
    pub files_ignored: u64,
    pub ignored_by_reason: BTreeMap<String, u64>,

    pub dirs_visited: u64,
    pub max_depth: usize,
    pub largest_file_bytes: u64,

    pub warn_count: u64,
    pub error_count: u64,
}

impl PlanSnapshot {
    /// Sum of the per-reason breakdown
    pub fn ignored_total(&self) -> u64 {
        self.ignored_by_reason.values().sum()
    }
}
