use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plan::PlanSnapshot;

/// Whole-run record written at the end of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub run: RunStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
    pub run_id: String,
    pub input_path: String,
    pub out_dir: String,
    pub tool_version: String,
    pub ir_schema: String,
    pub warnings: u64,
    pub errors: u64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: 0,
            run_id: String::new(),
            input_path: String::new(),
            out_dir: String::new(),
            tool_version: String::new(),
            ir_schema: String::new(),
            warnings: 0,
            errors: 0,
        }
    }
}

impl Stats {
    /// Start a record stamped with the current time
    pub fn new() -> Self {
        Self {
            run: RunStats::default(),
            plan: None,
        }
    }

    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.run.started_at = at;
        self
    }

    pub fn with_run_id(mut self, id: &str) -> Self {
        self.run.run_id = id.trim().to_string();
        self
    }

    pub fn with_input_path(mut self, path: &str) -> Self {
        self.run.input_path = path.trim().to_string();
        self
    }

    pub fn with_out_dir(mut self, path: &str) -> Self {
        self.run.out_dir = path.trim().to_string();
        self
    }

    pub fn with_tool_version(mut self, version: &str) -> Self {
        self.run.tool_version = version.trim().to_string();
        self
    }

    pub fn with_ir_schema(mut self, schema: &str) -> Self {
        self.run.ir_schema = schema.trim().to_string();
        self
    }

    pub fn end(&mut self) {
        let now = Utc::now();
        self.run.ended_at = Some(now);
        self.run.duration_ms = (now - self.run.started_at).num_milliseconds().max(0);
    }

    /// `n == 0` counts as one warning
    pub fn inc_warnings(&mut self, n: u64) {
        self.run.warnings += n.max(1);
    }

    /// `n == 0` counts as one error
    pub fn inc_errors(&mut self, n: u64) {
        self.run.errors += n.max(1);
    }

    /// Replaces any previously attached plan snapshot
    pub fn set_plan(&mut self, snapshot: PlanSnapshot) {
        self.plan = Some(snapshot);
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
