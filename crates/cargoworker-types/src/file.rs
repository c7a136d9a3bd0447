use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One selected entry of a discovery walk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub path: PathBuf,
    /// Separator boundaries below the input root; top-level entries are 0
    pub depth: usize,
    pub is_dir: bool,
}

/// Discovery output carried on the run context for later stages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanContext {
    pub files: Vec<FileMeta>,
}

impl PlanContext {
    pub fn file_entries(&self) -> impl Iterator<Item = &FileMeta> {
        self.files.iter().filter(|meta| !meta.is_dir)
    }
}
