use cargoworker_types::{Event, EventScope, EventState, FileMeta, PlanContext, PlanSnapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::{Error, IgnoreRules, Plan, Result, RunContext};

const STEP: &str = "plan";

/// Sorted directory entries that can skip the rest of the current directory
trait Entries: Iterator<Item = walkdir::Result<DirEntry>> {
    fn prune(&mut self);
}

impl Entries for walkdir::IntoIter {
    fn prune(&mut self) {
        self.skip_current_dir();
    }
}

fn walk_sorted(root: &Path) -> walkdir::IntoIter {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
}

/// Discovery pass over the run's input directory
pub struct Runner {
    plan: Arc<Plan>,
}

impl Runner {
    pub fn new(plan: Arc<Plan>) -> Self {
        Self { plan }
    }

    /// Current statistics; after a failed walk this is the partial result
    pub fn stats(&self) -> PlanSnapshot {
        self.plan.snapshot()
    }

    /// Migrate the store, then walk the input root and record what was
    /// discovered, ignored and selected. Selected entries land in
    /// `rc.plan_context`.
    pub fn plan(&self, rc: &mut RunContext) -> Result<PlanSnapshot> {
        self.plan_entries(rc, walk_sorted)
    }

    fn plan_entries<E: Entries>(
        &self,
        rc: &mut RunContext,
        open: impl FnOnce(&Path) -> E,
    ) -> Result<PlanSnapshot> {
        let root = rc
            .input_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Config("input path not resolved".to_string()))?;
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "input path is not a directory: {}",
                root.display()
            )));
        }
        let store = rc
            .store
            .clone()
            .ok_or_else(|| Error::Config("store unavailable".to_string()))?;

        let span = rc.span.clone();
        let _guard = span.enter();

        if rc.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let started = Instant::now();
        let applied = store
            .apply_pending_migrations(&rc.cancel)
            .map_err(|err| match err {
                cargoworker_index::Error::Cancelled => Error::Cancelled,
                other => Error::Migration(other),
            })?;
        self.plan.set_db_init(started.elapsed());
        debug!(applied, "Store ready");

        rc.publish(Event::new(rc.run_id, EventScope::Run, EventState::Start, STEP));
        info!(root = %root.display(), "Planning");

        match self.walk(rc, &root, open(&root)) {
            Ok(files) => {
                self.plan.end();
                let snapshot = self.plan.snapshot();
                rc.plan_context = Some(PlanContext { files });
                rc.publish(
                    Event::new(rc.run_id, EventScope::Run, EventState::Complete, STEP)
                        .with_progress(snapshot.files_selected, snapshot.files_discovered),
                );
                info!(
                    discovered = snapshot.files_discovered,
                    selected = snapshot.files_selected,
                    dirs = snapshot.dirs_visited,
                    "Plan complete"
                );
                Ok(snapshot)
            }
            Err(err) => {
                self.plan.end();
                rc.publish(
                    Event::new(rc.run_id, EventScope::Run, EventState::Error, STEP)
                        .with_error(&err),
                );
                Err(err)
            }
        }
    }

    fn walk(
        &self,
        rc: &RunContext,
        root: &Path,
        mut entries: impl Entries,
    ) -> Result<Vec<FileMeta>> {
        let rules =
            IgnoreRules::compile(root, self.plan.include_globs(), self.plan.exclude_globs());
        self.plan.set_gitignore_found(rules.gitignore_found());
        for _ in 0..rules.warnings() {
            self.plan.warn();
        }

        let mut files = Vec::new();
        while let Some(entry) = entries.next() {
            if rc.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let entry = entry.map_err(|err| self.walk_error(root, err))?;
            self.plan.inc_discovered(1);

            let is_dir = entry.file_type().is_dir();
            if let Some(reason) = rules.check(entry.path(), is_dir) {
                // Ignored files only count as discovered; ignored dirs are
                // still visited once and pruned
                if is_dir {
                    self.plan.inc_dirs(1);
                    entries.prune();
                }
                self.plan.ignore(reason.as_str(), 1);
                debug!(path = %entry.path().display(), %reason, "Ignored");
                continue;
            }

            let depth = entry.depth().saturating_sub(1);
            if is_dir {
                self.plan.inc_dirs(1);
            } else {
                let len = entry
                    .metadata()
                    .map_err(|err| self.walk_error(root, err))?
                    .len();
                self.plan.consider_largest(len);
            }
            self.plan.max_depth_seen(depth);

            files.push(FileMeta {
                path: entry.path().to_path_buf(),
                depth,
                is_dir,
            });
            self.plan.inc_selected(1);

            rc.publish(
                Event::new(rc.run_id, EventScope::File, EventState::Advance, STEP)
                    .with_unit(entry.path().to_string_lossy())
                    .with_progress(self.plan.files_selected(), self.plan.files_discovered()),
            );
        }

        Ok(files)
    }

    fn walk_error(&self, root: &Path, err: walkdir::Error) -> Error {
        self.plan.error();
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(root));
        warn!(path = %path.display(), error = %err, "Walk failed");
        Error::Walk { path, source: err }
    }
}
