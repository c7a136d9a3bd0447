use cargoworker_types::{LanguageSource, PlanSnapshot};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

// NOTE: Synchronization layout
//
// - Per-entry counters are atomics so the walk (and later, parallel classifiers)
//   never take a lock on the hot path
// - Everything else (reason breakdown, max depth, timings, decisions) changes
//   rarely and lives behind one mutex
// - snapshot() holds that mutex for the whole read, so the map, depth and time
//   fields in one snapshot always belong together

/// Concurrency-safe statistics for one discovery run
pub struct Plan {
    root: String,
    include_globs: Vec<String>,
    exclude_globs: Vec<String>,

    files_discovered: AtomicU64,
    files_selected: AtomicU64,
    dirs_visited: AtomicU64,
    largest_file_bytes: AtomicU64,
    warn_count: AtomicU64,
    error_count: AtomicU64,

    state: Mutex<PlanState>,
}

struct PlanState {
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    db_init_ms: i64,
    language: String,
    language_source: LanguageSource,
    gitignore_found: bool,
    max_depth: usize,
    ignored_by_reason: BTreeMap<String, u64>,
}

impl Plan {
    pub fn new(root: impl Into<String>, include: &[String], exclude: &[String]) -> Self {
        Self {
            root: root.into(),
            include_globs: include.to_vec(),
            exclude_globs: exclude.to_vec(),
            files_discovered: AtomicU64::new(0),
            files_selected: AtomicU64::new(0),
            dirs_visited: AtomicU64::new(0),
            largest_file_bytes: AtomicU64::new(0),
            warn_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            state: Mutex::new(PlanState {
                started_at: Utc::now(),
                ended_at: None,
                db_init_ms: 0,
                language: String::new(),
                language_source: LanguageSource::default(),
                gitignore_found: false,
                max_depth: 0,
                ignored_by_reason: BTreeMap::new(),
            }),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn include_globs(&self) -> &[String] {
        &self.include_globs
    }

    pub fn exclude_globs(&self) -> &[String] {
        &self.exclude_globs
    }

    fn state(&self) -> MutexGuard<'_, PlanState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn end(&self) {
        self.state().ended_at = Some(Utc::now());
    }

    pub fn set_db_init(&self, elapsed: Duration) {
        self.state().db_init_ms = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
    }

    pub fn set_language(&self, language: &str, source: LanguageSource) {
        let mut state = self.state();
        state.language = language.to_string();
        state.language_source = source;
    }

    pub fn set_gitignore_found(&self, found: bool) {
        self.state().gitignore_found = found;
    }

    pub fn inc_discovered(&self, n: u64) {
        self.files_discovered.fetch_add(n, Ordering::SeqCst);
    }

    pub fn inc_selected(&self, n: u64) {
        self.files_selected.fetch_add(n, Ordering::SeqCst);
    }

    pub fn inc_dirs(&self, n: u64) {
        self.dirs_visited.fetch_add(n, Ordering::SeqCst);
    }

    pub fn files_discovered(&self) -> u64 {
        self.files_discovered.load(Ordering::SeqCst)
    }

    pub fn files_selected(&self) -> u64 {
        self.files_selected.load(Ordering::SeqCst)
    }

    /// Only depths above the current maximum are stored; 0 is ignored
    pub fn max_depth_seen(&self, depth: usize) {
        if depth == 0 {
            return;
        }
        let mut state = self.state();
        if depth > state.max_depth {
            state.max_depth = depth;
        }
    }

    /// Lock-free running maximum of file sizes
    pub fn consider_largest(&self, size_bytes: u64) {
        let mut current = self.largest_file_bytes.load(Ordering::SeqCst);
        while size_bytes > current {
            match self.largest_file_bytes.compare_exchange_weak(
                current,
                size_bytes,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn ignore(&self, reason: &str, n: u64) {
        if n == 0 {
            return;
        }
        *self
            .state()
            .ignored_by_reason
            .entry(reason.to_string())
            .or_insert(0) += n;
    }

    pub fn warn(&self) {
        self.warn_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn error(&self) {
        self.error_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Independent copy of the current state. Never aliases the live map or
    /// glob lists, so later mutation cannot reach a returned snapshot.
    pub fn snapshot(&self) -> PlanSnapshot {
        let state = self.state();

        // Selected is always bumped after discovered; loading it first keeps
        // selected <= discovered even while a walk is running
        let files_selected = self.files_selected.load(Ordering::SeqCst);
        let files_discovered = self.files_discovered.load(Ordering::SeqCst);

        let duration_ms = state
            .ended_at
            .map(|end| (end - state.started_at).num_milliseconds().max(0))
            .unwrap_or(0);

        PlanSnapshot {
            started_at: state.started_at,
            ended_at: state.ended_at,
            duration_ms,
            db_init_ms: state.db_init_ms,
            language: state.language.clone(),
            language_source: state.language_source,
            root: self.root.clone(),
            include_globs: self.include_globs.clone(),
            exclude_globs: self.exclude_globs.clone(),
            gitignore_found: state.gitignore_found,
            files_discovered,
            files_selected,
            files_ignored: files_discovered.saturating_sub(files_selected),
            ignored_by_reason: state.ignored_by_reason.clone(),
            dirs_visited: self.dirs_visited.load(Ordering::SeqCst),
            max_depth: state.max_depth,
            largest_file_bytes: self.largest_file_bytes.load(Ordering::SeqCst),
            warn_count: self.warn_count.load(Ordering::SeqCst),
            error_count: self.error_count.load(Ordering::SeqCst),
        }
    }
}
