use super::run::{self, RunSetup};
use crate::args::{GlobalArgs, PlanArgs};
use crate::views;
use anyhow::{Context, Result};
use cargoworker_index::Database;
use cargoworker_runtime::{Config, LanguageCache, Plan, RunContext, Runner, decide_language};
use cargoworker_types::CancelToken;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const STATS_FILE: &str = "stats.json";

pub fn handle(global: &GlobalArgs, args: &PlanArgs, cancel: CancelToken) -> Result<()> {
    let RunSetup { input, db, mut rc } = run::start(global, args.path.as_deref(), cancel)?;

    let outcome = execute(&mut rc, &db, args, &input);
    let stats = rc.stats.clone();
    let teardown = run::finish(rc);

    let stats_path = outcome?;
    teardown?;

    views::print_plan_summary(&stats, &stats_path);
    Ok(())
}

fn execute(
    rc: &mut RunContext,
    db: &Arc<Database>,
    args: &PlanArgs,
    input: &Path,
) -> Result<PathBuf> {
    let span = rc.span.clone();
    let _guard = span.enter();

    let config =
        Config::load_from(&Config::path_in(input)).context("Failed to load project config")?;
    let exclude = merge(&config.plan.ignore, &args.ignore);
    let include = merge(&config.plan.include, &args.include);

    info!(
        input = %input.display(),
        language = ?args.language,
        ignore = ?exclude,
        include = ?include,
        with_deps = args.with_deps,
        "Plan start"
    );

    let plan = Arc::new(Plan::new(input.to_string_lossy(), &include, &exclude));
    let runner = Runner::new(Arc::clone(&plan));

    if let Err(err) = runner.plan(rc) {
        // Keep the partial counts on disk next to the logs
        rc.stats.set_plan(runner.stats());
        rc.stats.inc_errors(1);
        rc.stats.end();
        if let Err(write_err) = write_stats(rc) {
            warn!(error = %write_err, "Failed to write partial stats");
        }
        return Err(err).context("Plan failed");
    }

    let cache = LanguageCache::new(db.clone());
    let files = rc.plan_context.clone().unwrap_or_default();
    let (language, source) = decide_language(args.language.as_deref(), &config, &cache, &files)
        .context("Language detection failed")?;
    plan.set_language(&language, source);

    let (extensions, basenames, languages) = cache.cached_counts();
    let known = db.count_languages().context("Failed to count languages")?;
    debug!(extensions, basenames, languages, known, "Language cache");
    info!(language = %language, source = %source, "Language decided");

    let snapshot = plan.snapshot();
    if snapshot.warn_count > 0 {
        rc.stats.inc_warnings(snapshot.warn_count);
    }
    if snapshot.error_count > 0 {
        rc.stats.inc_errors(snapshot.error_count);
    }
    rc.stats.set_plan(snapshot);
    rc.stats.end();

    write_stats(rc)
}

fn write_stats(rc: &RunContext) -> Result<PathBuf> {
    let path = rc.out_dir.join(STATS_FILE);
    let json = serde_json::to_string_pretty(&rc.stats)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Stats written");
    Ok(path)
}

/// Config values first, then flags; blanks and repeats dropped
fn merge(config: &[String], flags: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for glob in config.iter().chain(flags) {
        let glob = glob.trim();
        if !glob.is_empty() && !merged.iter().any(|g| g == glob) {
            merged.push(glob.to_string());
        }
    }
    merged
}
