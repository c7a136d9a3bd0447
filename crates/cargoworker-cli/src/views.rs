use cargoworker_types::Stats;
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn print_plan_summary(stats: &Stats, stats_path: &Path) {
    let color = std::io::stdout().is_terminal();
    println!("{}", format_plan_summary(stats, stats_path, color));
}

fn format_plan_summary(stats: &Stats, stats_path: &Path, color: bool) -> String {
    let Some(plan) = &stats.plan else {
        return format!("Run {} finished without a plan", stats.run.run_id);
    };

    let language = if plan.language.is_empty() {
        "unknown"
    } else {
        plan.language.as_str()
    };
    let selected = plan.files_selected.to_string();
    let language = format!("{} ({})", language, plan.language_source);

    let (selected, language) = if color {
        (selected.green().bold().to_string(), language.cyan().to_string())
    } else {
        (selected, language)
    };

    let mut line = format!(
        "Planned {}: {} selected of {} discovered ({} ignored), {} dirs, language {}, {} ms",
        plan.root,
        selected,
        plan.files_discovered,
        plan.files_ignored,
        plan.dirs_visited,
        language,
        plan.duration_ms,
    );

    if plan.warn_count > 0 {
        let warnings = format!("{} warning(s)", plan.warn_count);
        line.push_str(", ");
        line.push_str(&if color { warnings.yellow().to_string() } else { warnings });
    }

    format!("{}\nStats: {}", line, stats_path.display())
}
