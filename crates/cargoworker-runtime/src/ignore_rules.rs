use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Why a discovered entry was left out of the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IgnoreReason {
    /// Dot-prefixed name
    Hidden,
    /// Matched by the root `.gitignore`
    Gitignore,
    /// Matched by a configured exclude glob
    Exclude,
    /// File outside a non-empty include list
    NotIncluded,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::Hidden => "hidden",
            IgnoreReason::Gitignore => "gitignore",
            IgnoreReason::Exclude => "exclude",
            IgnoreReason::NotIncluded => "not_included",
        }
    }
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled ignore matcher for one input root.
///
/// Globs use gitignore syntax and are anchored at the root the rules were
/// compiled for; paths passed to [`IgnoreRules::check`] must live under it.
pub struct IgnoreRules {
    gitignore: Option<Gitignore>,
    excludes: Option<Gitignore>,
    includes: Option<Gitignore>,
    gitignore_found: bool,
    warnings: usize,
}

impl IgnoreRules {
    pub fn compile(root: &Path, include: &[String], exclude: &[String]) -> Self {
        let mut warnings = 0;

        let gitignore_path = root.join(".gitignore");
        let (gitignore, gitignore_found) = if gitignore_path.is_file() {
            let mut builder = GitignoreBuilder::new(root);
            match builder.add(&gitignore_path) {
                Some(err) if err.is_io() => {
                    warn!(
                        path = %gitignore_path.display(),
                        error = %err,
                        "Failed to read .gitignore; no additional rules"
                    );
                    warnings += 1;
                    (None, false)
                }
                // Partial errors still leave the valid lines in the builder
                Some(err) => {
                    warn!(
                        path = %gitignore_path.display(),
                        error = %err,
                        "Some .gitignore rules could not be read"
                    );
                    warnings += 1;
                    (build(builder, "gitignore", &mut warnings), true)
                }
                None => (build(builder, "gitignore", &mut warnings), true),
            }
        } else {
            info!(path = %gitignore_path.display(), "No .gitignore found; no additional rules");
            (None, false)
        };

        let excludes = from_lines(root, exclude, "exclude", &mut warnings);
        let includes = from_lines(root, include, "include", &mut warnings);

        Self {
            gitignore,
            excludes,
            includes,
            gitignore_found,
            warnings,
        }
    }

    pub fn gitignore_found(&self) -> bool {
        self.gitignore_found
    }

    /// Number of rule sources or lines that had to be skipped
    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// First rule that leaves `path` out of the plan, if any
    pub fn check(&self, path: &Path, is_dir: bool) -> Option<IgnoreReason> {
        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if hidden {
            return Some(IgnoreReason::Hidden);
        }

        if matches(&self.gitignore, path, is_dir) {
            return Some(IgnoreReason::Gitignore);
        }

        if matches(&self.excludes, path, is_dir) {
            return Some(IgnoreReason::Exclude);
        }

        // Directories are always descended so nested matches can be found
        if !is_dir && self.includes.is_some() && !matches(&self.includes, path, false) {
            return Some(IgnoreReason::NotIncluded);
        }

        None
    }
}

fn matches(matcher: &Option<Gitignore>, path: &Path, is_dir: bool) -> bool {
    matcher
        .as_ref()
        .is_some_and(|m| m.matched(path, is_dir).is_ignore())
}

fn from_lines(
    root: &Path,
    globs: &[String],
    kind: &str,
    warnings: &mut usize,
) -> Option<Gitignore> {
    let globs: Vec<&str> = globs
        .iter()
        .map(|g| g.trim())
        .filter(|g| !g.is_empty())
        .collect();
    if globs.is_empty() {
        return None;
    }

    let mut builder = GitignoreBuilder::new(root);
    for glob in globs {
        if let Err(err) = builder.add_line(None, glob) {
            warn!(kind, glob, error = %err, "Skipping invalid glob");
            *warnings += 1;
        }
    }
    build(builder, kind, warnings)
}

fn build(builder: GitignoreBuilder, kind: &str, warnings: &mut usize) -> Option<Gitignore> {
    match builder.build() {
        Ok(matcher) if matcher.is_empty() => None,
        Ok(matcher) => Some(matcher),
        Err(err) => {
            warn!(kind, error = %err, "Failed to compile ignore rules");
            *warnings += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn globs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_gitignore() {
        let dir = TempDir::new().unwrap();
        let rules = IgnoreRules::compile(dir.path(), &[], &[]);

        assert!(!rules.gitignore_found());
        assert_eq!(rules.warnings(), 0);
        assert_eq!(rules.check(&dir.path().join("main.go"), false), None);
    }

    #[test]
    fn test_unreadable_gitignore_adds_no_rules() {
        let dir = TempDir::new().unwrap();
        // Not UTF-8, so the first line fails to read
        fs::write(dir.path().join(".gitignore"), b"\xff\xfevendor/\n").unwrap();
        let rules = IgnoreRules::compile(dir.path(), &[], &[]);

        assert!(!rules.gitignore_found());
        assert_eq!(rules.warnings(), 1);
        assert_eq!(rules.check(&dir.path().join("vendor"), true), None);
    }

    #[test]
    fn test_hidden_entries() {
        let dir = TempDir::new().unwrap();
        let rules = IgnoreRules::compile(dir.path(), &[], &[]);

        assert_eq!(
            rules.check(&dir.path().join(".git"), true),
            Some(IgnoreReason::Hidden)
        );
        assert_eq!(
            rules.check(&dir.path().join(".env"), false),
            Some(IgnoreReason::Hidden)
        );
    }

    #[test]
    fn test_gitignore_directory_rule() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "vendor/\n*.log\n").unwrap();
        let rules = IgnoreRules::compile(dir.path(), &[], &[]);

        assert!(rules.gitignore_found());
        assert_eq!(
            rules.check(&dir.path().join("vendor"), true),
            Some(IgnoreReason::Gitignore)
        );
        // Directory-only pattern does not match a file of the same name
        assert_eq!(rules.check(&dir.path().join("vendor"), false), None);
        assert_eq!(
            rules.check(&dir.path().join("src/debug.log"), false),
            Some(IgnoreReason::Gitignore)
        );
    }

    #[test]
    fn test_exclude_globs() {
        let dir = TempDir::new().unwrap();
        let rules = IgnoreRules::compile(dir.path(), &[], &globs(&["testdata", "*_test.go", " "]));

        assert_eq!(
            rules.check(&dir.path().join("pkg/testdata"), true),
            Some(IgnoreReason::Exclude)
        );
        assert_eq!(
            rules.check(&dir.path().join("pkg/a_test.go"), false),
            Some(IgnoreReason::Exclude)
        );
        assert_eq!(rules.check(&dir.path().join("pkg/a.go"), false), None);
    }

    #[test]
    fn test_include_globs_only_filter_files() {
        let dir = TempDir::new().unwrap();
        let rules = IgnoreRules::compile(dir.path(), &globs(&["*.go"]), &[]);

        assert_eq!(rules.check(&dir.path().join("cmd"), true), None);
        assert_eq!(rules.check(&dir.path().join("cmd/main.go"), false), None);
        assert_eq!(
            rules.check(&dir.path().join("README.md"), false),
            Some(IgnoreReason::NotIncluded)
        );
    }

    #[test]
    fn test_gitignore_wins_over_exclude() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "build/\n").unwrap();
        let rules = IgnoreRules::compile(dir.path(), &[], &globs(&["build"]));

        assert_eq!(
            rules.check(&dir.path().join("build"), true),
            Some(IgnoreReason::Gitignore)
        );
    }
}
