use cargoworker_types::{LanguageSource, PlanContext};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::debug;

use crate::{Config, LanguageCache, Result};

/// Most frequent language among the selected files, or `None` when no file
/// resolves. Known basenames (`go.mod`, `Cargo.toml`, ...) count for their
/// language; extensions only count when they are primary for it. Ties go to
/// the smallest language id.
pub fn detect_language(cache: &LanguageCache, files: &PlanContext) -> Result<Option<String>> {
    let mut tally: BTreeMap<String, u64> = BTreeMap::new();

    for meta in files.file_entries() {
        let Some(name) = meta.path.file_name().map(|n| n.to_string_lossy()) else {
            continue;
        };

        if let Some(basename) = cache.resolve_basename(&name)? {
            *tally.entry(basename.language_id).or_insert(0) += 1;
            continue;
        }

        let Some(ext) = meta.path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
            continue;
        };
        if let Some(record) = cache.resolve_extension(&ext)?
            && record.is_primary
        {
            *tally.entry(record.language_id).or_insert(0) += 1;
        }
    }

    debug!(?tally, "Language tally");

    // On equal counts Reverse(id) ranks the smallest id highest
    Ok(tally
        .into_iter()
        .max_by_key(|(id, count)| (*count, Reverse(id.clone())))
        .map(|(id, _)| id))
}

/// Pick the run language: explicit flag, then project config, then detection
pub fn decide_language(
    flag: Option<&str>,
    config: &Config,
    cache: &LanguageCache,
    files: &PlanContext,
) -> Result<(String, LanguageSource)> {
    if let Some(lang) = flag.map(str::trim).filter(|lang| !lang.is_empty()) {
        return Ok((lang.to_string(), LanguageSource::Flag));
    }

    if let Some(lang) = config.language() {
        return Ok((lang.to_string(), LanguageSource::Config));
    }

    let detected = detect_language(cache, files)?.unwrap_or_default();
    Ok((detected, LanguageSource::Auto))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LanguageStore, PlanConfig};
    use cargoworker_types::{FileMeta, Language, SourceBasename, SourceExtension};
    use std::path::PathBuf;
    use std::sync::Arc;

    struct FixedStore;

    impl LanguageStore for FixedStore {
        fn find_extension(&self, ext: &str) -> cargoworker_index::Result<Option<SourceExtension>> {
            let (language_id, is_primary) = match ext {
                "go" => ("go", true),
                "tmpl" => ("go", false),
                "rs" => ("rust", true),
                "py" => ("python", true),
                _ => return Ok(None),
            };
            Ok(Some(SourceExtension {
                extension: ext.to_string(),
                language_id: language_id.to_string(),
                is_text: true,
                is_primary,
                notes: None,
            }))
        }

        fn find_basename(&self, name: &str) -> cargoworker_index::Result<Option<SourceBasename>> {
            let language_id = match name {
                "go.mod" => "go",
                "Cargo.toml" => "rust",
                _ => return Ok(None),
            };
            Ok(Some(SourceBasename {
                name: name.to_string(),
                language_id: language_id.to_string(),
                is_text: true,
                notes: None,
            }))
        }

        fn find_language(&self, _id: &str) -> cargoworker_index::Result<Option<Language>> {
            Ok(None)
        }
    }

    fn cache() -> LanguageCache {
        LanguageCache::new(Arc::new(FixedStore))
    }

    fn files(paths: &[&str]) -> PlanContext {
        PlanContext {
            files: paths
                .iter()
                .map(|p| FileMeta {
                    path: PathBuf::from(p),
                    depth: p.matches('/').count(),
                    is_dir: !p.contains('.'),
                })
                .collect(),
        }
    }

    #[test]
    fn test_most_frequent_primary_wins() {
        let files = files(&["cmd", "cmd/main.go", "a.tmpl", "b.tmpl", "c.tmpl", "tool.py"]);
        // Non-primary .tmpl files do not count for go
        assert_eq!(detect_language(&cache(), &files).unwrap().as_deref(), Some("go"));
    }

    #[test]
    fn test_basenames_count() {
        let files = files(&["Cargo.toml", "main.go", "lib.rs"]);
        assert_eq!(detect_language(&cache(), &files).unwrap().as_deref(), Some("rust"));
    }

    #[test]
    fn test_ties_go_to_smallest_id() {
        let files = files(&["x.py", "y.go"]);
        assert_eq!(detect_language(&cache(), &files).unwrap().as_deref(), Some("go"));
    }

    #[test]
    fn test_extensions_are_lowercased() {
        let files = files(&["MAIN.RS"]);
        assert_eq!(detect_language(&cache(), &files).unwrap().as_deref(), Some("rust"));
    }

    #[test]
    fn test_nothing_resolvable() {
        let files = files(&["docs", "docs/notes.txt"]);
        assert_eq!(detect_language(&cache(), &files).unwrap(), None);

        let decided = decide_language(None, &Config::default(), &cache(), &files).unwrap();
        assert_eq!(decided, (String::new(), LanguageSource::Auto));
    }

    #[test]
    fn test_decision_precedence() {
        let files = files(&["main.go"]);
        let config = Config {
            plan: PlanConfig {
                language: Some("rust".to_string()),
                ..Default::default()
            },
        };

        assert_eq!(
            decide_language(Some("python"), &config, &cache(), &files).unwrap(),
            ("python".to_string(), LanguageSource::Flag)
        );
        assert_eq!(
            decide_language(Some("  "), &config, &cache(), &files).unwrap(),
            ("rust".to_string(), LanguageSource::Config)
        );
        assert_eq!(
            decide_language(None, &Config::default(), &cache(), &files).unwrap(),
            ("go".to_string(), LanguageSource::Auto)
        );
    }
}
