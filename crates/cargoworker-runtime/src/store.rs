use cargoworker_index::Database;
use cargoworker_types::{CancelToken, Language, SourceBasename, SourceExtension};

/// Keyed language lookups backing the [`LanguageCache`](crate::LanguageCache).
/// `Ok(None)` means the store has no record for the key.
pub trait LanguageStore: Send + Sync {
    fn find_extension(&self, ext: &str) -> cargoworker_index::Result<Option<SourceExtension>>;
    fn find_basename(&self, name: &str) -> cargoworker_index::Result<Option<SourceBasename>>;
    fn find_language(&self, id: &str) -> cargoworker_index::Result<Option<Language>>;
}

/// Persistent store handle carried on the run context
pub trait Store: LanguageStore {
    /// Returns the number of migrations applied
    fn apply_pending_migrations(&self, cancel: &CancelToken) -> cargoworker_index::Result<usize>;
}

impl LanguageStore for Database {
    fn find_extension(&self, ext: &str) -> cargoworker_index::Result<Option<SourceExtension>> {
        self.find_language_by_extension(ext)
    }

    fn find_basename(&self, name: &str) -> cargoworker_index::Result<Option<SourceBasename>> {
        self.find_language_by_basename(name)
    }

    fn find_language(&self, id: &str) -> cargoworker_index::Result<Option<Language>> {
        Database::find_language(self, id)
    }
}

impl Store for Database {
    fn apply_pending_migrations(&self, cancel: &CancelToken) -> cargoworker_index::Result<usize> {
        Database::apply_pending_migrations(self, cancel)
    }
}
