use cargoworker_types::{Language, SourceBasename, SourceExtension};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::trace;

use crate::{Error, LanguageStore, Result};

// NOTE: Miss path (single-flight)
//
// - Hits only take the key space's read lock
// - A miss registers or joins an in-flight OnceCell for its key; the first
//   caller runs the store query inside get_or_init, everyone else blocks on
//   that same cell and receives the same outcome
// - The leader publishes a found record into the resolved map before retiring
//   the flight, so a caller arriving later either joins the finished flight or
//   hits the map; the store is never asked twice for a resolved key
// - Not-found and errors are handed to the joined callers and then forgotten

type Outcome<T> = std::result::Result<Option<T>, Arc<cargoworker_index::Error>>;

struct KeySpace<T> {
    resolved: RwLock<HashMap<String, T>>,
    inflight: Mutex<HashMap<String, Arc<OnceCell<Outcome<T>>>>>,
}

impl<T: Clone> KeySpace<T> {
    fn new() -> Self {
        Self {
            resolved: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, key: &str) -> Option<T> {
        self.resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn len(&self) -> usize {
        self.resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn resolve<F>(&self, key: &str, fetch: F) -> Result<Option<T>>
    where
        F: FnOnce(&str) -> cargoworker_index::Result<Option<T>>,
    {
        if let Some(hit) = self.cached(key) {
            return Ok(Some(hit));
        }

        let flight = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            // A flight may have finished between the read above and this lock
            if let Some(hit) = self.cached(key) {
                return Ok(Some(hit));
            }
            Arc::clone(inflight.entry(key.to_string()).or_default())
        };

        let mut leader = false;
        let outcome = flight
            .get_or_init(|| {
                leader = true;
                trace!(key, "Language cache miss, querying store");
                let outcome = fetch(key).map_err(Arc::new);
                if let Ok(Some(record)) = &outcome {
                    self.resolved
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(key.to_string(), record.clone());
                }
                outcome
            })
            .clone();

        if leader {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            if inflight
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, &flight))
            {
                inflight.remove(key);
            }
        }

        outcome.map_err(Error::Index)
    }
}

/// Read-through cache from extension / basename / language id to language
/// records. Entries live for the lifetime of the cache; the store is never
/// written.
pub struct LanguageCache {
    store: Arc<dyn LanguageStore>,
    extensions: KeySpace<SourceExtension>,
    basenames: KeySpace<SourceBasename>,
    languages: KeySpace<Language>,
}

impl LanguageCache {
    pub fn new(store: Arc<dyn LanguageStore>) -> Self {
        Self {
            store,
            extensions: KeySpace::new(),
            basenames: KeySpace::new(),
            languages: KeySpace::new(),
        }
    }

    /// `ext` is matched exactly as stored: lowercase, without the leading dot
    pub fn resolve_extension(&self, ext: &str) -> Result<Option<SourceExtension>> {
        self.extensions
            .resolve(ext, |key| self.store.find_extension(key))
    }

    pub fn resolve_basename(&self, name: &str) -> Result<Option<SourceBasename>> {
        self.basenames
            .resolve(name, |key| self.store.find_basename(key))
    }

    pub fn resolve_language(&self, id: &str) -> Result<Option<Language>> {
        self.languages
            .resolve(id, |key| self.store.find_language(key))
    }

    /// Number of resolved entries per key space: (extensions, basenames, languages)
    pub fn cached_counts(&self) -> (usize, usize, usize) {
        (
            self.extensions.len(),
            self.basenames.len(),
            self.languages.len(),
        )
    }
}
