use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::error::LoadError;
use super::model::Dataset;

/// Identity of a loaded source: file plus sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub path: PathBuf,
    pub sheet: String,
}

impl SourceKey {
    /// Canonicalizes the path when the file exists so `./a.xlsx` and
    /// `a.xlsx` share an entry.
    pub fn new(path: &Path, sheet: &str) -> Self {
        SourceKey {
            path: path.canonicalize().unwrap_or_else(|_| path.to_path_buf()),
            sheet: sheet.to_string(),
        }
    }
}

/// Loaded datasets kept for the life of the process.
///
/// Nothing is evicted implicitly; a changed source needs [`invalidate`]
/// or [`clear`].
///
/// [`invalidate`]: DatasetCache::invalidate
/// [`clear`]: DatasetCache::clear
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<SourceKey, Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &SourceKey) -> Option<Arc<Dataset>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: SourceKey, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        self.entries.insert(key, Arc::clone(&dataset));
        dataset
    }

    /// Drop one entry. Returns whether it was cached.
    pub fn invalidate(&mut self, key: &SourceKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached dataset for `key`, or the result of `load` stored under it.
    /// Errors are returned as-is and never cached.
    pub fn get_or_load<F>(&mut self, key: SourceKey, load: F) -> Result<Arc<Dataset>, LoadError>
    where
        F: FnOnce(&SourceKey) -> Result<Dataset, LoadError>,
    {
        if let Some(hit) = self.lookup(&key) {
            log::info!("cache hit for {} [{}]", key.path.display(), key.sheet);
            return Ok(hit);
        }
        log::info!("cache miss for {} [{}]", key.path.display(), key.sheet);
        let dataset = load(&key)?;
        Ok(self.insert(key, dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn key(name: &str) -> SourceKey {
        SourceKey::new(Path::new(name), "Planilha")
    }

    #[test]
    fn second_load_is_served_from_cache() {
        let mut cache = DatasetCache::new();
        let calls = Cell::new(0);
        let loader = |_: &SourceKey| {
            calls.set(calls.get() + 1);
            Ok(Dataset::default())
        };
        let a = cache.get_or_load(key("missing-a.xlsx"), loader).unwrap();
        let b = cache.get_or_load(key("missing-a.xlsx"), loader).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn sheet_is_part_of_the_key() {
        let mut cache = DatasetCache::new();
        cache.insert(key("missing-b.xlsx"), Dataset::default());
        let other = SourceKey::new(Path::new("missing-b.xlsx"), "Outra");
        assert!(cache.lookup(&other).is_none());
        assert!(cache.lookup(&key("missing-b.xlsx")).is_some());
    }

    #[test]
    fn invalidate_forces_reload() {
        let mut cache = DatasetCache::new();
        cache.insert(key("missing-c.xlsx"), Dataset::default());
        assert!(cache.invalidate(&key("missing-c.xlsx")));
        assert!(!cache.invalidate(&key("missing-c.xlsx")));
        assert!(cache.lookup(&key("missing-c.xlsx")).is_none());
    }

    #[test]
    fn errors_are_not_cached() {
        let mut cache = DatasetCache::new();
        let result = cache.get_or_load(key("missing-d.xlsx"), |_| Err(LoadError::MissingHeader));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let mut cache = DatasetCache::new();
        cache.insert(key("x.xlsx"), Dataset::default());
        cache.insert(key("y.xlsx"), Dataset::default());
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
