//! Memoized ledger loading.
//!
//! [`LedgerCache`] keeps the loaded table for each source and reuses it until
//! the source changes on disk.  Staleness is decided by a [`SourceStamp`]
//! (canonical path, modification time and length) rather than by a timer, so
//! repeated loads of an unchanged file never touch the parser.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

use insight_core::table::Table;
use insight_core::{InsightError, Result};
use insight_data::reader::{find_csv_files, load_table};

// ── SourceStamp ───────────────────────────────────────────────────────────────

/// Identity of a source at one point in time.
///
/// For a directory the stamp aggregates every CSV file beneath it: the
/// latest modification time and the summed length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStamp {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub len: u64,
    pub files: usize,
}

impl SourceStamp {
    /// Stat `path` without reading its contents.
    pub fn probe(path: &Path) -> Result<Self> {
        let canonical = path.canonicalize().map_err(|e| InsightError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let files = if canonical.is_dir() {
            find_csv_files(&canonical)
        } else {
            vec![canonical.clone()]
        };

        let mut modified: Option<SystemTime> = None;
        let mut len = 0u64;
        for file in &files {
            let meta = std::fs::metadata(file).map_err(|e| InsightError::FileRead {
                path: file.clone(),
                source: e,
            })?;
            len += meta.len();
            let file_modified = meta.modified().ok();
            modified = modified.max(file_modified);
        }

        Ok(Self {
            path: canonical,
            modified,
            len,
            files: files.len(),
        })
    }
}

// ── LedgerCache ───────────────────────────────────────────────────────────────

struct CacheEntry {
    stamp: SourceStamp,
    table: Table,
    loaded_at: Instant,
}

/// Explicit memo of loaded ledger tables keyed by canonical source path.
///
/// # Example
/// ```no_run
/// use insight_runtime::data_manager::LedgerCache;
/// use std::path::Path;
///
/// let mut cache = LedgerCache::new();
/// let rows = cache.load(Path::new("transactions.csv"))?.row_count();
/// println!("{rows} rows");
/// # Ok::<(), insight_core::InsightError>(())
/// ```
#[derive(Default)]
pub struct LedgerCache {
    entries: HashMap<PathBuf, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl LedgerCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the table for `path`, reading it only when it is not cached or
    /// its stamp changed since the last load.
    ///
    /// A failed reload drops the stale entry and propagates the error.
    pub fn load(&mut self, path: &Path) -> Result<&Table> {
        let stamp = SourceStamp::probe(path)?;

        let entry = match self.entries.entry(stamp.path.clone()) {
            Entry::Occupied(occupied) if occupied.get().stamp == stamp => {
                self.hits += 1;
                tracing::debug!(path = %stamp.path.display(), "ledger cache hit");
                occupied.into_mut()
            }
            Entry::Occupied(occupied) => {
                self.misses += 1;
                tracing::debug!(
                    path = %stamp.path.display(),
                    files = stamp.files,
                    "ledger source changed; reloading"
                );
                match load_table(&stamp.path) {
                    Ok(table) => {
                        let slot = occupied.into_mut();
                        *slot = CacheEntry {
                            stamp,
                            table,
                            loaded_at: Instant::now(),
                        };
                        slot
                    }
                    Err(e) => {
                        occupied.remove();
                        return Err(e);
                    }
                }
            }
            Entry::Vacant(vacant) => {
                self.misses += 1;
                tracing::debug!(
                    path = %stamp.path.display(),
                    files = stamp.files,
                    "ledger cache miss"
                );
                let table = load_table(&stamp.path)?;
                vacant.insert(CacheEntry {
                    stamp,
                    table,
                    loaded_at: Instant::now(),
                })
            }
        };

        Ok(&entry.table)
    }

    /// Drop the entry for `path`, forcing the next [`load`](Self::load) to
    /// read it.  Returns `true` if something was cached.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let removed = self.entries.remove(&key).is_some();
        if removed {
            tracing::debug!(path = %key.display(), "ledger cache entry invalidated");
        }
        removed
    }

    /// Discard every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        tracing::debug!("ledger cache cleared");
    }

    /// Time since `path` was last read from disk, or `None` when not cached.
    pub fn cache_age(&self, path: &Path) -> Option<std::time::Duration> {
        let key = path.canonicalize().ok()?;
        self.entries.get(&key).map(|entry| entry.loaded_at.elapsed())
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str =
        "transaction_date,transaction_type,category,subcategory,transaction_amount\n";

    fn write_ledger(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("{HEADER}{body}")).unwrap();
        path
    }

    // ── load ──────────────────────────────────────────────────────────────

    #[test]
    fn test_second_load_is_a_hit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ledger(dir.path(), "ledger.csv", "2023-01-15,Expense,Food,Groceries,50\n");

        let mut cache = LedgerCache::new();
        let first = cache.load(&path).unwrap().clone();
        let second = cache.load(&path).unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_changed_source_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ledger(dir.path(), "ledger.csv", "2023-01-15,Expense,Food,Groceries,50\n");

        let mut cache = LedgerCache::new();
        assert_eq!(cache.load(&path).unwrap().row_count(), 1);

        write_ledger(
            dir.path(),
            "ledger.csv",
            "2023-01-15,Expense,Food,Groceries,50\n2023-01-20,Income,Job,Salary,1000\n",
        );
        assert_eq!(cache.load(&path).unwrap().row_count(), 2);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_relative_and_absolute_paths_share_an_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ledger(dir.path(), "ledger.csv", "2023-01-15,Expense,Food,Groceries,50\n");
        let dotted = dir.path().join(".").join("ledger.csv");

        let mut cache = LedgerCache::new();
        cache.load(&path).unwrap();
        cache.load(&dotted).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        write_ledger(dir.path(), "a.csv", "2023-01-15,Expense,Food,Groceries,50\n");
        write_ledger(dir.path(), "b.csv", "2023-01-20,Income,Job,Salary,1000\n");

        let mut cache = LedgerCache::new();
        assert_eq!(cache.load(dir.path()).unwrap().row_count(), 2);

        write_ledger(dir.path(), "c.csv", "2023-02-10,Expense,Food,Groceries,30\n");
        assert_eq!(cache.load(dir.path()).unwrap().row_count(), 3);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = LedgerCache::new();
        let err = cache.load(&dir.path().join("absent.csv")).unwrap_err();
        assert!(err.is_fatal());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reload_does_not_modify_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ledger(dir.path(), "ledger.csv", "2023-01-15,Expense,Food,Groceries,50\n");
        let before = fs::read(&path).unwrap();

        let mut cache = LedgerCache::new();
        cache.load(&path).unwrap();
        cache.invalidate(&path);
        cache.load(&path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    // ── invalidate / clear ────────────────────────────────────────────────

    #[test]
    fn test_invalidate_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_ledger(dir.path(), "ledger.csv", "2023-01-15,Expense,Food,Groceries,50\n");

        let mut cache = LedgerCache::new();
        cache.load(&path).unwrap();
        assert!(cache.cache_age(&path).is_some());
        assert!(cache.invalidate(&path));
        assert!(!cache.invalidate(&path));
        assert!(cache.cache_age(&path).is_none());

        cache.load(&path).unwrap();
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_ledger(dir.path(), "a.csv", "2023-01-15,Expense,Food,Groceries,50\n");
        let b = write_ledger(dir.path(), "b.csv", "2023-01-20,Income,Job,Salary,1000\n");

        let mut cache = LedgerCache::new();
        cache.load(&a).unwrap();
        cache.load(&b).unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
