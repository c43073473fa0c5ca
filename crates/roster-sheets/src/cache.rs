//! A single-entry workbook cache with an explicit freshness window.
//!
//! An entry is reused while its path and modification time still match the
//! file on disk and it is younger than the TTL. The cache is constructed once
//! and passed to whoever needs it.

use std::{
  path::{Path, PathBuf},
  sync::{Arc, Mutex, PoisonError},
  time::{Duration, Instant, SystemTime},
};

use crate::{error::Result, workbook::Workbook};

/// Default freshness window.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct Entry {
  path:      PathBuf,
  modified:  Option<SystemTime>,
  loaded_at: Instant,
  workbook:  Arc<Workbook>,
}

#[derive(Debug)]
pub struct WorkbookCache {
  ttl:   Duration,
  entry: Mutex<Option<Entry>>,
}

impl Default for WorkbookCache {
  fn default() -> Self { Self::new(DEFAULT_TTL) }
}

impl WorkbookCache {
  pub fn new(ttl: Duration) -> Self { Self { ttl, entry: Mutex::new(None) } }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// The workbook at `path`, from cache when fresh. `force_reload` always
  /// reads the file again.
  pub fn load(&self, path: &Path, force_reload: bool) -> Result<Arc<Workbook>> {
    let modified = std::fs::metadata(path)?.modified().ok();

    let mut slot = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
    if !force_reload
      && let Some(entry) = slot.as_ref()
      && entry.path == path
      && entry.modified == modified
      && entry.loaded_at.elapsed() < self.ttl
    {
      tracing::debug!(path = %path.display(), "workbook cache hit");
      return Ok(Arc::clone(&entry.workbook));
    }

    let workbook = Arc::new(Workbook::open(path)?);
    *slot = Some(Entry {
      path: path.to_owned(),
      modified,
      loaded_at: Instant::now(),
      workbook: Arc::clone(&workbook),
    });
    tracing::debug!(path = %path.display(), force_reload, "workbook loaded into cache");
    Ok(workbook)
  }

  /// Drop the cached workbook, if any.
  pub fn invalidate(&self) {
    *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::workbook::fixture::write_xlsx;

  fn write(path: &Path, company: &str) {
    write_xlsx(path, &[("Info", vec![vec!["ID", "Company"], vec!["1", company]])]);
  }

  #[test]
  fn fresh_entry_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    write(&path, "Acme");

    let cache = WorkbookCache::default();
    let a = cache.load(&path, false).unwrap();
    let b = cache.load(&path, false).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let c = cache.load(&path, true).unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
  }

  #[test]
  fn zero_ttl_always_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    write(&path, "Acme");

    let cache = WorkbookCache::new(Duration::ZERO);
    let a = cache.load(&path, false).unwrap();
    let b = cache.load(&path, false).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
  }

  #[test]
  fn invalidate_forgets_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    write(&path, "Acme");

    let cache = WorkbookCache::default();
    let a = cache.load(&path, false).unwrap();
    cache.invalidate();
    let b = cache.load(&path, false).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let cache = WorkbookCache::default();
    assert!(matches!(
      cache.load(Path::new("/nonexistent/book.xlsx"), false),
      Err(crate::error::Error::Io(_))
    ));
  }
}
