//! Runtime settings, read from an optional TOML file and `ROSTER_*`
//! environment variables.
//!
//! Nested keys use a double underscore in the environment:
//! `ROSTER_SHEETS__LEDGER=Data`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use roster_sheets::SheetNames;
use serde::Deserialize;

use crate::metrics::MetricColumns;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite file; a leading `~/` is expanded.
  pub store_path:     PathBuf,
  /// Workbook cache freshness window.
  pub cache_ttl_secs: u64,
  pub sheets:         SheetNames,
  pub metrics:        MetricColumns,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      store_path:     PathBuf::from("roster.db"),
      cache_ttl_secs: 300,
      sheets:         SheetNames::default(),
      metrics:        MetricColumns::default(),
    }
  }
}

impl Settings {
  /// Layer `path` (if it exists) and the environment over the defaults.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ROSTER")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }

  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
