//! Cross-sheet keyed lookups.
//!
//! Emulates the workbook's `XLOOKUP` joins: exact match first, then a match
//! on normalised text (trimmed, case-folded, whitespace runs collapsed). The
//! first matching row in sheet order wins.

use roster_core::CellValue;
use thiserror::Error;

use crate::table::Sheet;

/// Why a lookup fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupMiss {
  #[error("lookup key is empty")]
  NullKey,

  #[error("sheet has no column {0:?}")]
  UnknownColumn(String),

  #[error("no row matches the key")]
  NoMatch,

  #[error("matching row has no value")]
  EmptyValue,
}

/// Lookups against one sheet.
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a> {
  sheet: &'a Sheet,
}

impl<'a> Lookup<'a> {
  pub fn new(sheet: &'a Sheet) -> Self { Self { sheet } }

  pub fn sheet(&self) -> &'a Sheet { self.sheet }

  /// Find the value in `value_column` of the first row whose `key_column`
  /// matches `key`.
  pub fn find(
    &self,
    key: &CellValue,
    key_column: &str,
    value_column: &str,
  ) -> Result<&'a CellValue, LookupMiss> {
    let key_idx = self
      .sheet
      .column_index(key_column)
      .ok_or_else(|| LookupMiss::UnknownColumn(key_column.to_owned()))?;
    let value_idx = self
      .sheet
      .column_index(value_column)
      .ok_or_else(|| LookupMiss::UnknownColumn(value_column.to_owned()))?;
    self.find_at(key, key_idx, value_idx)
  }

  /// [`find`](Self::find) by column index.
  pub fn find_at(
    &self,
    key: &CellValue,
    key_idx: usize,
    value_idx: usize,
  ) -> Result<&'a CellValue, LookupMiss> {
    let Some(wanted) = key.to_key() else {
      return Err(LookupMiss::NullKey);
    };

    let exact = self.sheet.rows().find(|row| {
      row.at(key_idx).loosely_eq(key) || row.key_at(key_idx).as_deref() == Some(wanted.as_str())
    });

    let matched = exact.or_else(|| {
      let wanted = normalize_key(&wanted);
      self
        .sheet
        .rows()
        .find(|row| row.key_at(key_idx).is_some_and(|k| normalize_key(&k) == wanted))
    });

    let value = matched.ok_or(LookupMiss::NoMatch)?.at(value_idx);
    if value.is_absent() {
      return Err(LookupMiss::EmptyValue);
    }
    Ok(value)
  }

  /// Like [`find`](Self::find), collapsing every miss to `default`.
  pub fn lookup_or(
    &self,
    key: &CellValue,
    key_column: &str,
    value_column: &str,
    default: CellValue,
  ) -> CellValue {
    match self.find(key, key_column, value_column) {
      Ok(value) => value.clone(),
      Err(miss) => {
        tracing::trace!(%miss, key = %key, key_column, value_column, "lookup default");
        default
      }
    }
  }
}

/// Trim, case-fold, and collapse internal whitespace runs to one space.
pub fn normalize_key(s: &str) -> String {
  s.split_whitespace()
    .map(str::to_lowercase)
    .collect::<Vec<_>>()
    .join(" ")
}
