//! Canonical person identities from noisy Ledger rows.
//!
//! Resolution order for a row's name:
//!   1. explicit first / last name columns (numeric values never count)
//!   2. a combined name column, split on the first whitespace run
//!   3. the Reference sheet's name for the same id, when one is attached
//!   4. `User_<id>` / `-`
//!
//! A repair pass then re-splits rows whose real name was shifted into the
//! last-name column. Resolution is idempotent: an already-valid name is never
//! reshuffled.

use std::sync::OnceLock;

use regex::Regex;
use roster_core::{CellValue, PersonIdentity, entity::LAST_NAME_SENTINEL};
use thiserror::Error;

use crate::{
  columns::{ColumnRole, NAME_RULES, classify_columns, find_id_column, find_role},
  error::{Error, Result},
  lookup::Lookup,
  table::{Row, Sheet},
};

/// Why a Ledger row produced no identity. Skips are counted, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Skip {
  #[error("row has no id")]
  MissingId,

  #[error("id {0:?} is a placeholder")]
  PlaceholderId(String),
}

fn numeric_prefix_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"^\d+\.?\d*\s+").expect("invalid numeric prefix regex"))
}

fn placeholder_name_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"^User_\S+$").expect("invalid placeholder regex"))
}

// ─── Name helpers ────────────────────────────────────────────────────────────

/// Trim and drop a leading numeric token: `"7.0 Sedat Özdilek"` →
/// `"Sedat Özdilek"`.
pub fn clean_name(raw: &str) -> String {
  numeric_prefix_re().replace(raw.trim(), "").trim().to_owned()
}

/// Split on the first whitespace run into `(first, rest)`. A single token
/// gets the last-name sentinel.
pub fn split_full_name(full: &str) -> (String, String) {
  let full = full.trim();
  match full.split_once(char::is_whitespace) {
    Some((first, rest)) => (first.to_owned(), rest.trim().to_owned()),
    None => (full.to_owned(), LAST_NAME_SENTINEL.to_owned()),
  }
}

/// Synthetic first name for a person with no usable name.
pub fn placeholder_name(external_id: &str) -> String { format!("User_{external_id}") }

pub fn is_placeholder_name(s: &str) -> bool { placeholder_name_re().is_match(s) }

/// Digits with optional separators: rate and measurement data, never a name.
fn is_numeric_text(s: &str) -> bool {
  let s = s.trim();
  s.chars().any(|c| c.is_ascii_digit())
    && s.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'))
}

fn is_numeric_value(v: &CellValue) -> bool {
  v.is_number() || v.as_text().is_some_and(is_numeric_text)
}

/// Correct a shifted name split.
///
/// When `first` is empty, numeric, or a `User_<id>` placeholder, the real
/// name is taken from `last`: two or more tokens are re-split, one
/// non-numeric token becomes `(token, "-")`, anything else falls back to the
/// placeholder. A valid `first` is returned unchanged.
pub fn repair_name_split(first: &str, last: &str, external_id: &str) -> (String, String) {
  let first = first.trim();
  let last = last.trim();

  if !first.is_empty() && !is_numeric_text(first) && !is_placeholder_name(first) {
    let last = if last.is_empty() || is_numeric_text(last) {
      LAST_NAME_SENTINEL
    } else {
      last
    };
    return (first.to_owned(), last.to_owned());
  }

  let cleaned = clean_name(last);
  let mut tokens = cleaned.split_whitespace();
  match (tokens.next(), tokens.next()) {
    (Some(t), Some(_)) if !is_numeric_text(t) => {
      let (first, rest) = split_full_name(&cleaned);
      let rest = if is_numeric_text(&rest) { LAST_NAME_SENTINEL.to_owned() } else { rest };
      (first, rest)
    }
    (Some(t), None) if t != LAST_NAME_SENTINEL && !is_numeric_text(t) => {
      (t.to_owned(), LAST_NAME_SENTINEL.to_owned())
    }
    _ => (placeholder_name(external_id), LAST_NAME_SENTINEL.to_owned()),
  }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct ReferenceNames<'a> {
  lookup:   Lookup<'a>,
  id_idx:   usize,
  name_idx: usize,
}

/// Resolves Ledger rows into [`PersonIdentity`] values.
#[derive(Debug, Clone)]
pub struct IdentityResolver<'a> {
  id_idx:     usize,
  first_cols: Vec<usize>,
  last_cols:  Vec<usize>,
  full_cols:  Vec<usize>,
  reference:  Option<ReferenceNames<'a>>,
}

impl<'a> IdentityResolver<'a> {
  /// Classify `ledger`'s columns. Fails if `id_column` is not a column.
  pub fn new(ledger: &Sheet, id_column: &str) -> Result<Self> {
    let id_idx =
      ledger.column_index(id_column).ok_or_else(|| Error::HeaderNotFound {
        sheet:  ledger.name().to_owned(),
        column: id_column.to_owned(),
      })?;

    let mut first_cols = Vec::new();
    let mut last_cols = Vec::new();
    let mut full_cols = Vec::new();
    for (idx, role) in classify_columns(ledger.columns(), NAME_RULES) {
      if idx == id_idx {
        continue;
      }
      match role {
        ColumnRole::FirstName => first_cols.push(idx),
        ColumnRole::LastName => last_cols.push(idx),
        ColumnRole::FullName => full_cols.push(idx),
        _ => {}
      }
    }

    tracing::debug!(
      sheet = ledger.name(),
      ?first_cols,
      ?last_cols,
      ?full_cols,
      "name columns"
    );

    Ok(Self { id_idx, first_cols, last_cols, full_cols, reference: None })
  }

  /// Fall back to `reference`'s name column for rows with no usable name.
  /// A reference sheet without an id or name column is ignored.
  pub fn with_reference(mut self, reference: &'a Sheet) -> Self {
    let columns = reference.columns();
    let name_idx = find_role(columns, NAME_RULES, ColumnRole::FullName)
      .or_else(|| find_role(columns, NAME_RULES, ColumnRole::FirstName));
    if let (Some(id_idx), Some(name_idx)) = (find_id_column(columns), name_idx) {
      self.reference =
        Some(ReferenceNames { lookup: Lookup::new(reference), id_idx, name_idx });
    }
    self
  }

  /// The row's external id in key form, read from the raw cell.
  pub fn external_id(&self, row: &Row<'_>) -> std::result::Result<String, Skip> {
    let id = row.key_at(self.id_idx).ok_or(Skip::MissingId)?;
    if !id.chars().any(char::is_alphanumeric) {
      return Err(Skip::PlaceholderId(id));
    }
    Ok(id)
  }

  pub fn resolve(&self, row: &Row<'_>) -> std::result::Result<PersonIdentity, Skip> {
    let id = self.external_id(row)?;
    let (first, last) = self.raw_name(row, &id);
    let (first, last) = repair_name_split(&first, &last, &id);
    PersonIdentity::new(id.as_str(), first, last).map_err(|_| Skip::MissingId)
  }

  /// The display label for a Ledger row: the resolved name, or for rows
  /// without an id the first name-like text on the row.
  pub fn person_label(&self, row: &Row<'_>) -> Option<String> {
    if let Ok(person) = self.resolve(row) {
      return Some(person.display_name());
    }
    self
      .full_cols
      .iter()
      .chain(&self.first_cols)
      .find_map(|&i| self.name_at(row, i))
  }

  fn name_at(&self, row: &Row<'_>, idx: usize) -> Option<String> {
    let value = row.at(idx);
    if is_numeric_value(value) {
      return None;
    }
    let name = clean_name(&value.to_key()?);
    (!name.is_empty() && !is_numeric_text(&name)).then_some(name)
  }

  fn first_name_in(&self, row: &Row<'_>, cols: &[usize]) -> Option<String> {
    cols.iter().find_map(|&i| self.name_at(row, i))
  }

  fn raw_name(&self, row: &Row<'_>, id: &str) -> (String, String) {
    let first = self.first_name_in(row, &self.first_cols);
    let last = self.first_name_in(row, &self.last_cols);
    match (first, last) {
      (Some(first), last) => {
        return (first, last.unwrap_or_else(|| LAST_NAME_SENTINEL.to_owned()));
      }
      // Surname only: the repair pass decides whether it holds a full name.
      (None, Some(last)) => return (String::new(), last),
      (None, None) => {}
    }

    if let Some(full) = self.first_name_in(row, &self.full_cols) {
      return split_full_name(&full);
    }

    if let Some(full) = self.reference_name(id) {
      tracing::debug!(row = row.number(), id, "name taken from reference sheet");
      return split_full_name(&full);
    }

    (placeholder_name(id), LAST_NAME_SENTINEL.to_owned())
  }

  fn reference_name(&self, id: &str) -> Option<String> {
    let r = self.reference?;
    let key = CellValue::Text(id.to_owned());
    let value = r.lookup.find_at(&key, r.id_idx, r.name_idx).ok()?;
    if is_numeric_value(value) {
      return None;
    }
    let name = clean_name(&value.to_key()?);
    (!name.is_empty()).then_some(name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grid::{Cell, Grid};

  fn sheet(header: &[&str], rows: Vec<Vec<CellValue>>) -> Sheet {
    Sheet::from_rows("DATABASE", header, rows)
  }

  fn resolve_one(s: &Sheet) -> std::result::Result<PersonIdentity, Skip> {
    let resolver = IdentityResolver::new(s, "ID").unwrap();
    resolver.resolve(&s.row(0).unwrap())
  }

  #[test]
  fn cleans_numeric_prefixes() {
    assert_eq!(clean_name("7.0 Sedat Özdilek"), "Sedat Özdilek");
    assert_eq!(clean_name("  12 Ali Veli "), "Ali Veli");
    assert_eq!(clean_name("Ali"), "Ali");
    assert_eq!(clean_name("2Pac"), "2Pac");
  }

  #[test]
  fn splits_on_first_whitespace_run() {
    assert_eq!(split_full_name("Elif   Ayan Aktimur"), ("Elif".into(), "Ayan Aktimur".into()));
    assert_eq!(split_full_name("Cher"), ("Cher".into(), "-".into()));
  }

  #[test]
  fn explicit_columns_win() {
    let s = sheet(&["ID", "First Name", "Last Name", "Name Surname"], vec![vec![
      CellValue::Int(1),
      "Ada".into(),
      "Lovelace".into(),
      "Someone Else".into(),
    ]]);
    let p = resolve_one(&s).unwrap();
    assert_eq!((p.first_name.as_str(), p.last_name.as_str()), ("Ada", "Lovelace"));
    assert_eq!(p.external_id, "1");
    assert!(p.active);
  }

  #[test]
  fn combined_name_column_is_split() {
    let s = sheet(&["ID", "Name Surname"], vec![vec![
      CellValue::Int(905264),
      "7.0 Sedat Özdilek".into(),
    ]]);
    let p = resolve_one(&s).unwrap();
    assert_eq!((p.first_name.as_str(), p.last_name.as_str()), ("Sedat", "Özdilek"));
  }

  #[test]
  fn numeric_candidates_are_not_names() {
    let s = sheet(&["ID", "First Name", "Surname"], vec![vec![
      CellValue::Int(5),
      CellValue::Float(131.5),
      "John Smith".into(),
    ]]);
    let p = resolve_one(&s).unwrap();
    assert_eq!((p.first_name.as_str(), p.last_name.as_str()), ("John", "Smith"));
  }

  #[test]
  fn numeric_first_name_never_survives() {
    for last in ["John Smith", "7.0 John", "45", "John 45", ""] {
      let s = sheet(&["ID", "First Name", "Surname"], vec![vec![
        CellValue::Int(9),
        CellValue::Int(123),
        last.into(),
      ]]);
      let p = resolve_one(&s).unwrap();
      assert!(!is_numeric_text(&p.first_name), "{last:?} → {p:?}");
      assert!(!is_numeric_text(&p.last_name), "{last:?} → {p:?}");
    }
  }

  #[test]
  fn placeholder_when_no_name() {
    let s = sheet(&["ID", "Hours"], vec![vec![CellValue::Int(77), CellValue::Int(8)]]);
    let p = resolve_one(&s).unwrap();
    assert_eq!((p.first_name.as_str(), p.last_name.as_str()), ("User_77", "-"));
  }

  #[test]
  fn reference_sheet_supplies_missing_names() {
    let ledger = sheet(&["ID", "Hours"], vec![vec![CellValue::Int(77), CellValue::Int(8)]]);
    let info = Sheet::from_rows("Info", &["ID", "Name Surname"], vec![vec![
      CellValue::Int(77),
      "grace  hopper".into(),
    ]]);
    let resolver = IdentityResolver::new(&ledger, "ID").unwrap().with_reference(&info);
    let p = resolver.resolve(&ledger.row(0).unwrap()).unwrap();
    assert_eq!((p.first_name.as_str(), p.last_name.as_str()), ("grace", "hopper"));
  }

  #[test]
  fn repair_is_idempotent() {
    let cases = [
      ("User_5", "John Smith"),
      ("123", "Ayşe"),
      ("", "-"),
      ("Cher", "-"),
      ("Ada", "Lovelace"),
    ];
    for (first, last) in cases {
      let once = repair_name_split(first, last, "5");
      let twice = repair_name_split(&once.0, &once.1, "5");
      assert_eq!(once, twice, "{first:?} {last:?}");
    }
    assert_eq!(repair_name_split("User_5", "John Smith", "5"), ("John".into(), "Smith".into()));
    assert_eq!(repair_name_split("Ada", "Lovelace", "5"), ("Ada".into(), "Lovelace".into()));
  }

  #[test]
  fn text_ids_keep_their_digits() {
    let ledger = Sheet::from_grid(
      &Grid::new("DATABASE", vec![
        vec!["Sicil No".into(), "Hours".into()],
        vec![Cell::Text("4500".into()), Cell::Number(8.0)],
      ]),
      0,
    )
    .unwrap();
    let info = Sheet::from_rows("Info", &["ID", "Name Surname"], vec![vec![
      CellValue::Int(4500),
      "Ada Lovelace".into(),
    ]]);
    let resolver =
      IdentityResolver::new(&ledger, "Sicil No").unwrap().with_reference(&info);
    let p = resolver.resolve(&ledger.row(0).unwrap()).unwrap();
    assert_eq!(p.external_id, "4500");
    assert_eq!((p.first_name.as_str(), p.last_name.as_str()), ("Ada", "Lovelace"));
  }

  #[test]
  fn zero_is_an_ordinary_id() {
    let s = sheet(&["ID", "Name"], vec![vec![CellValue::Int(0), "Ada Lovelace".into()]]);
    assert_eq!(resolve_one(&s).unwrap().external_id, "0");
  }

  #[test]
  fn rows_without_id_are_skipped() {
    let s = sheet(&["ID", "Name"], vec![vec![CellValue::Absent, "Ada Lovelace".into()]]);
    assert_eq!(resolve_one(&s), Err(Skip::MissingId));

    let s = sheet(&["ID", "Name"], vec![vec!["-".into(), "Ada Lovelace".into()]]);
    assert_eq!(resolve_one(&s), Err(Skip::PlaceholderId("-".into())));
  }

  #[test]
  fn person_label_falls_back_to_name_text() {
    let s = sheet(&["ID", "Name"], vec![
      vec![CellValue::Int(3), "Ada Lovelace".into()],
      vec![CellValue::Absent, "3 Grace Hopper".into()],
      vec![CellValue::Absent, CellValue::Int(5)],
    ]);
    let resolver = IdentityResolver::new(&s, "ID").unwrap();
    let labels: Vec<_> = s.rows().map(|r| resolver.person_label(&r)).collect();
    assert_eq!(labels, vec![
      Some("Ada Lovelace".to_owned()),
      Some("Grace Hopper".to_owned()),
      None
    ]);
  }

  #[test]
  fn unknown_id_column_is_an_error() {
    let s = sheet(&["ID"], vec![]);
    assert!(matches!(
      IdentityResolver::new(&s, "Sicil"),
      Err(Error::HeaderNotFound { .. })
    ));
  }
}
