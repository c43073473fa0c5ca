//! Per-section outcome of an import run.

use std::fmt;

use roster_core::store::Upsert;
use serde::Serialize;
use uuid::Uuid;

/// One entity section of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
  Identities,
  LedgerRows,
  ReferenceInfo,
  Rates,
}

impl fmt::Display for Section {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Identities => "identities",
      Self::LedgerRows => "ledger rows",
      Self::ReferenceInfo => "reference info",
      Self::Rates => "rates",
    })
  }
}

/// Counts and messages for one section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionReport {
  pub imported:    usize,
  pub updated:     usize,
  pub skipped:     usize,
  /// Identities only: people no longer on the Ledger.
  pub deactivated: usize,
  pub errors:      Vec<String>,
  pub warnings:    Vec<String>,
}

impl SectionReport {
  pub fn record(&mut self, outcome: Upsert) {
    match outcome {
      Upsert::Inserted => self.imported += 1,
      Upsert::Updated => self.updated += 1,
    }
  }

  /// Forget counted writes after the section's transaction was discarded.
  pub fn rolled_back(&mut self, message: String) {
    self.imported = 0;
    self.updated = 0;
    self.deactivated = 0;
    self.errors.push(message);
  }

  pub fn is_clean(&self) -> bool { self.errors.is_empty() }
}

/// Result of [`Importer::import_all`](crate::Importer::import_all).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
  pub run_id:         Uuid,
  pub identities:     SectionReport,
  pub ledger_rows:    SectionReport,
  pub reference_info: SectionReport,
  pub rates:          SectionReport,
  /// Every section's errors, prefixed with the section name.
  pub errors:         Vec<String>,
}

impl ImportReport {
  pub fn new(run_id: Uuid) -> Self { Self { run_id, ..Default::default() } }

  pub fn section(&self, section: Section) -> &SectionReport {
    match section {
      Section::Identities => &self.identities,
      Section::LedgerRows => &self.ledger_rows,
      Section::ReferenceInfo => &self.reference_info,
      Section::Rates => &self.rates,
    }
  }

  /// Rebuild [`errors`](Self::errors) from the sections.
  pub fn collect_errors(&mut self) {
    const ALL: [Section; 4] =
      [Section::Identities, Section::LedgerRows, Section::ReferenceInfo, Section::Rates];
    self.errors = ALL
      .into_iter()
      .flat_map(|s| self.section(s).errors.iter().map(move |e| format!("{s}: {e}")))
      .collect();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rollback_clears_counts_but_keeps_skips() {
    let mut r = SectionReport::default();
    r.record(Upsert::Inserted);
    r.record(Upsert::Updated);
    r.skipped = 2;
    r.rolled_back("disk full".into());
    assert_eq!((r.imported, r.updated, r.skipped), (0, 0, 2));
    assert!(!r.is_clean());
  }

  #[test]
  fn errors_are_prefixed_by_section() {
    let mut report = ImportReport::new(Uuid::nil());
    report.reference_info.errors.push("no id column".into());
    report.rates.errors.push("sheet missing".into());
    report.collect_errors();
    assert_eq!(report.errors, vec![
      "reference info: no id column",
      "rates: sheet missing"
    ]);
  }

  #[test]
  fn serialises_with_section_keys() {
    let json = serde_json::to_value(ImportReport::new(Uuid::nil())).unwrap();
    for key in ["identities", "ledgerRows", "referenceInfo", "rates", "errors"] {
      assert!(json.get(key).is_some(), "{key}");
    }
  }
}
