//! Reconciled entities: what the store holds after an import.
//!
//! The external id is the only stable join key between entities. Names are
//! presentation data and may legitimately differ in case or diacritics
//! between sheets.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CellValue, Error, Result};

/// Last-name placeholder used when a person has a single-token name.
pub const LAST_NAME_SENTINEL: &str = "-";

/// Period label for rate columns that sit outside any labelled period block.
pub const UNKNOWN_PERIOD: &str = "Unknown Period";

/// Currency assumed when a rate cell has no currency code beside it.
pub const DEFAULT_CURRENCY: &str = "USD";

// ─── Person identity ─────────────────────────────────────────────────────────

/// The canonical person record every other entity joins against.
///
/// Created on first sighting of an external id, updated on every re-import,
/// and never deleted: people who disappear from the Ledger are deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonIdentity {
  pub external_id: String,
  pub first_name:  String,
  pub last_name:   String,
  pub active:      bool,
}

impl PersonIdentity {
  pub fn new(
    external_id: impl Into<String>,
    first_name: impl Into<String>,
    last_name: impl Into<String>,
  ) -> Result<Self> {
    let external_id = external_id.into().trim().to_owned();
    if external_id.is_empty() {
      return Err(Error::BlankExternalId);
    }
    Ok(Self {
      external_id,
      first_name: first_name.into(),
      last_name: last_name.into(),
      active: true,
    })
  }

  /// `"First Last"`, omitting the last-name sentinel.
  pub fn display_name(&self) -> String {
    if self.last_name == LAST_NAME_SENTINEL || self.last_name.is_empty() {
      self.first_name.clone()
    } else {
      format!("{} {}", self.first_name, self.last_name)
    }
  }
}

// ─── Reference info ──────────────────────────────────────────────────────────

/// Descriptive attributes from the Reference sheet; one per external id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceInfo {
  pub external_id:       String,
  pub company:           Option<String>,
  pub nationality:       Option<String>,
  pub title:             Option<String>,
  pub function:          Option<String>,
  pub discipline:        Option<String>,
  /// Free text; comma- or semicolon-delimited project names.
  pub projects:          Option<String>,
  pub reporting_manager: Option<String>,
}

impl ReferenceInfo {
  /// The individual project names, trimmed, blanks dropped.
  pub fn project_list(&self) -> Vec<&str> {
    self
      .projects
      .as_deref()
      .map(|p| {
        p.split([',', ';'])
          .map(str::trim)
          .filter(|s| !s.is_empty())
          .collect()
      })
      .unwrap_or_default()
  }
}

// ─── Rate record ─────────────────────────────────────────────────────────────

/// A billing rate for one person in one period. Unique on
/// `(external_id, period)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
  pub external_id:   String,
  pub period:        String,
  pub rate_value:    f64,
  /// Upper-case three-letter code.
  pub currency:      String,
  pub contract_type: Option<String>,
  pub company:       Option<String>,
}

impl RateRecord {
  pub fn new(
    external_id: impl Into<String>,
    period: impl Into<String>,
    rate_value: f64,
    currency: &str,
  ) -> Result<Self> {
    let external_id = external_id.into().trim().to_owned();
    if external_id.is_empty() {
      return Err(Error::BlankExternalId);
    }
    if !rate_value.is_finite() || rate_value <= 0.0 {
      return Err(Error::InvalidRate(rate_value));
    }
    if !is_currency_code(currency) {
      return Err(Error::InvalidCurrency(currency.to_owned()));
    }
    Ok(Self {
      external_id,
      period: period.into(),
      rate_value,
      currency: currency.to_ascii_uppercase(),
      contract_type: None,
      company: None,
    })
  }

  pub fn is_unknown_period(&self) -> bool { self.period == UNKNOWN_PERIOD }
}

/// Three ASCII letters, any case.
pub fn is_currency_code(s: &str) -> bool {
  s.len() == 3 && s.bytes().all(|b| b.is_ascii_alphabetic())
}

// ─── Ledger rows ─────────────────────────────────────────────────────────────

/// One spreadsheet data row, stored verbatim (after normalisation).
///
/// Ledger rows have no stable key across imports, so the whole set is
/// replaced on every import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerRow {
  pub row_id:       Uuid,
  pub person_label: String,
  /// Original column label → normalised value.
  pub payload:      BTreeMap<String, CellValue>,
  /// Server-assigned timestamp.
  pub recorded_at:  DateTime<Utc>,
}

/// Input to [`crate::store::RosterStore::insert_ledger_row`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerRow {
  pub person_label: String,
  pub payload:      BTreeMap<String, CellValue>,
}

impl LedgerRow {
  pub fn get(&self, column: &str) -> &CellValue {
    static ABSENT: CellValue = CellValue::Absent;
    self.payload.get(column).unwrap_or(&ABSENT)
  }
}
