//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. Ledger payloads are compact JSON objects.
//! UUIDs are hyphenated lowercase strings.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use roster_core::{CellValue, LedgerRow, PersonIdentity, RateRecord, ReferenceInfo};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Timestamp(e.to_string()))
}

// ─── Payload ─────────────────────────────────────────────────────────────────

pub fn encode_payload(payload: &BTreeMap<String, CellValue>) -> Result<String> {
  Ok(serde_json::to_string(payload)?)
}

pub fn decode_payload(s: &str) -> Result<BTreeMap<String, CellValue>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `persons` row.
pub struct RawPerson {
  pub external_id: String,
  pub first_name:  String,
  pub last_name:   String,
  pub active:      bool,
}

impl RawPerson {
  pub const COLUMNS: &'static str = "external_id, first_name, last_name, active";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      external_id: row.get(0)?,
      first_name:  row.get(1)?,
      last_name:   row.get(2)?,
      active:      row.get(3)?,
    })
  }

  pub fn into_person(self) -> PersonIdentity {
    PersonIdentity {
      external_id: self.external_id,
      first_name:  self.first_name,
      last_name:   self.last_name,
      active:      self.active,
    }
  }
}

pub const REFERENCE_COLUMNS: &str = "external_id, company, nationality, title, function, \
                                     discipline, projects, reporting_manager";

pub fn reference_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReferenceInfo> {
  Ok(ReferenceInfo {
    external_id:       row.get(0)?,
    company:           row.get(1)?,
    nationality:       row.get(2)?,
    title:             row.get(3)?,
    function:          row.get(4)?,
    discipline:        row.get(5)?,
    projects:          row.get(6)?,
    reporting_manager: row.get(7)?,
  })
}

pub const RATE_COLUMNS: &str =
  "external_id, period, rate_value, currency, contract_type, company";

pub fn rate_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RateRecord> {
  Ok(RateRecord {
    external_id:   row.get(0)?,
    period:        row.get(1)?,
    rate_value:    row.get(2)?,
    currency:      row.get(3)?,
    contract_type: row.get(4)?,
    company:       row.get(5)?,
  })
}

/// Raw strings read directly from a `ledger_rows` row.
pub struct RawLedgerRow {
  pub row_id:       String,
  pub person_label: String,
  pub payload_json: String,
  pub recorded_at:  String,
}

impl RawLedgerRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      row_id:       row.get(0)?,
      person_label: row.get(1)?,
      payload_json: row.get(2)?,
      recorded_at:  row.get(3)?,
    })
  }

  pub fn into_ledger_row(self) -> Result<LedgerRow> {
    Ok(LedgerRow {
      row_id:       decode_uuid(&self.row_id)?,
      person_label: self.person_label,
      payload:      decode_payload(&self.payload_json)?,
      recorded_at:  decode_dt(&self.recorded_at)?,
    })
  }
}
