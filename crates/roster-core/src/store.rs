//! The `RosterStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g. `roster-store-sqlite`).
//! The reconciliation engine depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::entity::{
  LedgerRow, NewLedgerRow, PersonIdentity, RateRecord, ReferenceInfo,
};

// ─── Supporting types ────────────────────────────────────────────────────────

/// What an upsert did to the row identified by its natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
  Inserted,
  Updated,
}

/// Row counts per entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
  pub ledger_rows:     u64,
  pub persons:         u64,
  pub active_persons:  u64,
  pub reference_infos: u64,
  pub rates:           u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a roster store backend.
///
/// Persons, reference infos, and rates are addressed by natural key and
/// written with upsert semantics. Ledger rows have no natural key; they are
/// only ever deleted wholesale and re-inserted.
///
/// Writes between [`begin`](Self::begin) and [`commit`](Self::commit) are
/// atomic. A store serves one writer at a time; callers serialise imports.
pub trait RosterStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Transactions ──────────────────────────────────────────────────────

  /// Open a transaction. Nested transactions are not supported.
  fn begin(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn commit(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Discard every write since [`begin`](Self::begin).
  fn rollback(&self)
  -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Persons ───────────────────────────────────────────────────────────

  fn get_person(
    &self,
    external_id: String,
  ) -> impl Future<Output = Result<Option<PersonIdentity>, Self::Error>> + Send + '_;

  /// Insert or overwrite name and active flag by `external_id`.
  fn upsert_person(
    &self,
    person: PersonIdentity,
  ) -> impl Future<Output = Result<Upsert, Self::Error>> + Send + '_;

  /// Set `active = false`. Returns `true` if the person was active before.
  fn deactivate_person(
    &self,
    external_id: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_persons(
    &self,
  ) -> impl Future<Output = Result<Vec<PersonIdentity>, Self::Error>> + Send + '_;

  // ── Reference info ────────────────────────────────────────────────────

  fn get_reference_info(
    &self,
    external_id: String,
  ) -> impl Future<Output = Result<Option<ReferenceInfo>, Self::Error>> + Send + '_;

  fn upsert_reference_info(
    &self,
    info: ReferenceInfo,
  ) -> impl Future<Output = Result<Upsert, Self::Error>> + Send + '_;

  fn list_reference_info(
    &self,
  ) -> impl Future<Output = Result<Vec<ReferenceInfo>, Self::Error>> + Send + '_;

  // ── Rates ─────────────────────────────────────────────────────────────

  fn get_rate(
    &self,
    external_id: String,
    period: String,
  ) -> impl Future<Output = Result<Option<RateRecord>, Self::Error>> + Send + '_;

  /// Insert or overwrite by `(external_id, period)`.
  fn upsert_rate(
    &self,
    rate: RateRecord,
  ) -> impl Future<Output = Result<Upsert, Self::Error>> + Send + '_;

  /// All rates, or only those of one person.
  fn list_rates(
    &self,
    external_id: Option<String>,
  ) -> impl Future<Output = Result<Vec<RateRecord>, Self::Error>> + Send + '_;

  // ── Ledger rows ───────────────────────────────────────────────────────

  /// Delete every ledger row; returns how many were removed.
  fn delete_all_ledger_rows(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Persist a ledger row. `row_id` and `recorded_at` are set by the store.
  fn insert_ledger_row(
    &self,
    row: NewLedgerRow,
  ) -> impl Future<Output = Result<LedgerRow, Self::Error>> + Send + '_;

  /// All ledger rows in insertion order.
  fn list_ledger_rows(
    &self,
  ) -> impl Future<Output = Result<Vec<LedgerRow>, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn counts(&self)
  -> impl Future<Output = Result<StoreCounts, Self::Error>> + Send + '_;
}
