//! [`SqliteStore`], the SQLite implementation of [`RosterStore`].

use std::path::Path;

use chrono::Utc;
use roster_core::{
  LedgerRow, NewLedgerRow, PersonIdentity, RateRecord, ReferenceInfo,
  store::{RosterStore, StoreCounts, Upsert},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    REFERENCE_COLUMNS, RATE_COLUMNS, RawLedgerRow, RawPerson, encode_dt, encode_payload,
    encode_uuid, rate_from_row, reference_from_row,
  },
  error::Error,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A roster store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every clone
/// shares the one connection, so a transaction opened through one clone
/// covers writes made through the others.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(?path, "store opened");
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count(&self, sql: &'static str) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(sql, [], |r| r.get(0))?))
      .await?;
    Ok(u64::try_from(n).unwrap_or_default())
  }
}

fn upsert_outcome(existed: bool) -> Upsert {
  if existed { Upsert::Updated } else { Upsert::Inserted }
}

// ─── RosterStore impl ────────────────────────────────────────────────────────

impl RosterStore for SqliteStore {
  type Error = Error;

  // ── Transactions ──────────────────────────────────────────────────────────

  async fn begin(&self) -> Result<()> { self.batch("BEGIN IMMEDIATE").await }

  async fn commit(&self) -> Result<()> { self.batch("COMMIT").await }

  async fn rollback(&self) -> Result<()> { self.batch("ROLLBACK").await }

  // ── Persons ───────────────────────────────────────────────────────────────

  async fn get_person(&self, external_id: String) -> Result<Option<PersonIdentity>> {
    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {} FROM persons WHERE external_id = ?1", RawPerson::COLUMNS),
            rusqlite::params![external_id],
            RawPerson::from_row,
          )
          .optional()?)
      })
      .await?;

    Ok(raw.map(RawPerson::into_person))
  }

  async fn upsert_person(&self, person: PersonIdentity) -> Result<Upsert> {
    let existed: bool = self
      .conn
      .call(move |conn| {
        let existed = conn
          .query_row(
            "SELECT 1 FROM persons WHERE external_id = ?1",
            rusqlite::params![person.external_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        conn.execute(
          "INSERT INTO persons (external_id, first_name, last_name, active)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (external_id) DO UPDATE SET
             first_name = excluded.first_name,
             last_name  = excluded.last_name,
             active     = excluded.active",
          rusqlite::params![
            person.external_id,
            person.first_name,
            person.last_name,
            person.active,
          ],
        )?;
        Ok(existed)
      })
      .await?;

    Ok(upsert_outcome(existed))
  }

  async fn deactivate_person(&self, external_id: String) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE persons SET active = 0 WHERE external_id = ?1 AND active = 1",
          rusqlite::params![external_id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn list_persons(&self) -> Result<Vec<PersonIdentity>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM persons ORDER BY external_id",
          RawPerson::COLUMNS
        ))?;
        let rows = stmt
          .query_map([], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawPerson::into_person).collect())
  }

  // ── Reference info ────────────────────────────────────────────────────────

  async fn get_reference_info(&self, external_id: String) -> Result<Option<ReferenceInfo>> {
    let info = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {REFERENCE_COLUMNS} FROM reference_info WHERE external_id = ?1"),
            rusqlite::params![external_id],
            reference_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(info)
  }

  async fn upsert_reference_info(&self, info: ReferenceInfo) -> Result<Upsert> {
    let existed: bool = self
      .conn
      .call(move |conn| {
        let existed = conn
          .query_row(
            "SELECT 1 FROM reference_info WHERE external_id = ?1",
            rusqlite::params![info.external_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        conn.execute(
          "INSERT INTO reference_info (
             external_id, company, nationality, title, function,
             discipline, projects, reporting_manager
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT (external_id) DO UPDATE SET
             company           = excluded.company,
             nationality       = excluded.nationality,
             title             = excluded.title,
             function          = excluded.function,
             discipline        = excluded.discipline,
             projects          = excluded.projects,
             reporting_manager = excluded.reporting_manager",
          rusqlite::params![
            info.external_id,
            info.company,
            info.nationality,
            info.title,
            info.function,
            info.discipline,
            info.projects,
            info.reporting_manager,
          ],
        )?;
        Ok(existed)
      })
      .await?;

    Ok(upsert_outcome(existed))
  }

  async fn list_reference_info(&self) -> Result<Vec<ReferenceInfo>> {
    let infos = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REFERENCE_COLUMNS} FROM reference_info ORDER BY external_id"
        ))?;
        let rows = stmt
          .query_map([], reference_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(infos)
  }

  // ── Rates ─────────────────────────────────────────────────────────────────

  async fn get_rate(&self, external_id: String, period: String) -> Result<Option<RateRecord>> {
    let rate = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {RATE_COLUMNS} FROM rates WHERE external_id = ?1 AND period = ?2"),
            rusqlite::params![external_id, period],
            rate_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(rate)
  }

  async fn upsert_rate(&self, rate: RateRecord) -> Result<Upsert> {
    let existed: bool = self
      .conn
      .call(move |conn| {
        let existed = conn
          .query_row(
            "SELECT 1 FROM rates WHERE external_id = ?1 AND period = ?2",
            rusqlite::params![rate.external_id, rate.period],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        conn.execute(
          "INSERT INTO rates (
             external_id, period, rate_value, currency, contract_type, company
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (external_id, period) DO UPDATE SET
             rate_value    = excluded.rate_value,
             currency      = excluded.currency,
             contract_type = excluded.contract_type,
             company       = excluded.company",
          rusqlite::params![
            rate.external_id,
            rate.period,
            rate.rate_value,
            rate.currency,
            rate.contract_type,
            rate.company,
          ],
        )?;
        Ok(existed)
      })
      .await?;

    Ok(upsert_outcome(existed))
  }

  async fn list_rates(&self, external_id: Option<String>) -> Result<Vec<RateRecord>> {
    let rates = self
      .conn
      .call(move |conn| {
        let rows = if let Some(id) = external_id {
          let mut stmt = conn.prepare(&format!(
            "SELECT {RATE_COLUMNS} FROM rates WHERE external_id = ?1 ORDER BY period"
          ))?;
          stmt
            .query_map(rusqlite::params![id], rate_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {RATE_COLUMNS} FROM rates ORDER BY external_id, period"
          ))?;
          stmt
            .query_map([], rate_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;
    Ok(rates)
  }

  // ── Ledger rows ───────────────────────────────────────────────────────────

  async fn delete_all_ledger_rows(&self) -> Result<u64> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM ledger_rows", [])?))
      .await?;
    Ok(removed as u64)
  }

  async fn insert_ledger_row(&self, input: NewLedgerRow) -> Result<LedgerRow> {
    let row = LedgerRow {
      row_id:       Uuid::new_v4(),
      person_label: input.person_label,
      payload:      input.payload,
      recorded_at:  Utc::now(),
    };

    let id_str      = encode_uuid(row.row_id);
    let label       = row.person_label.clone();
    let payload_str = encode_payload(&row.payload)?;
    let at_str      = encode_dt(row.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO ledger_rows (row_id, person_label, payload_json, recorded_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, label, payload_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(row)
  }

  async fn list_ledger_rows(&self) -> Result<Vec<LedgerRow>> {
    let raws: Vec<RawLedgerRow> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT row_id, person_label, payload_json, recorded_at
           FROM ledger_rows ORDER BY seq",
        )?;
        let rows = stmt
          .query_map([], RawLedgerRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLedgerRow::into_ledger_row).collect()
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn counts(&self) -> Result<StoreCounts> {
    Ok(StoreCounts {
      ledger_rows:     self.count("SELECT COUNT(*) FROM ledger_rows").await?,
      persons:         self.count("SELECT COUNT(*) FROM persons").await?,
      active_persons:  self.count("SELECT COUNT(*) FROM persons WHERE active = 1").await?,
      reference_infos: self.count("SELECT COUNT(*) FROM reference_info").await?,
      rates:           self.count("SELECT COUNT(*) FROM rates").await?,
    })
  }
}
