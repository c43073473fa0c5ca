//! The reconciliation engine.
//!
//! One import walks four sections in order:
//!
//! ```text
//! validate id column → identities → ledger rows → reference info → rates
//! ```
//!
//! Each section runs in its own store transaction. A section whose sheet is
//! missing or malformed records an error and writes nothing; a section whose
//! store write fails is rolled back on its own. Sections already committed
//! stay committed.

use std::{
  collections::HashSet,
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use roster_core::{
  CellValue, NewLedgerRow, PersonIdentity, RateRecord, ReferenceInfo, store::RosterStore,
};
use roster_sheets::{
  IdentityResolver, RateBlockParser, RateSheet, Sheet, SheetNames, Workbook,
  WorkbookCache, WorkbookPreview, parse_reference, preview_workbook,
};
use tracing::Instrument as _;
use uuid::Uuid;

use crate::{
  error::{Error, Result},
  report::{ImportReport, Section, SectionReport},
};

/// Held for the duration of one import.
struct ImportGuard<'a>(&'a AtomicBool);

impl Drop for ImportGuard<'_> {
  fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

/// Imports workbooks into a [`RosterStore`].
///
/// At most one import runs at a time per `Importer`; a second concurrent
/// call fails with [`Error::ImportInProgress`].
pub struct Importer<S> {
  store:       Arc<S>,
  cache:       Arc<WorkbookCache>,
  sheets:      SheetNames,
  in_progress: AtomicBool,
}

impl<S: RosterStore> Importer<S> {
  pub fn new(store: Arc<S>, cache: Arc<WorkbookCache>, sheets: SheetNames) -> Self {
    Self { store, cache, sheets, in_progress: AtomicBool::new(false) }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn sheet_names(&self) -> &SheetNames { &self.sheets }

  /// Summarise the workbook at `path` without touching the store.
  pub async fn preview(&self, path: &Path, force_reload: bool) -> Result<WorkbookPreview> {
    let workbook = self.load(path, force_reload).await?;
    Ok(preview_workbook(&workbook, &self.sheets))
  }

  /// Import the workbook at `path`, keyed on the Ledger's `id_column`.
  pub async fn import_all(
    &self,
    path: &Path,
    id_column: &str,
    force_reload: bool,
  ) -> Result<ImportReport> {
    let _guard = self.begin_import()?;
    let workbook = self.load(path, force_reload).await?;
    self.run(&workbook, id_column).await
  }

  /// Workbook parsing blocks, so it runs on the blocking pool.
  async fn load(&self, path: &Path, force_reload: bool) -> Result<Arc<Workbook>> {
    let cache = Arc::clone(&self.cache);
    let path = path.to_path_buf();
    let workbook =
      tokio::task::spawn_blocking(move || cache.load(&path, force_reload)).await??;
    Ok(workbook)
  }

  /// Import an already-loaded workbook.
  pub async fn import_workbook(
    &self,
    workbook: &Workbook,
    id_column: &str,
  ) -> Result<ImportReport> {
    let _guard = self.begin_import()?;
    self.run(workbook, id_column).await
  }

  fn begin_import(&self) -> Result<ImportGuard<'_>> {
    self
      .in_progress
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .map_err(|_| Error::ImportInProgress)?;
    Ok(ImportGuard(&self.in_progress))
  }

  async fn run(&self, workbook: &Workbook, id_column: &str) -> Result<ImportReport> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("import", %run_id);
    self.run_sections(workbook, id_column, run_id).instrument(span).await
  }

  async fn run_sections(
    &self,
    workbook: &Workbook,
    id_column: &str,
    run_id: Uuid,
  ) -> Result<ImportReport> {
    let ledger = workbook.ledger(&self.sheets)?;
    if ledger.column_index(id_column).is_none() {
      return Err(Error::IdColumnNotFound {
        sheet:  ledger.name().to_owned(),
        column: id_column.to_owned(),
      });
    }
    let reference = workbook.reference(&self.sheets);
    let rates = workbook.rates(&self.sheets);

    let mut resolver = IdentityResolver::new(&ledger, id_column)?;
    if let Ok(info) = &reference {
      resolver = resolver.with_reference(info);
    }

    let mut report = ImportReport::new(run_id);
    self.import_identities(&ledger, &resolver, &mut report.identities).await?;
    self
      .import_ledger_rows(&ledger, id_column, &resolver, &mut report.ledger_rows)
      .await?;
    self
      .import_reference_info(reference.as_ref(), &mut report.reference_info)
      .await?;
    self
      .import_rates(rates.as_ref(), reference.as_ref().ok(), &mut report.rates)
      .await?;
    report.collect_errors();

    tracing::info!(
      identities = report.identities.imported + report.identities.updated,
      ledger_rows = report.ledger_rows.imported,
      reference_info = report.reference_info.imported + report.reference_info.updated,
      rates = report.rates.imported + report.rates.updated,
      errors = report.errors.len(),
      "import finished"
    );
    Ok(report)
  }

  // ─── Sections ──────────────────────────────────────────────────────────────

  async fn import_identities(
    &self,
    ledger: &Sheet,
    resolver: &IdentityResolver<'_>,
    report: &mut SectionReport,
  ) -> Result<()> {
    let mut current = HashSet::new();
    let mut persons = Vec::new();
    for row in ledger.rows() {
      match resolver.resolve(&row) {
        Ok(person) if current.insert(person.external_id.clone()) => persons.push(person),
        Ok(person) => {
          tracing::debug!(row = row.number(), id = %person.external_id, "repeated id; first row kept");
          report.skipped += 1;
        }
        Err(skip) => {
          tracing::debug!(row = row.number(), %skip, "ledger row has no identity");
          report.skipped += 1;
        }
      }
    }

    self.begin(Section::Identities).await?;
    let written = self.write_identities(&persons, &current, report).await;
    self.finish(Section::Identities, written, report).await
  }

  async fn import_ledger_rows(
    &self,
    ledger: &Sheet,
    id_column: &str,
    resolver: &IdentityResolver<'_>,
    report: &mut SectionReport,
  ) -> Result<()> {
    let id_idx = ledger.column_index(id_column);
    let mut rows = Vec::with_capacity(ledger.row_count());
    for row in ledger.rows() {
      match resolver.person_label(&row) {
        Some(person_label) => {
          let mut payload = row.to_payload();
          // The stored id is the raw key, never a date read out of it.
          if let Some(i) = id_idx
            && let Some(key) = row.key_at(i)
            && row.at(i).to_key().as_ref() != Some(&key)
          {
            payload.insert(ledger.columns()[i].clone(), CellValue::Text(key));
          }
          rows.push(NewLedgerRow { person_label, payload })
        }
        None => {
          tracing::warn!(row = row.number(), "ledger row has neither id nor name");
          report.skipped += 1;
          report.errors.push(format!("{} row {}: no person id or name", ledger.name(), row.number()));
        }
      }
    }

    self.begin(Section::LedgerRows).await?;
    let written = self.write_ledger_rows(rows, report).await;
    self.finish(Section::LedgerRows, written, report).await
  }

  async fn import_reference_info(
    &self,
    sheet: Result<&Sheet, &roster_sheets::Error>,
    report: &mut SectionReport,
  ) -> Result<()> {
    let parsed = match sheet.map_err(ToString::to_string).and_then(|s| {
      parse_reference(s).map_err(|e| e.to_string())
    }) {
      Ok(parsed) => parsed,
      Err(e) => {
        tracing::warn!(section = %Section::ReferenceInfo, error = %e, "section skipped");
        report.errors.push(e);
        return Ok(());
      }
    };
    report.skipped += parsed.skipped;

    self.begin(Section::ReferenceInfo).await?;
    let written = self.write_reference_info(parsed.infos, report).await;
    self.finish(Section::ReferenceInfo, written, report).await
  }

  async fn import_rates(
    &self,
    sheet: Result<&RateSheet, &roster_sheets::Error>,
    reference: Option<&Sheet>,
    report: &mut SectionReport,
  ) -> Result<()> {
    let parser = match sheet.map_err(ToString::to_string).and_then(|s| {
      RateBlockParser::new(s).map_err(|e| e.to_string())
    }) {
      Ok(parser) => parser,
      Err(e) => {
        tracing::warn!(section = %Section::Rates, error = %e, "section skipped");
        report.errors.push(e);
        return Ok(());
      }
    };
    let parser = match reference {
      Some(info) => parser.with_reference(info),
      None => parser,
    };

    let parsed = parser.parse();
    report.skipped += parsed.skipped;
    report.errors.extend(parsed.errors);
    report.warnings.extend(parsed.warnings);

    self.begin(Section::Rates).await?;
    let written = self.write_rates(parsed.records, report).await;
    self.finish(Section::Rates, written, report).await
  }

  // ─── Store writes ──────────────────────────────────────────────────────────

  async fn write_identities(
    &self,
    persons: &[PersonIdentity],
    current: &HashSet<String>,
    report: &mut SectionReport,
  ) -> Result<(), S::Error> {
    for person in persons {
      report.record(self.store.upsert_person(person.clone()).await?);
    }
    for known in self.store.list_persons().await? {
      if known.active
        && !current.contains(&known.external_id)
        && self.store.deactivate_person(known.external_id).await?
      {
        report.deactivated += 1;
      }
    }
    Ok(())
  }

  /// Full replace: no ledger row survives from an earlier import.
  async fn write_ledger_rows(
    &self,
    rows: Vec<NewLedgerRow>,
    report: &mut SectionReport,
  ) -> Result<(), S::Error> {
    let removed = self.store.delete_all_ledger_rows().await?;
    tracing::debug!(removed, "previous ledger rows deleted");
    for row in rows {
      self.store.insert_ledger_row(row).await?;
      report.imported += 1;
    }
    Ok(())
  }

  async fn write_reference_info(
    &self,
    infos: Vec<ReferenceInfo>,
    report: &mut SectionReport,
  ) -> Result<(), S::Error> {
    for info in infos {
      report.record(self.store.upsert_reference_info(info).await?);
    }
    Ok(())
  }

  async fn write_rates(
    &self,
    rates: Vec<RateRecord>,
    report: &mut SectionReport,
  ) -> Result<(), S::Error> {
    for rate in rates {
      report.record(self.store.upsert_rate(rate).await?);
    }
    Ok(())
  }

  // ─── Transactions ──────────────────────────────────────────────────────────

  async fn begin(&self, section: Section) -> Result<()> {
    self.store.begin().await.map_err(|e| {
      tracing::error!(%section, error = %e, "cannot open transaction");
      Error::Store(Box::new(e))
    })
  }

  /// Commit a section, or roll it back and record why.
  async fn finish(
    &self,
    section: Section,
    written: Result<(), S::Error>,
    report: &mut SectionReport,
  ) -> Result<()> {
    let failure = match written {
      Ok(()) => match self.store.commit().await {
        Ok(()) => {
          tracing::info!(
            %section,
            imported = report.imported,
            updated = report.updated,
            skipped = report.skipped,
            "section committed"
          );
          return Ok(());
        }
        Err(e) => e,
      },
      Err(e) => e,
    };

    tracing::warn!(%section, error = %failure, "store write failed; rolling back section");
    report.rolled_back(format!("store write failed: {failure}"));
    self
      .store
      .rollback()
      .await
      .map_err(|e| Error::Transaction { section, source: Box::new(e) })
  }
}
