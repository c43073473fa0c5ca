//! Period-blocked rate parsing.
//!
//! Row 0 of the Rate sheet carries period labels that span runs of columns;
//! row 1 carries field names inside each run. A non-blank label opens a new
//! period that lasts until the next non-blank label. Rate columns left of the
//! first label land in [`UNKNOWN_PERIOD`].

use std::collections::HashMap;

use roster_core::{
  CellValue, RateRecord,
  entity::{DEFAULT_CURRENCY, UNKNOWN_PERIOD, is_currency_code},
};

use crate::{
  columns::{ColumnRole, RATE_RULES, REFERENCE_RULES, classify, find_id_column, find_role},
  error::{Error, Result},
  lookup::Lookup,
  table::{RateSheet, Row, Sheet},
};

// ─── Period map ──────────────────────────────────────────────────────────────

/// The period label in force at each column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodMap {
  periods: Vec<Option<String>>,
}

impl PeriodMap {
  /// Carry each non-blank label rightwards until the next one.
  pub fn from_labels(labels: &[Option<String>]) -> Self {
    let mut current: Option<String> = None;
    let periods = labels
      .iter()
      .map(|label| {
        if let Some(l) = label.as_deref().map(str::trim)
          && !l.is_empty()
        {
          current = Some(l.to_owned());
        }
        current.clone()
      })
      .collect();
    Self { periods }
  }

  /// The column's period, or `None` if no label covers it.
  pub fn get(&self, column: usize) -> Option<&str> {
    self.periods.get(column).and_then(Option::as_deref)
  }

  /// The column's period, defaulting to [`UNKNOWN_PERIOD`].
  pub fn period(&self, column: usize) -> &str { self.get(column).unwrap_or(UNKNOWN_PERIOD) }

  /// Distinct labels in column order.
  pub fn labels(&self) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::new();
    for p in self.periods.iter().flatten() {
      if out.last() != Some(&p.as_str()) {
        out.push(p);
      }
    }
    out
  }
}

// ─── Parser ──────────────────────────────────────────────────────────────────

/// Everything the Rate sheet yielded.
#[derive(Debug, Clone, Default)]
pub struct RateParse {
  /// One record per `(external_id, period)`, in first-seen order. A later
  /// duplicate overwrites the earlier one's values.
  pub records:  Vec<RateRecord>,
  /// Rows without a usable id or with malformed rate cells.
  pub skipped:  usize,
  /// Per-row problems.
  pub errors:   Vec<String>,
  /// Data-quality notes that did not stop parsing, e.g. unlabelled periods.
  pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct ReferenceCompanies<'a> {
  lookup:      Lookup<'a>,
  id_idx:      usize,
  company_idx: usize,
}

/// Turns a [`RateSheet`] into [`RateRecord`]s.
#[derive(Debug, Clone)]
pub struct RateBlockParser<'a> {
  sheet:        &'a RateSheet,
  periods:      PeriodMap,
  id_idx:       usize,
  rate_cols:    Vec<usize>,
  contract_idx: Option<usize>,
  company_idx:  Option<usize>,
  reference:    Option<ReferenceCompanies<'a>>,
}

impl<'a> RateBlockParser<'a> {
  pub fn new(sheet: &'a RateSheet) -> Result<Self> {
    let columns = sheet.table.columns();
    let id_idx = find_id_column(columns).ok_or_else(|| Error::HeaderNotFound {
      sheet:  sheet.table.name().to_owned(),
      column: "ID".to_owned(),
    })?;

    let mut rate_cols = Vec::new();
    let mut contract_idx = None;
    let mut company_idx = None;
    for (i, label) in columns.iter().enumerate() {
      if i == id_idx {
        continue;
      }
      match classify(label, RATE_RULES) {
        Some(ColumnRole::Rate) => rate_cols.push(i),
        Some(ColumnRole::ContractType) => {
          contract_idx.get_or_insert(i);
        }
        Some(ColumnRole::Company) => {
          company_idx.get_or_insert(i);
        }
        _ => {}
      }
    }

    let periods = PeriodMap::from_labels(&sheet.period_labels);
    tracing::debug!(
      sheet = sheet.table.name(),
      periods = ?periods.labels(),
      rate_columns = rate_cols.len(),
      "rate blocks"
    );

    Ok(Self {
      sheet,
      periods,
      id_idx,
      rate_cols,
      contract_idx,
      company_idx,
      reference: None,
    })
  }

  /// Fill missing companies from the Reference sheet by external id.
  pub fn with_reference(mut self, reference: &'a Sheet) -> Self {
    let columns = reference.columns();
    if let (Some(id_idx), Some(company_idx)) = (
      find_id_column(columns),
      find_role(columns, REFERENCE_RULES, ColumnRole::Company),
    ) {
      self.reference =
        Some(ReferenceCompanies { lookup: Lookup::new(reference), id_idx, company_idx });
    }
    self
  }

  pub fn parse(&self) -> RateParse {
    let mut out = RateParse::default();
    let columns = self.sheet.table.columns();

    for &col in &self.rate_cols {
      if self.periods.get(col).is_none() {
        let msg = format!(
          "rate column {:?} is not under a period label; its rates are stored as {UNKNOWN_PERIOD:?}",
          columns[col]
        );
        tracing::warn!(sheet = self.sheet.table.name(), column = %columns[col], "unlabelled rate column");
        out.warnings.push(msg);
      }
    }

    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    for row in self.sheet.table.rows() {
      let Some(id) = row.key_at(self.id_idx) else {
        tracing::debug!(row = row.number(), "rate row without id skipped");
        out.skipped += 1;
        continue;
      };

      let mut malformed = false;
      for record in self.row_records(&row, &id, &mut out.errors, &mut malformed) {
        let key = (record.external_id.clone(), record.period.clone());
        match seen.get(&key) {
          Some(&i) => out.records[i] = record,
          None => {
            seen.insert(key, out.records.len());
            out.records.push(record);
          }
        }
      }
      if malformed {
        out.skipped += 1;
      }
    }

    out
  }

  fn row_records(
    &self,
    row: &Row<'_>,
    id: &str,
    errors: &mut Vec<String>,
    malformed: &mut bool,
  ) -> Vec<RateRecord> {
    let columns = self.sheet.table.columns();
    let contract = self.contract_idx.and_then(|i| row.at(i).to_key());
    let company = self
      .company_idx
      .and_then(|i| row.at(i).to_key())
      .or_else(|| self.reference_company(id));

    let mut records = Vec::new();
    for &col in &self.rate_cols {
      let value = row.at(col);
      if value.is_absent() {
        continue;
      }
      // Raw cell: normalisation turns a text "5000" into a date.
      let rate = match row.number_at(col) {
        Some(rate) if rate <= 0.0 => continue,
        Some(rate) => Ok(rate),
        None => Err(format!(
          "rate {:?} in column {:?} is not a number",
          value.to_string(),
          columns[col]
        )),
      };
      let record = rate.and_then(|rate| {
        let currency = self.currency_before(row, col);
        RateRecord::new(id, self.periods.period(col), rate, &currency)
          .map_err(|e| e.to_string())
      });

      match record {
        Ok(mut record) => {
          record.contract_type = contract.clone();
          record.company = company.clone();
          records.push(record);
        }
        Err(msg) => {
          tracing::debug!(row = row.number(), column = col, %msg, "malformed rate cell");
          errors.push(format!("{} row {}: {msg}", self.sheet.table.name(), row.number()));
          *malformed = true;
        }
      }
    }
    records
  }

  /// The code in the column just before `col`, if it looks like one.
  fn currency_before(&self, row: &Row<'_>, col: usize) -> String {
    col
      .checked_sub(1)
      .and_then(|prev| row.at(prev).as_text())
      .map(str::trim)
      .filter(|s| is_currency_code(s))
      .map(str::to_ascii_uppercase)
      .unwrap_or_else(|| DEFAULT_CURRENCY.to_owned())
  }

  fn reference_company(&self, id: &str) -> Option<String> {
    let r = self.reference?;
    let key = CellValue::Text(id.to_owned());
    r.lookup.find_at(&key, r.id_idx, r.company_idx).ok()?.to_key()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grid::{Cell, Grid};

  fn rate_sheet(rows: Vec<Vec<Cell>>) -> RateSheet {
    RateSheet::from_grid(&Grid::new("Hourly Rates", rows)).unwrap()
  }

  fn header(cells: &[&str]) -> Vec<Cell> { cells.iter().map(|c| Cell::from(*c)).collect() }

  #[test]
  fn period_labels_carry_rightwards() {
    let map = PeriodMap::from_labels(&[
      None,
      Some("2024".into()),
      None,
      Some("2025".into()),
      None,
    ]);
    assert_eq!(map.get(0), None);
    assert_eq!(map.period(0), UNKNOWN_PERIOD);
    assert_eq!(map.period(2), "2024");
    assert_eq!(map.period(4), "2025");
    assert_eq!(map.period(99), UNKNOWN_PERIOD);
    assert_eq!(map.labels(), vec!["2024", "2025"]);
  }

  #[test]
  fn two_row_header_yields_one_record_per_period() {
    let sheet = rate_sheet(vec![
      header(&["", "2024", "", "2025", ""]),
      header(&["ID", "Currency", "Rate", "Currency", "Rate"]),
      vec![
        Cell::Number(7.0),
        "USD".into(),
        Cell::Number(50.0),
        "EUR".into(),
        Cell::Number(60.0),
      ],
    ]);
    let parse = RateBlockParser::new(&sheet).unwrap().parse();

    let got: Vec<_> = parse
      .records
      .iter()
      .map(|r| (r.period.as_str(), r.rate_value, r.currency.as_str()))
      .collect();
    assert_eq!(got, vec![("2024", 50.0, "USD"), ("2025", 60.0, "EUR")]);
    assert!(parse.records.iter().all(|r| r.external_id == "7"));
    assert!(parse.warnings.is_empty());
    assert_eq!(parse.skipped, 0);
  }

  #[test]
  fn missing_currency_defaults_to_usd() {
    let sheet = rate_sheet(vec![
      header(&["", "2024"]),
      header(&["ID", "Hourly Base Rates"]),
      vec![Cell::Number(7.0), Cell::Number(42.5)],
    ]);
    let parse = RateBlockParser::new(&sheet).unwrap().parse();
    assert_eq!(parse.records.len(), 1);
    assert_eq!(parse.records[0].currency, "USD");
    assert_eq!(parse.records[0].rate_value, 42.5);
  }

  #[test]
  fn non_positive_and_blank_rates_emit_nothing() {
    let sheet = rate_sheet(vec![
      header(&["", "2024", "", "2025", ""]),
      header(&["ID", "Currency", "Rate", "Currency", "Rate"]),
      vec![Cell::Number(1.0), "USD".into(), Cell::Number(0.0), "EUR".into(), Cell::Empty],
      vec![Cell::Number(2.0), "USD".into(), Cell::Number(-5.0), "EUR".into(), Cell::Empty],
    ]);
    let parse = RateBlockParser::new(&sheet).unwrap().parse();
    assert!(parse.records.is_empty());
    assert!(parse.errors.is_empty());
    assert_eq!(parse.skipped, 0);
  }

  #[test]
  fn non_numeric_rate_text_marks_the_row_malformed() {
    let sheet = rate_sheet(vec![
      header(&["", "2024", "", "2025", ""]),
      header(&["ID", "Currency", "Rate", "Currency", "Rate"]),
      vec![Cell::Number(2.0), "USD".into(), Cell::Number(40.0), "EUR".into(), "TBD".into()],
    ]);
    let parse = RateBlockParser::new(&sheet).unwrap().parse();
    assert_eq!(parse.records.len(), 1, "the numeric cell still yields a record");
    assert_eq!(parse.skipped, 1);
    assert_eq!(parse.errors.len(), 1);
    assert!(parse.errors[0].contains("row 3"), "{:?}", parse.errors);
    assert!(parse.errors[0].contains("TBD"), "{:?}", parse.errors);
  }

  #[test]
  fn text_ids_and_rates_are_read_from_raw_cells() {
    let sheet = rate_sheet(vec![
      header(&["", "2024", ""]),
      header(&["ID", "Currency", "Monthly Rate"]),
      vec![Cell::Text("4500".into()), "EUR".into(), Cell::Text("5000".into())],
    ]);
    let info = Sheet::from_rows("Info", &["ID", "Company"], vec![vec![
      CellValue::Int(4500),
      "Acme".into(),
    ]]);
    let parse = RateBlockParser::new(&sheet).unwrap().with_reference(&info).parse();
    assert_eq!(parse.records.len(), 1);
    let r = &parse.records[0];
    assert_eq!(r.external_id, "4500");
    assert_eq!(r.rate_value, 5000.0);
    assert_eq!(r.company.as_deref(), Some("Acme"));
  }

  #[test]
  fn unlabelled_rate_column_is_flagged() {
    let sheet = rate_sheet(vec![
      header(&["", "", "2025"]),
      header(&["ID", "Rate", "Rate"]),
      vec![Cell::Number(7.0), Cell::Number(10.0), Cell::Number(20.0)],
    ]);
    let parse = RateBlockParser::new(&sheet).unwrap().parse();
    let periods: Vec<_> = parse.records.iter().map(|r| r.period.as_str()).collect();
    assert_eq!(periods, vec![UNKNOWN_PERIOD, "2025"]);
    assert_eq!(parse.warnings.len(), 1);
    assert!(parse.records[0].is_unknown_period());
  }

  #[test]
  fn duplicate_person_period_keeps_last_values() {
    let sheet = rate_sheet(vec![
      header(&["", "2024", ""]),
      header(&["ID", "Currency", "Rate"]),
      vec![Cell::Number(7.0), "USD".into(), Cell::Number(50.0)],
      vec![Cell::Number(7.0), "EUR".into(), Cell::Number(55.0)],
    ]);
    let parse = RateBlockParser::new(&sheet).unwrap().parse();
    assert_eq!(parse.records.len(), 1);
    assert_eq!(parse.records[0].rate_value, 55.0);
    assert_eq!(parse.records[0].currency, "EUR");
  }

  #[test]
  fn rows_without_id_are_skipped() {
    let sheet = rate_sheet(vec![
      header(&["", "2024", ""]),
      header(&["ID", "Currency", "Rate"]),
      vec![Cell::Empty, "USD".into(), Cell::Number(50.0)],
    ]);
    let parse = RateBlockParser::new(&sheet).unwrap().parse();
    assert!(parse.records.is_empty());
    assert_eq!(parse.skipped, 1);
  }

  #[test]
  fn contract_and_company_are_attached() {
    let sheet = rate_sheet(vec![
      header(&["", "", "", "2024", ""]),
      header(&["No", "Contract", "Company", "Currency", "Rate"]),
      vec![
        Cell::Number(7.0),
        "Fixed".into(),
        Cell::Empty,
        "usd".into(),
        Cell::Number(50.0),
      ],
    ]);
    let info = Sheet::from_rows("Info", &["ID", "Company"], vec![vec![
      CellValue::Int(7),
      "Acme".into(),
    ]]);
    let parse = RateBlockParser::new(&sheet).unwrap().with_reference(&info).parse();
    let r = &parse.records[0];
    assert_eq!(r.contract_type.as_deref(), Some("Fixed"));
    assert_eq!(r.company.as_deref(), Some("Acme"));
    assert_eq!(r.currency, "USD");
  }

  #[test]
  fn missing_id_header_is_an_error() {
    let sheet = rate_sheet(vec![header(&["", "2024"]), header(&["Person", "Rate"])]);
    assert!(matches!(
      RateBlockParser::new(&sheet),
      Err(Error::HeaderNotFound { .. })
    ));
  }
}
