//! Derived metrics over persisted Ledger rows.
//!
//! These read only what an import already stored; dates are expected in the
//! canonical `YYYY-MM-DD` form the normaliser writes.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use roster_core::{LedgerRow, store::{RosterStore, StoreCounts}};
use roster_sheets::normalize::DATE_FORMAT;
use serde::{Deserialize, Serialize};

/// Ledger column names the metrics read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricColumns {
  pub date_column:       String,
  pub cost_column:       String,
  pub hours_column:      String,
  pub project_column:    String,
  pub company_column:    String,
  pub discipline_column: String,
}

impl Default for MetricColumns {
  fn default() -> Self {
    Self {
      date_column:       "(Week / \nMonth)".to_owned(),
      cost_column:       "General Total\n Cost (USD)".to_owned(),
      hours_column:      "TOTAL\n MH".to_owned(),
      project_column:    "Projects".to_owned(),
      company_column:    "Company".to_owned(),
      discipline_column: "Discipline".to_owned(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  pub records:     usize,
  pub total_cost:  f64,
  pub total_hours: f64,
  pub projects:    usize,
  pub companies:   usize,
  pub disciplines: usize,
}

fn row_date(row: &LedgerRow, column: &str) -> Option<NaiveDate> {
  let text = row.get(column).as_text()?;
  NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

fn row_number(row: &LedgerRow, column: &str) -> f64 {
  row.get(column).as_f64().filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Sum of the cost column per calendar month of `year`, January first.
pub fn monthly_totals(rows: &[LedgerRow], columns: &MetricColumns, year: i32) -> [f64; 12] {
  let mut months = [0.0; 12];
  for row in rows {
    if let Some(date) = row_date(row, &columns.date_column)
      && date.year() == year
    {
      months[date.month0() as usize] += row_number(row, &columns.cost_column);
    }
  }
  months
}

pub fn summarize(rows: &[LedgerRow], columns: &MetricColumns) -> Summary {
  let distinct = |column: &str| {
    rows
      .iter()
      .filter_map(|r| r.get(column).to_key())
      .collect::<HashSet<_>>()
      .len()
  };

  Summary {
    records:     rows.len(),
    total_cost:  rows.iter().map(|r| row_number(r, &columns.cost_column)).sum(),
    total_hours: rows.iter().map(|r| row_number(r, &columns.hours_column)).sum(),
    projects:    distinct(&columns.project_column),
    companies:   distinct(&columns.company_column),
    disciplines: distinct(&columns.discipline_column),
  }
}

pub async fn monthly_aggregate<S: RosterStore>(
  store: &S,
  columns: &MetricColumns,
  year: i32,
) -> Result<[f64; 12], S::Error> {
  let rows = store.list_ledger_rows().await?;
  Ok(monthly_totals(&rows, columns, year))
}

pub async fn summary<S: RosterStore>(
  store: &S,
  columns: &MetricColumns,
) -> Result<Summary, S::Error> {
  let rows = store.list_ledger_rows().await?;
  Ok(summarize(&rows, columns))
}

pub async fn status<S: RosterStore>(store: &S) -> Result<StoreCounts, S::Error> {
  store.counts().await
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use chrono::Utc;
  use roster_core::CellValue;
  use uuid::Uuid;

  use super::*;

  fn row(date: &str, cost: f64, project: &str) -> LedgerRow {
    let columns = MetricColumns::default();
    let mut payload = BTreeMap::new();
    payload.insert(columns.date_column, CellValue::from(date));
    payload.insert(columns.cost_column, CellValue::from(cost));
    payload.insert(columns.hours_column, CellValue::Int(10));
    payload.insert(columns.project_column, CellValue::from(project));
    LedgerRow {
      row_id: Uuid::new_v4(),
      person_label: "Ada Lovelace".into(),
      payload,
      recorded_at: Utc::now(),
    }
  }

  #[test]
  fn monthly_totals_bucket_by_month_of_year() {
    let rows = vec![
      row("2025-03-01", 100.0, "A"),
      row("2025-03-28", 50.5, "A"),
      row("2025-12-31", 10.0, "B"),
      row("2024-03-01", 999.0, "B"),
      row("not a date", 999.0, "B"),
    ];
    let totals = monthly_totals(&rows, &MetricColumns::default(), 2025);
    assert_eq!(totals[2], 150.5);
    assert_eq!(totals[11], 10.0);
    assert_eq!(totals.iter().sum::<f64>(), 160.5);
  }

  #[test]
  fn summary_counts_distinct_values() {
    let rows = vec![row("2025-03-01", 100.0, "A"), row("2025-04-01", 20.0, "B"), row(
      "2025-05-01",
      5.0,
      "A",
    )];
    let s = summarize(&rows, &MetricColumns::default());
    assert_eq!(s.records, 3);
    assert_eq!(s.total_cost, 125.0);
    assert_eq!(s.total_hours, 30.0);
    assert_eq!(s.projects, 2);
    assert_eq!(s.companies, 0);
  }
}
