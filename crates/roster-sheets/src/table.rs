//! Typed tables built from raw grids: a header row of labels plus
//! normalised data rows.

use std::collections::{BTreeMap, HashMap};

use roster_core::CellValue;

use crate::{
  error::{Error, Result},
  grid::{Cell, Grid},
  normalize::{cell_key, cell_number, format_date, normalize, serial_to_date},
};

// ─── Labels ──────────────────────────────────────────────────────────────────

/// The display label of a header cell, or `None` when the cell is blank.
pub fn cell_label(cell: &Cell) -> Option<String> {
  let label = match cell {
    Cell::Empty | Cell::Error(_) => return None,
    Cell::Text(s) => s.trim().to_owned(),
    Cell::Number(n) => CellValue::from_f64(*n).to_string(),
    Cell::Int(n) => n.to_string(),
    Cell::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_owned(),
    Cell::DateTime(serial) => serial_to_date(*serial)
      .map(format_date)
      .unwrap_or_else(|_| serial.to_string()),
  };
  (!label.is_empty()).then_some(label)
}

/// Column labels for a header row: trimmed, blanks named `Unnamed: <i>`,
/// repeated labels suffixed `.1`, `.2`, … in order of appearance.
pub fn header_labels(cells: &[Cell], width: usize) -> Vec<String> {
  let mut seen: HashMap<String, usize> = HashMap::new();
  (0..width)
    .map(|i| {
      let base = cells
        .get(i)
        .and_then(cell_label)
        .unwrap_or_else(|| format!("Unnamed: {i}"));
      let count = seen.entry(base.clone()).or_insert(0);
      let label = if *count == 0 { base } else { format!("{base}.{count}") };
      *count += 1;
      label
    })
    .collect()
}

// ─── Sheet ───────────────────────────────────────────────────────────────────

/// A header-labelled table of normalised values.
///
/// Rows that are entirely absent are dropped; every kept row has exactly one
/// value per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
  name:    String,
  columns: Vec<String>,
  rows:    Vec<SheetRow>,
}

#[derive(Debug, Clone, PartialEq)]
struct SheetRow {
  /// 0-based physical row in the source grid.
  physical: usize,
  values:   Vec<CellValue>,
  /// The cells `values` were normalised from, kept for key extraction.
  raw:      Vec<Cell>,
}

impl Sheet {
  /// Build a table whose header is physical row `header_row` of `grid`.
  pub fn from_grid(grid: &Grid, header_row: usize) -> Result<Self> {
    let header = grid.row(header_row).ok_or_else(|| Error::EmptySheet {
      sheet: grid.name.clone(),
      row:   header_row,
    })?;

    let width = grid.rows.iter().skip(header_row).map(Vec::len).max().unwrap_or(0);
    let columns = header_labels(header, width);

    let rows = grid
      .rows
      .iter()
      .enumerate()
      .skip(header_row + 1)
      .map(|(physical, cells)| {
        let raw: Vec<Cell> =
          (0..width).map(|i| cells.get(i).cloned().unwrap_or_default()).collect();
        SheetRow { physical, values: raw.iter().map(normalize).collect(), raw }
      })
      .filter(|r| !r.values.iter().all(CellValue::is_absent))
      .collect();

    Ok(Self { name: grid.name.clone(), columns, rows })
  }

  /// Build a table directly from labels and already-normalised rows.
  pub fn from_rows(
    name: impl Into<String>,
    header: &[&str],
    rows: Vec<Vec<CellValue>>,
  ) -> Self {
    let header_cells: Vec<Cell> = header.iter().map(|h| Cell::from(*h)).collect();
    let columns = header_labels(&header_cells, header.len());
    let width = columns.len();
    let rows = rows
      .into_iter()
      .enumerate()
      .map(|(i, mut values)| {
        values.resize(width, CellValue::Absent);
        let raw = values.iter().map(raw_cell).collect();
        SheetRow { physical: i + 1, values, raw }
      })
      .filter(|r| !r.values.iter().all(CellValue::is_absent))
      .collect();
    Self { name: name.into(), columns, rows }
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn columns(&self) -> &[String] { &self.columns }

  pub fn row_count(&self) -> usize { self.rows.len() }

  /// Index of the column labelled exactly `label` (after trimming).
  pub fn column_index(&self, label: &str) -> Option<usize> {
    let label = label.trim();
    self.columns.iter().position(|c| c == label)
  }

  pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
    self.rows.iter().map(|r| self.view(r))
  }

  pub fn row(&self, index: usize) -> Option<Row<'_>> {
    self.rows.get(index).map(|r| self.view(r))
  }

  fn view<'a>(&'a self, r: &'a SheetRow) -> Row<'a> {
    Row {
      physical: r.physical,
      columns:  &self.columns,
      values:   &r.values,
      raw:      &r.raw,
    }
  }
}

/// The raw cell an already-normalised value stands for.
fn raw_cell(value: &CellValue) -> Cell {
  match value {
    CellValue::Absent => Cell::Empty,
    CellValue::Int(n) => Cell::Int(*n),
    CellValue::Float(n) => Cell::Number(*n),
    CellValue::Text(s) => Cell::Text(s.clone()),
  }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// A borrowed view of one data row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
  physical: usize,
  columns:  &'a [String],
  values:   &'a [CellValue],
  raw:      &'a [Cell],
}

impl<'a> Row<'a> {
  /// 1-based spreadsheet row number, for messages.
  pub fn number(&self) -> usize { self.physical + 1 }

  pub fn at(&self, index: usize) -> &'a CellValue {
    static ABSENT: CellValue = CellValue::Absent;
    self.values.get(index).unwrap_or(&ABSENT)
  }

  /// Join key of column `index`, read from the raw cell so that a text id
  /// is never mistaken for a serial date.
  pub fn key_at(&self, index: usize) -> Option<String> {
    self.raw.get(index).and_then(cell_key)
  }

  /// Numeric value of column `index`, read from the raw cell.
  pub fn number_at(&self, index: usize) -> Option<f64> {
    self.raw.get(index).and_then(cell_number)
  }

  pub fn get(&self, label: &str) -> &'a CellValue {
    match self.columns.iter().position(|c| c == label) {
      Some(i) => self.at(i),
      None => self.at(usize::MAX),
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a CellValue)> + 'a {
    self.columns.iter().map(String::as_str).zip(self.values.iter())
  }

  /// Column label → value, for storage.
  pub fn to_payload(&self) -> BTreeMap<String, CellValue> {
    self.iter().map(|(k, v)| (k.to_owned(), v.clone())).collect()
  }
}

// ─── Rate sheet ──────────────────────────────────────────────────────────────

/// The Rate sheet: period labels from physical row 0, field names from
/// physical row 1, data below.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSheet {
  /// Raw period label of each column on row 0; `None` where blank.
  pub period_labels: Vec<Option<String>>,
  pub table:         Sheet,
}

impl RateSheet {
  pub fn from_grid(grid: &Grid) -> Result<Self> {
    let table = Sheet::from_grid(grid, 1)?;
    let period_labels = (0..table.columns().len())
      .map(|i| grid.row(0).and_then(|r| r.get(i)).and_then(cell_label))
      .collect();
    Ok(Self { period_labels, table })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn grid(rows: Vec<Vec<Cell>>) -> Grid { Grid::new("Ledger", rows) }

  #[test]
  fn labels_are_trimmed_named_and_deduplicated() {
    let cells = vec![
      Cell::Text(" ID ".into()),
      Cell::Empty,
      Cell::Text("Rate".into()),
      Cell::Text("Rate".into()),
      Cell::Number(2024.0),
    ];
    assert_eq!(
      header_labels(&cells, 6),
      vec!["ID", "Unnamed: 1", "Rate", "Rate.1", "2024", "Unnamed: 5"]
    );
  }

  #[test]
  fn data_rows_are_normalised_and_blank_rows_dropped() {
    let sheet = Sheet::from_grid(
      &grid(vec![
        vec!["ID".into(), "Week".into()],
        vec![Cell::Number(1.0), Cell::Text("01.03.2025".into())],
        vec![Cell::Empty, Cell::Text("  ".into())],
        vec![Cell::Number(2.0)],
      ]),
      0,
    )
    .unwrap();

    assert_eq!(sheet.columns(), &["ID", "Week"]);
    assert_eq!(sheet.row_count(), 2);

    let first = sheet.row(0).unwrap();
    assert_eq!(first.number(), 2);
    assert_eq!(first.get("ID"), &CellValue::Int(1));
    assert_eq!(first.get("Week"), &CellValue::Text("2025-03-01".into()));

    let second = sheet.row(1).unwrap();
    assert_eq!(second.number(), 4);
    assert_eq!(second.get("Week"), &CellValue::Absent);
    assert_eq!(second.get("missing"), &CellValue::Absent);
  }

  #[test]
  fn keys_come_from_raw_cells() {
    let sheet = Sheet::from_grid(
      &grid(vec![
        vec!["Sicil No".into(), "Rate".into()],
        vec![Cell::Text("4500".into()), Cell::Text("5000".into())],
        vec![Cell::Number(4501.0), Cell::Empty],
      ]),
      0,
    )
    .unwrap();

    let text_id = sheet.row(0).unwrap();
    assert_eq!(text_id.at(0), &CellValue::Text("1912-04-26".into()));
    assert_eq!(text_id.key_at(0).as_deref(), Some("4500"));
    assert_eq!(text_id.number_at(1), Some(5000.0));

    let numeric_id = sheet.row(1).unwrap();
    assert_eq!(numeric_id.key_at(0).as_deref(), Some("4501"));
    assert_eq!(numeric_id.key_at(1), None);
    assert_eq!(numeric_id.number_at(1), None);
    assert_eq!(numeric_id.key_at(9), None);
  }

  #[test]
  fn missing_header_row_is_an_error() {
    let err = Sheet::from_grid(&grid(vec![]), 0).unwrap_err();
    assert!(matches!(err, Error::EmptySheet { row: 0, .. }));
  }

  #[test]
  fn rate_sheet_reads_periods_from_first_row() {
    let g = Grid::new("Hourly Rates", vec![
      vec![Cell::Empty, "2024".into(), Cell::Empty, Cell::Number(2025.0)],
      vec!["ID".into(), "Currency".into(), "Rate".into(), "Currency".into(), "Rate".into()],
      vec![Cell::Number(7.0), "USD".into(), Cell::Number(50.0), "EUR".into(), Cell::Number(60.0)],
    ]);
    let rs = RateSheet::from_grid(&g).unwrap();
    assert_eq!(rs.period_labels, vec![
      None,
      Some("2024".into()),
      None,
      Some("2025".into()),
      None
    ]);
    assert_eq!(rs.table.columns(), &["ID", "Currency", "Rate", "Currency.1", "Rate.1"]);
    assert_eq!(rs.table.row_count(), 1);
  }

  #[test]
  fn payload_keeps_every_column() {
    let sheet = Sheet::from_rows("s", &["A", "B"], vec![vec![CellValue::Int(1)]]);
    let payload = sheet.row(0).unwrap().to_payload();
    assert_eq!(payload.len(), 2);
    assert_eq!(payload["B"], CellValue::Absent);
  }
}
