//! Raw physical cells, exactly as the workbook container reports them.
//!
//! A [`Grid`] is positioned absolutely: `rows[0][0]` is cell A1 even when the
//! sheet's used range starts further down or to the right.

use calamine::{Data, Range};

/// A raw cell before normalisation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
  #[default]
  Empty,
  Text(String),
  Number(f64),
  Int(i64),
  Bool(bool),
  /// A date-formatted numeric cell, as a serial day count since 1899-12-30.
  DateTime(f64),
  /// A formula error such as `#N/A`.
  Error(String),
}

impl Cell {
  /// Best-effort string form, used when normalisation has to give up.
  pub fn to_raw_string(&self) -> String {
    match self {
      Self::Empty => String::new(),
      Self::Text(s) | Self::Error(s) => s.clone(),
      Self::Number(n) | Self::DateTime(n) => n.to_string(),
      Self::Int(n) => n.to_string(),
      Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_owned(),
    }
  }
}

impl From<&Data> for Cell {
  fn from(data: &Data) -> Self {
    match data {
      Data::Empty => Self::Empty,
      Data::String(s) => Self::Text(s.clone()),
      Data::Float(n) => Self::Number(*n),
      Data::Int(n) => Self::Int(*n),
      Data::Bool(b) => Self::Bool(*b),
      Data::DateTime(dt) => Self::DateTime(dt.as_f64()),
      Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Text(s.clone()),
      Data::Error(e) => Self::Error(format!("#{e:?}")),
    }
  }
}

impl From<&str> for Cell {
  fn from(s: &str) -> Self {
    if s.is_empty() { Self::Empty } else { Self::Text(s.to_owned()) }
  }
}

impl From<f64> for Cell {
  fn from(n: f64) -> Self { Self::Number(n) }
}

/// All physical rows of one sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
  pub name: String,
  pub rows: Vec<Vec<Cell>>,
}

impl Grid {
  pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
    Self { name: name.into(), rows }
  }

  /// Materialise a calamine range at its absolute position.
  pub fn from_range(name: &str, range: &Range<Data>) -> Self {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];

    for row in range.rows() {
      let mut cells = vec![Cell::Empty; start_col as usize];
      cells.extend(row.iter().map(Cell::from));
      while matches!(cells.last(), Some(Cell::Empty)) {
        cells.pop();
      }
      rows.push(cells);
    }

    Self::new(name, rows)
  }

  pub fn row(&self, index: usize) -> Option<&[Cell]> {
    self.rows.get(index).map(Vec::as_slice)
  }
}
