//! Workbook Accessor: opens a spreadsheet container and hands out the three
//! sheets the importer needs.

use std::{
  collections::HashMap,
  fmt,
  fs::File,
  io::{BufReader, Read, Seek},
  path::Path,
};

use calamine::{Ods, Reader, Sheets, Xls, Xlsb, Xlsx};
use serde::{Deserialize, Serialize};

use crate::{
  error::{Error, Result},
  grid::Grid,
  table::{RateSheet, Sheet},
};

// ─── Sheet roles & names ─────────────────────────────────────────────────────

/// The three sheets an import reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetRole {
  Ledger,
  Reference,
  Rate,
}

impl SheetRole {
  pub const ALL: [SheetRole; 3] = [Self::Ledger, Self::Reference, Self::Rate];
}

impl fmt::Display for SheetRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Ledger => "Ledger",
      Self::Reference => "Reference",
      Self::Rate => "Rate",
    })
  }
}

/// Sheet name for each role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
  pub ledger:    String,
  pub reference: String,
  pub rates:     String,
}

impl Default for SheetNames {
  fn default() -> Self {
    Self {
      ledger:    "DATABASE".to_owned(),
      reference: "Info".to_owned(),
      rates:     "Hourly Rates".to_owned(),
    }
  }
}

impl SheetNames {
  pub fn name(&self, role: SheetRole) -> &str {
    match role {
      SheetRole::Ledger => &self.ledger,
      SheetRole::Reference => &self.reference,
      SheetRole::Rate => &self.rates,
    }
  }
}

// ─── Formats ─────────────────────────────────────────────────────────────────

/// Supported spreadsheet containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
  Xlsx,
  Xlsm,
  Xls,
  Xlsb,
  Ods,
}

impl WorkbookFormat {
  pub fn from_extension(ext: &str) -> Option<Self> {
    match ext.to_ascii_lowercase().as_str() {
      "xlsx" => Some(Self::Xlsx),
      "xlsm" => Some(Self::Xlsm),
      "xls" => Some(Self::Xls),
      "xlsb" => Some(Self::Xlsb),
      "ods" => Some(Self::Ods),
      _ => None,
    }
  }

  pub fn from_path(path: &Path) -> Result<Self> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    Self::from_extension(ext).ok_or_else(|| Error::UnsupportedFormat(ext.to_owned()))
  }
}

fn open_err(e: impl fmt::Display) -> String { e.to_string() }

// ─── Workbook ────────────────────────────────────────────────────────────────

/// Every sheet of a workbook, materialised as raw grids.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
  sheet_names: Vec<String>,
  grids:       HashMap<String, Grid>,
}

/// The three required sheets, parsed.
#[derive(Debug, Clone)]
pub struct RequiredSheets {
  pub ledger:    Sheet,
  pub reference: Sheet,
  pub rates:     RateSheet,
}

impl Workbook {
  /// Open the file at `path`, taking the format from its extension.
  pub fn open(path: &Path) -> Result<Self> {
    let format = WorkbookFormat::from_path(path)?;
    let file = File::open(path).map_err(|e| Error::Open {
      path:   path.to_owned(),
      reason: e.to_string(),
    })?;
    Self::from_reader(BufReader::new(file), format).map_err(|e| match e {
      Error::Open { reason, .. } => Error::Open { path: path.to_owned(), reason },
      other => other,
    })
  }

  /// Read a workbook of the given format from any seekable source.
  pub fn from_reader<RS>(reader: RS, format: WorkbookFormat) -> Result<Self>
  where
    RS: Read + Seek,
  {
    let opened = match format {
      WorkbookFormat::Xlsx | WorkbookFormat::Xlsm => {
        Xlsx::new(reader).map(Sheets::Xlsx).map_err(open_err)
      }
      WorkbookFormat::Xls => Xls::new(reader).map(Sheets::Xls).map_err(open_err),
      WorkbookFormat::Xlsb => Xlsb::new(reader).map(Sheets::Xlsb).map_err(open_err),
      WorkbookFormat::Ods => Ods::new(reader).map(Sheets::Ods).map_err(open_err),
    };
    let mut sheets = opened.map_err(|reason| Error::Open { path: Default::default(), reason })?;

    let sheet_names: Vec<String> = sheets.sheet_names().to_vec();
    let mut grids = HashMap::with_capacity(sheet_names.len());
    for name in &sheet_names {
      let range = sheets.worksheet_range(name).map_err(|e| Error::ReadSheet {
        sheet:  name.clone(),
        reason: e.to_string(),
      })?;
      grids.insert(name.clone(), Grid::from_range(name, &range));
    }

    tracing::debug!(sheets = ?sheet_names, "workbook loaded");
    Ok(Self { sheet_names, grids })
  }

  /// Build a workbook from in-memory grids, keeping their order.
  pub fn from_grids(grids: impl IntoIterator<Item = Grid>) -> Self {
    let mut out = Self::default();
    for grid in grids {
      out.sheet_names.push(grid.name.clone());
      out.grids.insert(grid.name.clone(), grid);
    }
    out
  }

  pub fn sheet_names(&self) -> &[String] { &self.sheet_names }

  /// The sheet called `name`, falling back to a trimmed, case-insensitive
  /// match.
  pub fn grid(&self, name: &str) -> Option<&Grid> {
    self.grids.get(name).or_else(|| {
      let wanted = name.trim();
      self
        .sheet_names
        .iter()
        .find(|n| n.trim().eq_ignore_ascii_case(wanted))
        .and_then(|n| self.grids.get(n))
    })
  }

  pub fn grid_for(&self, role: SheetRole, names: &SheetNames) -> Result<&Grid> {
    let name = names.name(role);
    self.grid(name).ok_or_else(|| Error::MissingSheet { role, name: name.to_owned() })
  }

  pub fn ledger(&self, names: &SheetNames) -> Result<Sheet> {
    Sheet::from_grid(self.grid_for(SheetRole::Ledger, names)?, 0)
  }

  pub fn reference(&self, names: &SheetNames) -> Result<Sheet> {
    Sheet::from_grid(self.grid_for(SheetRole::Reference, names)?, 0)
  }

  /// The Rate sheet; its field header is on the second physical row.
  pub fn rates(&self, names: &SheetNames) -> Result<RateSheet> {
    RateSheet::from_grid(self.grid_for(SheetRole::Rate, names)?)
  }

  /// All three sheets, or the first [`Error::MissingSheet`].
  pub fn required(&self, names: &SheetNames) -> Result<RequiredSheets> {
    Ok(RequiredSheets {
      ledger:    self.ledger(names)?,
      reference: self.reference(names)?,
      rates:     self.rates(names)?,
    })
  }

  /// Names of the required sheets this workbook lacks.
  pub fn missing_sheets(&self, names: &SheetNames) -> Vec<String> {
    SheetRole::ALL
      .into_iter()
      .map(|role| names.name(role))
      .filter(|name| self.grid(name).is_none())
      .map(str::to_owned)
      .collect()
  }
}


#[cfg(test)]
mod tests {
  use roster_core::CellValue;

  use super::*;

  fn sample(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("roster.xlsx");
    fixture::write_xlsx(&path, &[
      ("DATABASE", vec![vec!["ID", "Name Surname"], vec!["1", "Ada Lovelace"]]),
      ("Info", vec![vec![" ID ", "Company"], vec!["1", "Acme"]]),
      ("Hourly Rates", vec![
        vec!["", "2024", ""],
        vec!["ID", "Currency", "Rate"],
        vec!["1", "USD", "50"],
      ]),
      ("Notes", vec![vec!["free text"]]),
    ]);
    path
  }

  #[test]
  fn opens_xlsx_and_reads_required_sheets() {
    let dir = tempfile::tempdir().unwrap();
    let wb = Workbook::open(&sample(dir.path())).unwrap();

    assert_eq!(wb.sheet_names(), &["DATABASE", "Info", "Hourly Rates", "Notes"]);
    let names = SheetNames::default();
    assert!(wb.missing_sheets(&names).is_empty());

    let req = wb.required(&names).unwrap();
    assert_eq!(req.ledger.columns(), &["ID", "Name Surname"]);
    assert_eq!(req.ledger.row(0).unwrap().get("ID"), &CellValue::Int(1));
    assert_eq!(req.reference.columns(), &["ID", "Company"]);
    assert_eq!(req.rates.table.columns(), &["ID", "Currency", "Rate"]);
    assert_eq!(req.rates.period_labels[1].as_deref(), Some("2024"));
  }

  #[test]
  fn missing_sheet_names_its_role() {
    let wb = Workbook::from_grids([Grid::new("DATABASE", vec![vec!["ID".into()]])]);
    let names = SheetNames::default();
    assert_eq!(wb.missing_sheets(&names), vec!["Info", "Hourly Rates"]);

    match wb.required(&names) {
      Err(Error::MissingSheet { role, name }) => {
        assert_eq!(role, SheetRole::Reference);
        assert_eq!(name, "Info");
      }
      other => panic!("expected MissingSheet, got {other:?}"),
    }
  }

  #[test]
  fn sheet_lookup_tolerates_case_and_padding() {
    let wb = Workbook::from_grids([Grid::new("Hourly Rates ", vec![])]);
    assert!(wb.grid("hourly rates").is_some());
  }

  #[test]
  fn format_comes_from_extension() {
    assert_eq!(WorkbookFormat::from_path(Path::new("a.XLSM")).unwrap(), WorkbookFormat::Xlsm);
    assert!(matches!(
      WorkbookFormat::from_path(Path::new("a.csv")),
      Err(Error::UnsupportedFormat(ext)) if ext == "csv"
    ));
  }

  #[test]
  fn unreadable_file_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.xlsx");
    std::fs::write(&path, b"not a zip").unwrap();
    assert!(matches!(Workbook::open(&path), Err(Error::Open { .. })));
  }
}
