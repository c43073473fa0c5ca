//! Read-only summaries of a workbook, shown before an import is run.

use std::collections::HashSet;

use roster_core::CellValue;
use serde::Serialize;

use crate::{
  columns::is_id_candidate,
  table::Sheet,
  workbook::{SheetNames, SheetRole, Workbook},
};

/// Sample rows included per sheet.
pub const SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookPreview {
  pub all_sheets:     Vec<String>,
  pub sheets:         Vec<SheetPreview>,
  pub missing_sheets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetPreview {
  pub name:          String,
  pub role:          SheetRole,
  pub columns:       Vec<String>,
  pub row_count:     usize,
  pub sample_rows:   Vec<Vec<CellValue>>,
  /// Ledger only: columns that could serve as the id column.
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub id_candidates: Vec<IdCandidate>,
  /// Why the sheet could not be read as a table; the other fields are then
  /// empty.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:         Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdCandidate {
  pub column:       String,
  pub unique_count: usize,
}

/// Summarise whichever of the required sheets are present. A sheet that
/// cannot be read is listed with its error instead of failing the preview.
pub fn preview_workbook(workbook: &Workbook, names: &SheetNames) -> WorkbookPreview {
  let mut sheets = Vec::new();
  for role in SheetRole::ALL {
    let name = names.name(role);
    if workbook.grid(name).is_none() {
      continue;
    }
    let table = match role {
      SheetRole::Ledger => workbook.ledger(names),
      SheetRole::Reference => workbook.reference(names),
      SheetRole::Rate => workbook.rates(names).map(|r| r.table),
    };
    sheets.push(match table {
      Ok(table) => preview_sheet(&table, role),
      Err(e) => {
        tracing::warn!(sheet = name, error = %e, "sheet left out of preview");
        unreadable_sheet(name, role, e.to_string())
      }
    });
  }

  WorkbookPreview {
    all_sheets: workbook.sheet_names().to_vec(),
    sheets,
    missing_sheets: workbook.missing_sheets(names),
  }
}

fn unreadable_sheet(name: &str, role: SheetRole, error: String) -> SheetPreview {
  SheetPreview {
    name: name.to_owned(),
    role,
    columns: Vec::new(),
    row_count: 0,
    sample_rows: Vec::new(),
    id_candidates: Vec::new(),
    error: Some(error),
  }
}

fn preview_sheet(table: &Sheet, role: SheetRole) -> SheetPreview {
  let sample_rows = table
    .rows()
    .take(SAMPLE_ROWS)
    .map(|r| r.iter().map(|(_, v)| v.clone()).collect())
    .collect();

  let id_candidates = match role {
    SheetRole::Ledger => table
      .columns()
      .iter()
      .enumerate()
      .filter(|(_, c)| is_id_candidate(c))
      .map(|(i, c)| IdCandidate {
        column:       c.clone(),
        unique_count: table
          .rows()
          .filter_map(|r| r.key_at(i))
          .collect::<HashSet<_>>()
          .len(),
      })
      .collect(),
    _ => Vec::new(),
  };

  SheetPreview {
    name: table.name().to_owned(),
    role,
    columns: table.columns().to_vec(),
    row_count: table.row_count(),
    sample_rows,
    id_candidates,
    error: None,
  }
}
