//! Reference-sheet parsing: one [`ReferenceInfo`] per external id.

use std::collections::{HashMap, HashSet};

use roster_core::ReferenceInfo;

use crate::{
  columns::{ColumnRole, REFERENCE_RULES, classify_columns, find_id_column},
  error::{Error, Result},
  table::Sheet,
};

#[derive(Debug, Clone, Default)]
pub struct ReferenceParse {
  /// In sheet order; the first row wins for a repeated id.
  pub infos:   Vec<ReferenceInfo>,
  /// Rows with no id, plus repeats of an id already seen.
  pub skipped: usize,
}

/// Read every Reference row. Fails only when the sheet has no id column.
pub fn parse_reference(sheet: &Sheet) -> Result<ReferenceParse> {
  let id_idx = find_id_column(sheet.columns()).ok_or_else(|| Error::HeaderNotFound {
    sheet:  sheet.name().to_owned(),
    column: "ID".to_owned(),
  })?;

  let mut roles: HashMap<ColumnRole, usize> = HashMap::new();
  for (idx, role) in classify_columns(sheet.columns(), REFERENCE_RULES) {
    roles.entry(role).or_insert(idx);
  }

  let mut out = ReferenceParse::default();
  let mut seen = HashSet::new();
  for row in sheet.rows() {
    let Some(id) = row.key_at(id_idx) else {
      out.skipped += 1;
      continue;
    };
    if !seen.insert(id.clone()) {
      tracing::debug!(row = row.number(), id, "repeated reference id skipped");
      out.skipped += 1;
      continue;
    }

    let field = |role| roles.get(&role).and_then(|&i| row.at(i).to_key());
    out.infos.push(ReferenceInfo {
      company:           field(ColumnRole::Company),
      nationality:       field(ColumnRole::Nationality),
      title:             field(ColumnRole::Title),
      function:          field(ColumnRole::Function),
      discipline:        field(ColumnRole::Discipline),
      projects:          field(ColumnRole::Projects),
      reporting_manager: field(ColumnRole::ReportingManager),
      external_id:       id,
    });
  }

  Ok(out)
}
