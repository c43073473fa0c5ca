//! Error types for the workbook layer.

use std::path::PathBuf;

use thiserror::Error;

use crate::workbook::SheetRole;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot open workbook {path:?}: {reason}")]
  Open { path: PathBuf, reason: String },

  #[error("cannot read sheet {sheet:?}: {reason}")]
  ReadSheet { sheet: String, reason: String },

  #[error("unsupported workbook format: {0:?}")]
  UnsupportedFormat(String),

  /// One of the three required sheets is absent from the workbook.
  #[error("required {role} sheet {name:?} is missing")]
  MissingSheet { role: SheetRole, name: String },

  #[error("sheet {sheet:?} has no {column} column")]
  HeaderNotFound { sheet: String, column: String },

  #[error("sheet {sheet:?} has no header row {row}")]
  EmptySheet { sheet: String, row: usize },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
