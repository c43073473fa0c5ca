//! Error types for the reconciliation engine.
//!
//! Only whole-import failures surface here. Problems confined to one
//! section or one row are recorded in the [`ImportReport`](crate::ImportReport).

use thiserror::Error;

use crate::report::Section;

#[derive(Debug, Error)]
pub enum Error {
  /// The workbook could not be read, or its Ledger sheet is missing.
  #[error("workbook error: {0}")]
  Sheets(#[from] roster_sheets::Error),

  /// The blocking task reading the workbook panicked or was cancelled.
  #[error("workbook loader failed: {0}")]
  Loader(#[from] tokio::task::JoinError),

  #[error("id column {column:?} not found in sheet {sheet:?}")]
  IdColumnNotFound { sheet: String, column: String },

  #[error("another import is already running")]
  ImportInProgress,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A section failed and its rollback failed too; store state is unknown.
  #[error("rollback of {section} failed: {source}")]
  Transaction {
    section: Section,
    #[source]
    source:  Box<dyn std::error::Error + Send + Sync>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
