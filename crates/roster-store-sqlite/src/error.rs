//! Error type for `roster-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A stored ledger payload could not be encoded or decoded.
  #[error("ledger payload error: {0}")]
  Payload(#[from] serde_json::Error),

  #[error("invalid ledger row id: {0}")]
  RowId(#[from] uuid::Error),

  #[error("invalid ledger timestamp: {0}")]
  Timestamp(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
