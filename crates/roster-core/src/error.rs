//! Error types for `roster-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("external id must not be blank")]
  BlankExternalId,

  #[error("rate value must be a positive finite number, got {0}")]
  InvalidRate(f64),

  #[error("currency must be a three-letter code, got {0:?}")]
  InvalidCurrency(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
