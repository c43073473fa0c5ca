//! Entity types and the store trait shared by every roster crate.
//!
//! Nothing here reads a workbook or touches a database; `roster-sheets`
//! produces these types and `roster-store-sqlite` persists them.

pub mod entity;
pub mod error;
pub mod store;
pub mod value;

pub use entity::{
  LedgerRow, NewLedgerRow, PersonIdentity, RateRecord, ReferenceInfo,
};
pub use error::{Error, Result};
pub use value::CellValue;
