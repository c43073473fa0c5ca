//! Reconciliation of roster workbooks into a [`RosterStore`].
//!
//! [`Importer`] ties the workbook layer to a store: it resolves identities,
//! replaces the Ledger, and upserts reference info and rates, one transaction
//! per section. [`metrics`] reads the stored Ledger back out.
//!
//! [`RosterStore`]: roster_core::store::RosterStore

pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;

pub use config::Settings;
pub use engine::Importer;
pub use error::{Error, Result};
pub use metrics::{MetricColumns, Summary};
pub use report::{ImportReport, Section, SectionReport};
