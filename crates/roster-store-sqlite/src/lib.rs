//! [`RosterStore`](roster_core::store::RosterStore) on a single SQLite file.
//!
//! All statements run on `tokio_rusqlite`'s connection thread. Ledger
//! payloads are stored as JSON; everything else gets its own columns.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
