//! Spreadsheet layer for the roster importer.
//!
//! Reads a workbook with calamine and turns its three sheets into typed
//! values: normalised cells, resolved identities, reference attributes, and
//! period-blocked rates. Pure synchronous; no database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use std::path::Path;
//!
//! use roster_sheets::{IdentityResolver, SheetNames, Workbook};
//!
//! let workbook = Workbook::open(Path::new("roster.xlsx")).unwrap();
//! let ledger = workbook.ledger(&SheetNames::default()).unwrap();
//! let resolver = IdentityResolver::new(&ledger, "Sicil No").unwrap();
//! for row in ledger.rows() {
//!   println!("{:?}", resolver.resolve(&row));
//! }
//! ```

pub mod cache;
pub mod columns;
pub mod error;
pub mod grid;
pub mod identity;
pub mod lookup;
pub mod normalize;
pub mod preview;
pub mod rates;
pub mod reference;
pub mod table;
pub mod workbook;

pub use cache::WorkbookCache;
pub use error::{Error, Result};
pub use identity::{IdentityResolver, Skip};
pub use lookup::{Lookup, LookupMiss};
pub use normalize::normalize;
pub use preview::{WorkbookPreview, preview_workbook};
pub use rates::{RateBlockParser, RateParse};
pub use reference::{ReferenceParse, parse_reference};
pub use table::{RateSheet, Row, Sheet};
pub use workbook::{SheetNames, SheetRole, Workbook, WorkbookFormat};
