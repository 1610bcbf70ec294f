//! # cbx-io: exchange data loading and normalization
//!
//! Input/output support for cross-border exchange datasets: raw CSV
//! ingestion with dialect detection, hour-slot normalization and partner
//! mapping, plus read/write/validate support for the canonical processed
//! dataset.
//!
//! ## Design Philosophy
//!
//! **Resolve once**: the raw-file dialect, the column mapping and the
//! hour-slot convention are each decided once per file, before any row is
//! converted, so a single load cannot mix interpretations.
//!
//! **Error Recovery**: row-level problems (bad dates, out-of-domain slots,
//! duplicate timestamps) skip the row and land in [`diagnostics`] for user
//! visibility; only structural problems (no parsable dialect, no usable
//! columns) fail the load.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cbx_core::schema::FRANCE_SCHEMA;
//! use cbx_io::loader::load_raw;
//! use cbx_io::processed::write_processed;
//!
//! fn main() -> cbx_core::CbxResult<()> {
//!     let result = load_raw("exchanges.csv".as_ref(), &FRANCE_SCHEMA)?;
//!     if result.diagnostics.has_issues() {
//!         eprintln!("{}", result.diagnostics.summary());
//!     }
//!     write_processed(&result.records, "processed.csv".as_ref())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! 1. **Dialect detection** ([`dialect::Dialect::detect`]) - separator and
//!    encoding from the leading bytes.
//! 2. **Column resolution** - header names matched against the declared
//!    [`cbx_core::schema::ExchangeSchema`].
//! 3. **Convention detection** - 0-23 vs 1-24 from the whole slot column.
//! 4. **Row conversion** - timestamps, positive flows, per-partner nets and
//!    the synthetic overall balance.
//! 5. **Diagnostics reporting** - skipped rows, dropped partners, duplicate
//!    timestamps.

pub mod diagnostics;
pub mod dialect;
pub mod loader;
pub mod processed;
pub mod validate;
