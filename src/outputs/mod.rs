//! Output generation for run results.
//!
//! # Submodules
//!
//! - [`json`]: Writes a dated JSON snapshot of the refreshed records and any
//!   soft failures, for inspection outside the document store

pub mod json;
