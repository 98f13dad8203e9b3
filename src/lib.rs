// src/lib.rs

//! elprofile
//!
//! Package inventory snapshots and compliance checks for RPM-based systems.
//!
//! # Architecture
//!
//! - Profiles: YAML snapshots of every installed package (version, size,
//!   provides, requires, files)
//! - Sources: anything that answers per-package queries; the live rpm
//!   database is one, a stored profile is another
//! - Comparison: lazy, per-package diff of a baseline profile against a
//!   source, reporting only regressions relative to the baseline

pub mod compare;
mod error;
pub mod normalize;
pub mod packages;
pub mod profile;

pub use error::{Error, Result};
