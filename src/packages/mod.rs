// src/packages/mod.rs

//! Package data sources for elprofile
//!
//! This module provides the sources a profile can be built from or compared
//! against. Each source implements the `PackageSource` trait.

pub mod memory;
pub mod rpm;
pub mod traits;

pub use memory::MemorySource;
pub use rpm::RpmQuery;
pub use traits::{Attribute, PackageSource};
