// src/packages/traits.rs

//! Common traits for package data sources

use crate::error::Result;
use std::fmt;

/// A per-package attribute a source can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Requires,
    Provides,
    Files,
    Version,
    Size,
}

impl Attribute {
    /// All attributes, in evaluation order
    pub const ALL: [Attribute; 5] = [
        Attribute::Requires,
        Attribute::Provides,
        Attribute::Files,
        Attribute::Version,
        Attribute::Size,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Requires => "requires",
            Attribute::Provides => "provides",
            Attribute::Files => "files",
            Attribute::Version => "version",
            Attribute::Size => "size",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common interface for everything that can answer package queries
///
/// Every call is independent. A failure for one package or attribute must
/// not prevent callers from querying the rest, so implementations report
/// `Error::NotInstalled` for unknown packages and `Error::QueryError` for
/// anything else that went wrong.
pub trait PackageSource {
    /// List the names of all installed packages
    fn list_installed(&self) -> Result<Vec<String>>;

    /// Get the raw capabilities a package requires
    fn requires(&self, name: &str) -> Result<Vec<String>>;

    /// Get the raw capabilities a package provides
    fn provides(&self, name: &str) -> Result<Vec<String>>;

    /// Get the paths owned by a package
    fn files(&self, name: &str) -> Result<Vec<String>>;

    /// Get the installed version (`[epoch:]version-release`)
    fn version(&self, name: &str) -> Result<String>;

    /// Get the installed size in bytes
    fn size(&self, name: &str) -> Result<u64>;
}

impl<S: PackageSource + ?Sized> PackageSource for &S {
    fn list_installed(&self) -> Result<Vec<String>> {
        (**self).list_installed()
    }

    fn requires(&self, name: &str) -> Result<Vec<String>> {
        (**self).requires(name)
    }

    fn provides(&self, name: &str) -> Result<Vec<String>> {
        (**self).provides(name)
    }

    fn files(&self, name: &str) -> Result<Vec<String>> {
        (**self).files(name)
    }

    fn version(&self, name: &str) -> Result<String> {
        (**self).version(name)
    }

    fn size(&self, name: &str) -> Result<u64> {
        (**self).size(name)
    }
}
