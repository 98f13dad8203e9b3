// src/packages/memory.rs

//! In-memory package source
//!
//! Answers queries from a set of `PackageRecord`s. Used to compare two
//! stored profiles against each other and to exercise the comparison engine
//! without an rpm database.

use crate::error::{Error, Result};
use crate::packages::traits::{Attribute, PackageSource};
use crate::profile::{PackageRecord, Profile};
use std::collections::{BTreeMap, HashSet};

/// Package source backed by in-memory records
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    packages: BTreeMap<String, PackageRecord>,
    /// (package, attribute) pairs whose queries fail with a query error
    failures: HashSet<(String, Attribute)>,
    enumeration_fails: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a package
    pub fn with_package(mut self, name: &str, record: PackageRecord) -> Self {
        self.packages.insert(name.to_string(), record);
        self
    }

    /// Make every query of `attribute` for `name` fail with a query error
    pub fn with_failure(mut self, name: &str, attribute: Attribute) -> Self {
        self.failures.insert((name.to_string(), attribute));
        self
    }

    /// Make package enumeration fail
    pub fn with_failing_enumeration(mut self) -> Self {
        self.enumeration_fails = true;
        self
    }

    fn lookup(&self, name: &str, attribute: Attribute) -> Result<&PackageRecord> {
        if self.failures.contains(&(name.to_string(), attribute)) {
            return Err(Error::QueryError(format!(
                "{} query for '{}' failed",
                attribute, name
            )));
        }

        self.packages
            .get(name)
            .ok_or_else(|| Error::NotInstalled(name.to_string()))
    }
}

impl From<Profile> for MemorySource {
    fn from(profile: Profile) -> Self {
        Self {
            packages: profile.rpms,
            ..Self::default()
        }
    }
}

impl PackageSource for MemorySource {
    fn list_installed(&self) -> Result<Vec<String>> {
        if self.enumeration_fails {
            return Err(Error::EnumerationError(
                "package list unavailable".to_string(),
            ));
        }
        Ok(self.packages.keys().cloned().collect())
    }

    fn requires(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.lookup(name, Attribute::Requires)?.requires.clone())
    }

    fn provides(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.lookup(name, Attribute::Provides)?.provides.clone())
    }

    fn files(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.lookup(name, Attribute::Files)?.files.clone())
    }

    fn version(&self, name: &str) -> Result<String> {
        Ok(self.lookup(name, Attribute::Version)?.version.clone())
    }

    fn size(&self, name: &str) -> Result<u64> {
        Ok(self.lookup(name, Attribute::Size)?.size)
    }
}
