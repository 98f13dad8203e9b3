// src/profile/mod.rs

//! Package profiles
//!
//! A profile is a snapshot of every installed package: version, installed
//! size, provided and required capabilities, and owned files. Profiles are
//! stored as YAML so they can be diffed and reviewed by hand:
//!
//! ```yaml
//! rpms:
//!   bash:
//!     version: 5.1.8-9.el9
//!     size: 7738634
//!     provides: [bash, /bin/bash]
//!     requires: [libc.so.6(GLIBC_2.34)(64bit)]
//!     files: [/usr/bin/bash]
//! ```
//!
//! A loaded profile is never modified; the comparison engine only reads it.

mod builder;

pub use builder::build_profile;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Recorded attributes of one package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageRecord {
    /// Installed version (`[epoch:]version-release`)
    pub version: String,

    /// Installed size in bytes
    pub size: u64,

    /// Provided capability names
    pub provides: Vec<String>,

    /// Required capability names
    pub requires: Vec<String>,

    /// Owned file paths
    pub files: Vec<String>,
}

/// Snapshot of all packages on a system, keyed by package name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Packages in name order
    pub rpms: BTreeMap<String, PackageRecord>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of packages in the profile
    pub fn len(&self) -> usize {
        self.rpms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rpms.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.rpms.get(name)
    }

    /// Iterate packages in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageRecord)> {
        self.rpms.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Parse a profile from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::ProfileParseError(e.to_string()))
    }

    /// Serialize the profile to YAML text
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::ProfileWriteError(e.to_string()))
    }

    /// Load a profile from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading profile from: {}", path.display());

        let yaml = fs::read_to_string(path)
            .map_err(|e| Error::ProfileReadError(format!("{}: {}", path.display(), e)))?;

        let profile = Self::from_yaml_str(&yaml)?;
        debug!("Loaded profile with {} packages", profile.len());
        Ok(profile)
    }

    /// Write the profile as YAML
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let yaml = self.to_yaml_string()?;
        writer.write_all(yaml.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

impl FromIterator<(String, PackageRecord)> for Profile {
    fn from_iter<I: IntoIterator<Item = (String, PackageRecord)>>(iter: I) -> Self {
        Self {
            rpms: iter.into_iter().collect(),
        }
    }
}
