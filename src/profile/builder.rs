// src/profile/builder.rs

//! Build a profile from a live package source

use super::{PackageRecord, Profile};
use crate::error::Result;
use crate::normalize;
use crate::packages::{Attribute, PackageSource};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Snapshot every installed package reported by `source`
///
/// Only enumeration failures are fatal. A failed attribute query logs a
/// warning and leaves that attribute empty, so one broken package still
/// yields a usable profile of the rest of the system. Packages are queried
/// in parallel on the current rayon pool.
pub fn build_profile<S: PackageSource + Sync>(source: &S) -> Result<Profile> {
    let names = source.list_installed()?;
    info!("Profiling {} installed packages", names.len());

    let profile: Profile = names
        .par_iter()
        .map(|name| (name.clone(), build_record(source, name)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect();

    debug!("Profile complete with {} packages", profile.len());
    Ok(profile)
}

fn build_record<S: PackageSource>(source: &S, name: &str) -> PackageRecord {
    PackageRecord {
        provides: or_empty(name, Attribute::Provides, source.provides(name))
            .map(|caps| normalize::capabilities(&caps))
            .unwrap_or_default(),
        requires: or_empty(name, Attribute::Requires, source.requires(name))
            .map(|caps| normalize::capabilities(&caps))
            .unwrap_or_default(),
        files: or_empty(name, Attribute::Files, source.files(name))
            .map(|files| normalize::files(&files))
            .unwrap_or_default(),
        version: or_empty(name, Attribute::Version, source.version(name)).unwrap_or_default(),
        size: or_empty(name, Attribute::Size, source.size(name)).unwrap_or_default(),
    }
}

fn or_empty<T>(name: &str, attribute: Attribute, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Could not obtain {} for {}: {}", attribute, name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::packages::MemorySource;

    fn live_record() -> PackageRecord {
        PackageRecord {
            version: "5.1.8-9.el9".to_string(),
            size: 7738634,
            provides: vec!["bash = 5.1.8-9.el9".to_string(), "/bin/bash".to_string()],
            requires: vec![
                "libc.so.6(GLIBC_2.34)(64bit)".to_string(),
                "rtld(GNU_HASH)".to_string(),
                "filesystem >= 3".to_string(),
            ],
            files: vec![
                "/usr/bin/bash".to_string(),
                "/usr/lib/.build-id/ab/cdef".to_string(),
            ],
        }
    }

    #[test]
    fn test_build_profile_normalizes_records() {
        let source = MemorySource::new().with_package("bash", live_record());
        let profile = build_profile(&source).unwrap();

        let bash = profile.get("bash").unwrap();
        assert_eq!(bash.version, "5.1.8-9.el9");
        assert_eq!(bash.size, 7738634);
        assert_eq!(bash.provides, vec!["bash", "/bin/bash"]);
        assert_eq!(
            bash.requires,
            vec!["libc.so.6(GLIBC_2.34)(64bit)", "rtld(GNU_HASH)", "filesystem"]
        );
        assert_eq!(bash.files, vec!["/usr/bin/bash"]);
    }

    #[test]
    fn test_failed_attribute_is_left_empty() {
        let source = MemorySource::new()
            .with_package("bash", live_record())
            .with_package("zlib", live_record())
            .with_failure("bash", Attribute::Files)
            .with_failure("bash", Attribute::Size);
        let profile = build_profile(&source).unwrap();

        assert_eq!(profile.len(), 2);
        let bash = profile.get("bash").unwrap();
        assert!(bash.files.is_empty());
        assert_eq!(bash.size, 0);
        assert_eq!(bash.version, "5.1.8-9.el9");
        assert_eq!(profile.get("zlib").unwrap().files, vec!["/usr/bin/bash"]);
    }

    #[test]
    fn test_enumeration_failure_is_fatal() {
        let source = MemorySource::new()
            .with_package("bash", live_record())
            .with_failing_enumeration();

        assert!(matches!(
            build_profile(&source),
            Err(Error::EnumerationError(_))
        ));
    }
}
