// src/compare/mod.rs

//! Profile comparison engine
//!
//! Compares a baseline profile against a live package source and yields
//! one `Discrepancy` per regression. Only losses relative to the baseline
//! are reported: capabilities or files that exist live but not in the
//! baseline are ignored.
//!
//! Packages are visited in name order and every selected dimension of a
//! package is evaluated before moving on to the next package. The
//! comparison is lazy; the live source is queried as the iterator advances.

pub mod report;

pub use report::{ReportFormat, ReportSummary, Reporter};

use crate::error::{Error, Result};
use crate::normalize;
use crate::packages::{Attribute, PackageSource};
use crate::profile::{PackageRecord, Profile};
use serde::Serialize;
use std::collections::{HashSet, VecDeque, btree_map};
use std::fmt;
use tracing::{debug, warn};

/// A comparison axis; the same set of attributes a source can be asked for
pub type Dimension = Attribute;

/// Default size tolerance in percent of the recorded size
pub const DEFAULT_SIZE_TOLERANCE: f64 = 2.5;

/// Selected comparison dimensions
///
/// An empty selection means the standard set: requires, provides and files.
/// Version and size are opt-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub requires: bool,
    pub provides: bool,
    pub files: bool,
    pub version: bool,
    pub size: bool,
}

impl Dimensions {
    /// Requires, provides and files
    pub fn standard() -> Self {
        Self {
            requires: true,
            provides: true,
            files: true,
            version: false,
            size: false,
        }
    }

    /// Every dimension
    pub fn all() -> Self {
        Self {
            requires: true,
            provides: true,
            files: true,
            version: true,
            size: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.requires || self.provides || self.files || self.version || self.size)
    }

    /// The effective selection, with an empty selection meaning `standard()`
    pub fn resolve(self) -> Self {
        if self.is_empty() { Self::standard() } else { self }
    }

    pub fn contains(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Requires => self.requires,
            Dimension::Provides => self.provides,
            Dimension::Files => self.files,
            Dimension::Version => self.version,
            Dimension::Size => self.size,
        }
    }

    /// Selected dimensions in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = Dimension> + '_ {
        Dimension::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

/// Immutable comparison settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompareOptions {
    pub dimensions: Dimensions,

    /// Allowed size drift in percent of the baseline size
    pub size_tolerance_percent: f64,

    /// Suppress `NotInstalled` reports
    pub quiet: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::standard(),
            size_tolerance_percent: DEFAULT_SIZE_TOLERANCE,
            quiet: false,
        }
    }
}

/// What differs between baseline and live state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// A baseline requirement is no longer required
    MissingRequires { capability: String },

    /// A baseline capability is no longer provided
    MissingProvides { capability: String },

    /// A baseline file is no longer owned by the package
    MissingFile { path: String },

    VersionMismatch { live: String, baseline: String },

    SizeMismatch { live: u64, baseline: u64 },

    /// The package is in the baseline but not installed
    NotInstalled,
}

impl DiscrepancyKind {
    /// Report column label
    pub fn label(&self) -> &'static str {
        match self {
            DiscrepancyKind::MissingRequires { .. } => "MISSING REQUIRES:",
            DiscrepancyKind::MissingProvides { .. } => "MISSING PROVIDES:",
            DiscrepancyKind::MissingFile { .. } => "MISSING FILES:",
            DiscrepancyKind::VersionMismatch { .. } => "VERSION MISMATCH:",
            DiscrepancyKind::SizeMismatch { .. } => "SIZE MISMATCH:",
            DiscrepancyKind::NotInstalled => "NOT INSTALLED",
        }
    }
}

impl fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscrepancyKind::MissingRequires { capability }
            | DiscrepancyKind::MissingProvides { capability } => {
                write!(f, "{:<18} {}", self.label(), capability)
            }
            DiscrepancyKind::MissingFile { path } => write!(f, "{:<18} {}", self.label(), path),
            DiscrepancyKind::VersionMismatch { live, baseline } => {
                write!(f, "{:<18} local={:<25}  profile={}", self.label(), live, baseline)
            }
            DiscrepancyKind::SizeMismatch { live, baseline } => {
                let delta = i128::from(*live) - i128::from(*baseline);
                write!(f, "{:<18} {:+} bytes", self.label(), delta)
            }
            DiscrepancyKind::NotInstalled => f.write_str(self.label()),
        }
    }
}

/// One difference for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub package: String,

    #[serde(flatten)]
    pub kind: DiscrepancyKind,
}

impl Discrepancy {
    pub fn new(package: &str, kind: DiscrepancyKind) -> Self {
        Self {
            package: package.to_string(),
            kind,
        }
    }

    /// Whether this is an actual divergence rather than a missing package
    pub fn is_regression(&self) -> bool {
        self.kind != DiscrepancyKind::NotInstalled
    }
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<40.40} {}", self.package, self.kind)
    }
}

/// Compare `baseline` against `source`
///
/// Returns a lazy iterator; each call to `next` queries the source for at
/// most one more package.
pub fn compare<'a, S: PackageSource>(
    baseline: &'a Profile,
    source: S,
    options: &CompareOptions,
) -> Comparison<'a, S> {
    Comparison {
        packages: baseline.rpms.iter(),
        source,
        options: CompareOptions {
            dimensions: options.dimensions.resolve(),
            ..*options
        },
        pending: VecDeque::new(),
    }
}

/// Lazy comparison of a baseline profile against a package source
pub struct Comparison<'a, S> {
    packages: btree_map::Iter<'a, String, PackageRecord>,
    source: S,
    options: CompareOptions,
    pending: VecDeque<Discrepancy>,
}

impl<S: PackageSource> Iterator for Comparison<'_, S> {
    type Item = Discrepancy;

    fn next(&mut self) -> Option<Discrepancy> {
        loop {
            if let Some(discrepancy) = self.pending.pop_front() {
                return Some(discrepancy);
            }

            let (name, baseline) = self.packages.next()?;
            self.pending = check_package(&self.source, name, baseline, &self.options).into();
        }
    }
}

/// Evaluate every selected dimension for one package
///
/// A `NotInstalled` answer from any query replaces everything found so far
/// with a single `NotInstalled` report (or nothing when quiet).
fn check_package<S: PackageSource>(
    source: &S,
    name: &str,
    baseline: &PackageRecord,
    options: &CompareOptions,
) -> Vec<Discrepancy> {
    let mut found = Vec::new();

    for dimension in options.dimensions.iter() {
        match check_dimension(source, name, baseline, dimension, options) {
            Ok(kinds) => found.extend(kinds.into_iter().map(|kind| Discrepancy::new(name, kind))),
            Err(Error::NotInstalled(_)) => {
                debug!("{} is not installed", name);
                if options.quiet {
                    return Vec::new();
                }
                return vec![Discrepancy::new(name, DiscrepancyKind::NotInstalled)];
            }
            Err(e) => warn!("Could not compare {} for {}: {}", dimension, name, e),
        }
    }

    found
}

fn check_dimension<S: PackageSource>(
    source: &S,
    name: &str,
    baseline: &PackageRecord,
    dimension: Dimension,
    options: &CompareOptions,
) -> Result<Vec<DiscrepancyKind>> {
    let kinds = match dimension {
        Dimension::Requires => missing_capabilities(&baseline.requires, &source.requires(name)?)
            .into_iter()
            .map(|capability| DiscrepancyKind::MissingRequires { capability })
            .collect(),
        Dimension::Provides => missing_capabilities(&baseline.provides, &source.provides(name)?)
            .into_iter()
            .map(|capability| DiscrepancyKind::MissingProvides { capability })
            .collect(),
        Dimension::Files => missing_files(&baseline.files, &source.files(name)?)
            .into_iter()
            .map(|path| DiscrepancyKind::MissingFile { path })
            .collect(),
        Dimension::Version => {
            let live = source.version(name)?;
            if live != baseline.version {
                vec![DiscrepancyKind::VersionMismatch {
                    live,
                    baseline: baseline.version.clone(),
                }]
            } else {
                Vec::new()
            }
        }
        Dimension::Size => {
            let live = source.size(name)?;
            if size_exceeds_tolerance(baseline.size, live, options.size_tolerance_percent) {
                vec![DiscrepancyKind::SizeMismatch {
                    live,
                    baseline: baseline.size,
                }]
            } else {
                Vec::new()
            }
        }
    };

    Ok(kinds)
}

/// Baseline capability names absent from the live list, by name only
pub fn missing_capabilities(baseline: &[String], live: &[String]) -> Vec<String> {
    let live = normalize::capabilities(live);
    let live: HashSet<&str> = live.iter().map(String::as_str).collect();

    normalize::capabilities(baseline)
        .into_iter()
        .filter(|name| !live.contains(name.as_str()))
        .collect()
}

/// Baseline files absent from the live list, ignoring build-id links
pub fn missing_files(baseline: &[String], live: &[String]) -> Vec<String> {
    let live = normalize::files(live);
    let live: HashSet<&str> = live.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();

    normalize::files(baseline)
        .into_iter()
        .filter(|path| !live.contains(path.as_str()))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Whether `live` drifted from `baseline` by more than `tolerance_percent`
/// of the baseline size
///
/// A zero baseline tolerates only a zero live size.
pub fn size_exceeds_tolerance(baseline: u64, live: u64, tolerance_percent: f64) -> bool {
    let delta = (live as f64 - baseline as f64).abs();
    delta > baseline as f64 * (tolerance_percent / 100.0)
}
