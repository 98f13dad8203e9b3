// src/normalize.rs

//! Normalization shared by profile generation and comparison
//!
//! rpm reports capabilities with optional version constraints
//! (`libc.so.6(GLIBC_2.2.5)(64bit) >= 2.17`). Profiles and comparisons work
//! on the bare capability name only, so both sides must be normalized the
//! same way. File lists additionally drop build-id links, which change with
//! every rebuild.

use std::collections::HashSet;

/// Relational operators that start a version constraint
const CONSTRAINT_OPERATORS: [&str; 3] = [" <", " >", " = "];

/// Path component marking build-id debug links
const BUILD_ID_MARKER: &str = "/.build-id/";

/// Strip any version constraint from a capability expression
///
/// The expression is cut at the first ` <`, ` >` or ` = ` and the left-hand
/// side is trimmed. Already bare names are returned unchanged.
pub fn capability_name(raw: &str) -> &str {
    let cut = CONSTRAINT_OPERATORS
        .iter()
        .filter_map(|op| raw.find(op))
        .min()
        .unwrap_or(raw.len());

    raw[..cut].trim()
}

/// Normalize a capability list, keeping the first occurrence of each name
pub fn capabilities<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();

    raw.iter()
        .map(|cap| capability_name(cap.as_ref()))
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Whether a path is a build-id debug link
pub fn is_build_id_path(path: &str) -> bool {
    path.contains(BUILD_ID_MARKER)
}

/// Drop build-id links and blank entries from a file list
pub fn files<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .map(|path| path.as_ref().trim())
        .filter(|path| !path.is_empty() && !is_build_id_path(path))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_name_strips_constraint() {
        assert_eq!(
            capability_name("libc.so.6(GLIBC_2.2.5)(64bit) >= 2.17"),
            "libc.so.6(GLIBC_2.2.5)(64bit)"
        );
        assert_eq!(capability_name("foo >= 1.2"), "foo");
        assert_eq!(capability_name("foo <= 1.2"), "foo");
        assert_eq!(capability_name("foo < 2"), "foo");
        assert_eq!(capability_name("bash = 5.1.8-9.el9"), "bash");
    }

    #[test]
    fn test_capability_name_is_idempotent() {
        let once = capability_name("foo >= 1.2");
        assert_eq!(capability_name(once), once);
        assert_eq!(capability_name("foo"), "foo");
        assert_eq!(capability_name("foo >= 1.2"), capability_name("foo"));
    }

    #[test]
    fn test_capability_name_cuts_at_first_operator() {
        assert_eq!(capability_name("a > 1 = 2"), "a");
        assert_eq!(capability_name("config(bash) = 5.1 < 6"), "config(bash)");
    }

    #[test]
    fn test_capability_name_keeps_parenthesized_names() {
        assert_eq!(capability_name("rtld(GNU_HASH)"), "rtld(GNU_HASH)");
        assert_eq!(capability_name("/bin/sh"), "/bin/sh");
    }

    #[test]
    fn test_capabilities_deduplicates_by_name() {
        let raw = vec!["foo >= 1", "bar", "foo < 2", "baz = 3", "bar"];
        assert_eq!(capabilities(&raw), vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn test_capabilities_drops_blank_entries() {
        let raw = vec!["", "  ", "foo"];
        assert_eq!(capabilities(&raw), vec!["foo"]);
    }

    #[test]
    fn test_build_id_paths_are_excluded() {
        assert!(is_build_id_path("/usr/lib/.build-id/ab/cdef"));
        assert!(!is_build_id_path("/usr/lib/build-id-tool"));

        let raw = vec![
            "/usr/bin/bash",
            "/usr/lib/.build-id/ab/cdef",
            "/usr/lib/.build-id/ab",
            "/etc/bashrc",
        ];
        assert_eq!(files(&raw), vec!["/usr/bin/bash", "/etc/bashrc"]);
    }
}
