// src/version.rs

//! Version classification for tracked components
//!
//! Versions are opaque dot-delimited strings published as plain text next to
//! each component's patch archive. Two versions are *base-compatible* when
//! they only differ in the final dot segment: incremental patches are
//! published per base version, so an update that crosses a base boundary
//! cannot be applied on top of the current installation.

use std::fmt;

/// Relationship between a recorded local version and the remote one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    /// Remote matches the recorded version; nothing to do
    UpToDate,
    /// Remote is a base-compatible successor; the patch should be applied
    Outdated,
    /// Remote crosses a base-version boundary; incremental update impossible
    Incompatible,
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate => write!(f, "up to date"),
            Self::Outdated => write!(f, "outdated"),
            Self::Incompatible => write!(f, "incompatible"),
        }
    }
}

/// Compute the base version: the final dot segment replaced by `0`
///
/// A version with no dot is its own base.
///
/// ```
/// use modstack::version::base_version;
///
/// assert_eq!(base_version("1.2.7"), "1.2.0");
/// assert_eq!(base_version("3"), "3");
/// ```
pub fn base_version(version: &str) -> String {
    match version.rfind('.') {
        Some(index) => format!("{}.0", &version[..index]),
        None => version.to_string(),
    }
}

/// Classify a remote version against the locally recorded one
///
/// `recorded` is the empty string for a component that has never been
/// applied; such a component is never incompatible, only outdated.
pub fn classify(recorded: &str, remote: &str) -> VersionStatus {
    if remote == recorded {
        return VersionStatus::UpToDate;
    }

    if !recorded.is_empty() && base_version(remote) != base_version(recorded) {
        return VersionStatus::Incompatible;
    }

    VersionStatus::Outdated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_version_zeroes_final_segment() {
        assert_eq!(base_version("1.2.7"), "1.2.0");
        assert_eq!(base_version("1.2.0"), "1.2.0");
        assert_eq!(base_version("2.0.0"), "2.0.0");
        assert_eq!(base_version("1.9.9"), "1.9.0");
    }

    #[test]
    fn dotless_version_is_its_own_base() {
        assert_eq!(base_version("7"), "7");
        assert_eq!(base_version("nightly"), "nightly");
    }

    #[test]
    fn equal_versions_are_up_to_date() {
        assert_eq!(classify("1.2.3", "1.2.3"), VersionStatus::UpToDate);
    }

    #[test]
    fn same_base_is_outdated() {
        assert_eq!(classify("1.2.3", "1.2.7"), VersionStatus::Outdated);
    }

    #[test]
    fn crossing_base_boundary_is_incompatible() {
        assert_eq!(classify("1.9.9", "2.0.0"), VersionStatus::Incompatible);
        assert_eq!(classify("1.2.3", "1.3.0"), VersionStatus::Incompatible);
    }

    #[test]
    fn never_applied_component_is_outdated_not_incompatible() {
        assert_eq!(classify("", "2.0.0"), VersionStatus::Outdated);
    }
}
