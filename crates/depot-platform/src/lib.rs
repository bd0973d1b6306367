#![forbid(unsafe_code)]
//! Host platform detection and the platform-matching rule used by the
//! artifact subsystem to pick the right binary variant for a machine.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A platform descriptor: required `os`/`arch`, plus an open set of optional
/// attributes (libc flavor, compiler ABI tags, …) recorded as key/value pairs.
///
/// Two platforms "match" when `os` and `arch` are equal and, for every
/// optional attribute present on `self`, `other` carries the same value
/// (subset matching — `other` may carry additional attributes `self` does
/// not care about).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
    /// Optional attributes, e.g. `libc`, `libgfortran_version`,
    /// `libstdcxx_version`, `cxxstring_abi`.
    #[serde(flatten, default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)?;
        for (key, value) in &self.extra {
            write!(f, ";{key}={value}")?;
        }
        Ok(())
    }
}

impl Platform {
    /// Construct a bare `os`/`arch` platform with no optional attributes.
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Platform {
            os: os.into(),
            arch: arch.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Attach an optional attribute, returning `self` for chaining.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Does `self` match `other` under the subset rule described above?
    ///
    /// `self` is typically the declared platform of an `Artifacts.toml`
    /// entry and `other` the detected host platform: every attribute `self`
    /// requires must be present and equal on `other`, but `other` may carry
    /// attributes `self` never mentions.
    #[must_use]
    pub fn matches(&self, other: &Platform) -> bool {
        if self.os != other.os || self.arch != other.arch {
            return false;
        }
        self.extra
            .iter()
            .all(|(key, value)| other.extra.get(key) == Some(value))
    }

    /// Detect the platform of the machine this process is running on.
    ///
    /// Only `os`/`arch` are populated; finer attributes (libc flavor, ABI
    /// tags) require probing the toolchain and are left to callers that have
    /// that information (the artifact subsystem's host-detection step is
    /// documented as running once per process — callers should cache this).
    #[must_use]
    pub fn host() -> Platform {
        Platform::new(host_os(), host_arch())
    }
}

fn host_os() -> &'static str {
    if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "freebsd") {
        "freebsd"
    } else {
        "unknown"
    }
}

fn host_arch() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "x86_64"
    } else if cfg!(target_arch = "aarch64") {
        "aarch64"
    } else if cfg!(target_arch = "x86") {
        "i686"
    } else if cfg!(target_arch = "arm") {
        "armv7l"
    } else {
        "unknown"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bare_platforms_match_on_os_arch() {
        let a = Platform::new("linux", "x86_64");
        let b = Platform::new("linux", "x86_64");
        assert!(a.matches(&b));
    }

    #[test]
    fn mismatched_os_does_not_match() {
        let a = Platform::new("linux", "x86_64");
        let b = Platform::new("macos", "x86_64");
        assert!(!a.matches(&b));
    }

    #[test]
    fn required_attr_must_be_present_on_other() {
        let declared = Platform::new("linux", "x86_64").with_attr("libc", "glibc");
        let host_no_libc = Platform::new("linux", "x86_64");
        assert!(!declared.matches(&host_no_libc));
    }

    #[test]
    fn required_attr_must_match_value() {
        let declared = Platform::new("linux", "x86_64").with_attr("libc", "glibc");
        let host_musl = Platform::new("linux", "x86_64").with_attr("libc", "musl");
        assert!(!declared.matches(&host_musl));
    }

    #[test]
    fn extra_host_attrs_are_ignored() {
        let declared = Platform::new("linux", "x86_64");
        let host = Platform::new("linux", "x86_64").with_attr("libc", "glibc");
        assert!(declared.matches(&host));
    }

    #[test]
    fn host_detects_something() {
        let host = Platform::host();
        assert!(!host.os.is_empty());
        assert!(!host.arch.is_empty());
    }

    #[test]
    fn display_includes_attrs() {
        let p = Platform::new("linux", "x86_64").with_attr("libc", "glibc");
        assert_eq!(p.to_string(), "linux-x86_64;libc=glibc");
    }

    proptest::proptest! {
        #[test]
        fn matches_is_reflexive(os in "[a-z]{3,8}", arch in "[a-z0-9_]{3,8}") {
            let p = Platform::new(os, arch);
            assert!(p.matches(&p));
        }
    }
}
