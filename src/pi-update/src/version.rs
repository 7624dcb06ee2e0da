//! Version parsing and comparison.
//!
//! Only plain `major.minor.patch` strings are understood. Anything else
//! (a `v` prefix, pre-release tags such as `2.0.0-beta`, build metadata, a
//! fourth segment) fails to parse and is never considered newer.

use std::fmt;

/// A parsed `major.minor.patch` version.
///
/// Field order matters: the derived `Ord` compares major, then minor, then
/// patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTriple {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionTriple {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string of exactly three dot-separated integers.
    ///
    /// Surrounding whitespace is ignored. Returns `None` for a wrong segment
    /// count or a segment that is not an integer; never a partial result.
    pub fn parse(version: &str) -> Option<Self> {
        let mut parts = version.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Check whether `latest` is strictly newer than `current`.
///
/// Returns false when either side fails to parse.
pub fn is_newer(latest: &str, current: &str) -> bool {
    match (VersionTriple::parse(latest), VersionTriple::parse(current)) {
        (Some(latest), Some(current)) => latest > current,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        assert_eq!(
            VersionTriple::parse("1.2.3"),
            Some(VersionTriple::new(1, 2, 3))
        );
        assert_eq!(
            VersionTriple::parse(" 10.0.42\n"),
            Some(VersionTriple::new(10, 0, 42))
        );
        assert_eq!(
            VersionTriple::parse("01.002.0"),
            Some(VersionTriple::new(1, 2, 0))
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in [
            "",
            "1",
            "1.2",
            "1.2.3.4",
            "1..3",
            "v1.2.3",
            "1.2.x",
            "2.0.0-beta",
            "1.2.3+build",
            "bogus",
            "-1.0.0",
        ] {
            assert_eq!(VersionTriple::parse(input), None, "input: {input:?}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(VersionTriple::new(0, 45, 1).to_string(), "0.45.1");
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("2.0.0", "1.9.9"));
        assert!(is_newer("1.3.0", "1.2.9"));
        assert!(is_newer("1.2.4", "1.2.3"));
        assert!(is_newer("0.10.0", "0.9.0"));
        assert!(!is_newer("1.2.3", "1.2.3"));
        assert!(!is_newer("1.2.3", "1.2.4"));
        assert!(!is_newer("1.9.9", "2.0.0"));
    }

    #[test]
    fn test_is_newer_unparseable_is_never_newer() {
        assert!(!is_newer("bogus", "1.0.0"));
        assert!(!is_newer("2.0.0", "bogus"));
        assert!(!is_newer("3.0.0-rc.1", "2.0.0"));
    }
}
