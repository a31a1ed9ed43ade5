use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Structured tool version parsed once from `--version` style output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse the first dotted numeric run in `raw`, e.g. `v20.11.1`, `jq-1.7.1` or
    /// `Docker version 24.0.7`.
    ///
    /// Returns `None` when no leading integer can be found or it overflows.
    pub fn parse(raw: &str) -> Option<Version> {
        let caps = version_pattern().captures(raw)?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let component = |idx: usize| -> Option<u64> {
            match caps.get(idx) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(0),
            }
        };
        Some(Version {
            major,
            minor: component(2)?,
            patch: component(3)?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("version pattern compiles")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_version_outputs() {
        assert_eq!(Version::parse("v20.11.1"), Some(Version::new(20, 11, 1)));
        assert_eq!(Version::parse("jq-1.7.1\n"), Some(Version::new(1, 7, 1)));
        assert_eq!(
            Version::parse("Docker version 24.0.7, build afdd53b"),
            Some(Version::new(24, 0, 7))
        );
        assert_eq!(Version::parse("Python 3.12"), Some(Version::new(3, 12, 0)));
        assert_eq!(Version::parse("18"), Some(Version::new(18, 0, 0)));
    }

    #[test]
    fn malformed_output_is_none() {
        assert_eq!(Version::parse(""), None);
        assert_eq!(Version::parse("command not found"), None);
        assert_eq!(Version::parse("99999999999999999999999.1"), None);
    }

    #[test]
    fn ordering_is_numeric_not_lexical() {
        assert!(Version::new(10, 0, 0) > Version::new(9, 12, 3));
        assert!(Version::new(20, 10, 0) > Version::new(20, 2, 0));
    }
}
