use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr, sync::OnceLock};

/// A `major.minor.patch` tag of the configuration block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionTag(pub [u32; 3]);

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("valid version regex"))
}

impl VersionTag {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self([major, minor, patch])
    }

    /// Finds the first `x.y.z` in `text`.
    pub fn find(text: &str) -> Option<Self> {
        let captures = marker_regex().captures(text)?;
        let mut fields = [0u32; 3];
        for (i, field) in fields.iter_mut().enumerate() {
            *field = captures.get(i + 1)?.as_str().parse().ok()?;
        }

        Some(Self(fields))
    }

    /// Field-by-field comparison where the first differing field decides.
    ///
    /// Pre-release or build suffixes are not understood, only the three numbers.
    pub fn is_newer_than(&self, local: &VersionTag) -> bool {
        for (fetched, local) in self.0.iter().zip(local.0.iter()) {
            if fetched != local {
                return fetched > local;
            }
        }

        false
    }
}

impl FromStr for VersionTag {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let fields = s.trim().split('.').collect::<Vec<_>>();
        match fields.as_slice() {
            [major, minor, patch] => Ok(Self::new(
                major.parse()?,
                minor.parse()?,
                patch.parse()?,
            )),
            _ => anyhow::bail!("expected a major.minor.patch version, got {s:?}"),
        }
    }
}

impl Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [major, minor, patch] = self.0;
        write!(f, "{major}.{minor}.{patch}")
    }
}
