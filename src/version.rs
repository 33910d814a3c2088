//! Package version parsing and ordering.
//!
//! A version is an ordered tuple of non-negative integer components,
//! conventionally up to four (major.minor.build.revision). Comparison pads
//! the shorter tuple with zeros, so `1.0` and `1.0.0` are equal while the
//! rendered text keeps whatever form was parsed.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::PackageError;

/// A parsed package version. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Version {
    text: String,
    parts: Vec<u64>,
}

impl Version {
    /// Components with trailing zeros removed; the canonical tuple that
    /// equality and hashing are defined over.
    fn normalized(&self) -> &[u64] {
        let mut len = self.parts.len();
        while len > 1 && self.parts[len - 1] == 0 {
            len -= 1;
        }
        &self.parts[..len]
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PackageError::Format("empty version string".to_string()).into());
        }
        let parts = s
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|_| {
                    PackageError::Format(format!(
                        "'{}' is not a valid version: component '{}' is not a non-negative integer",
                        s, part
                    ))
                })
            })
            .collect::<Result<Vec<u64>, PackageError>>()?;
        Ok(Version {
            text: s.to_string(),
            parts,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with Eq: "1.0" and "1.0.0" hash identically.
        self.normalized().hash(state);
    }
}

impl serde::Serialize for Version {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> serde::Deserialize<'de> for Version {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
