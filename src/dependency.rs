//! Dependency expressions: a package id plus optional version constraints.
//!
//! An expression is whitespace-delimited, e.g. `"T4MVC > 2.6 < 2.6.32"`.
//! The first token is the id; each following `(operator? version)` pair
//! becomes a constraint, a bare version meaning an exact match. Multiple
//! constraints are ANDed; no constraints means "any version".

use std::fmt;
use std::str::FromStr;

use crate::error::PackageError;
use crate::version::Version;

/// A single version constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Exact(Version),
    GreaterThan(Version),
    GreaterOrEqual(Version),
    LessThan(Version),
    LessOrEqual(Version),
}

impl Constraint {
    /// Whether the given version satisfies this constraint.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Constraint::Exact(v) => version == v,
            Constraint::GreaterThan(v) => version > v,
            Constraint::GreaterOrEqual(v) => version >= v,
            Constraint::LessThan(v) => version < v,
            Constraint::LessOrEqual(v) => version <= v,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Exact(v) => write!(f, "{}", v),
            Constraint::GreaterThan(v) => write!(f, "> {}", v),
            Constraint::GreaterOrEqual(v) => write!(f, ">= {}", v),
            Constraint::LessThan(v) => write!(f, "< {}", v),
            Constraint::LessOrEqual(v) => write!(f, "<= {}", v),
        }
    }
}

/// A parsed dependency expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub id: String,
    pub constraints: Vec<Constraint>,
}

impl Dependency {
    /// True iff every constraint holds for `version`.
    pub fn satisfied_by(&self, version: &Version) -> bool {
        self.constraints.iter().all(|c| c.matches(version))
    }
}

impl FromStr for Dependency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let id = tokens
            .next()
            .ok_or_else(|| PackageError::Format("empty dependency expression".to_string()))?
            .to_string();

        let mut constraints = Vec::new();
        while let Some(token) = tokens.next() {
            // A bare version token is an exact constraint.
            if let Ok(version) = token.parse::<Version>() {
                constraints.push(Constraint::Exact(version));
                continue;
            }
            let operator = match token {
                ">" => Constraint::GreaterThan as fn(Version) -> Constraint,
                // "=<" is a legacy alias for ">=", not "<=". Kept for
                // compatibility with existing dependency strings.
                ">=" | "=<" => Constraint::GreaterOrEqual,
                "<" => Constraint::LessThan,
                "<=" => Constraint::LessOrEqual,
                _ => {
                    return Err(PackageError::Format(format!(
                        "'{}': unrecognized constraint operator '{}'",
                        s, token
                    ))
                    .into());
                }
            };
            let version = tokens
                .next()
                .ok_or_else(|| {
                    PackageError::Format(format!("'{}': operator '{}' has no version", s, token))
                })?
                .parse::<Version>()?;
            constraints.push(operator(version));
        }

        Ok(Dependency { id, constraints })
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        for constraint in &self.constraints {
            write!(f, " {}", constraint)?;
        }
        Ok(())
    }
}

impl serde::Serialize for Dependency {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Dependency {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
