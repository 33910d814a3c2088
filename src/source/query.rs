//! Pure selection helpers over catalog entries.
//!
//! These back the default `PackageSource` query implementations. All are
//! stateless functions over owned entry lists; sources that filter
//! server-side still run the relevant helper afterwards as a defensive
//! second pass.

use anyhow::{Result, bail};
use std::collections::HashMap;

use crate::dependency::Dependency;
use crate::manifest::Manifest;

/// The highest-versioned entry matching the dependency's id and satisfying
/// all of its constraints.
pub fn best_match(entries: Vec<Manifest>, dependency: &Dependency) -> Option<Manifest> {
    entries
        .into_iter()
        .filter(|m| m.id == dependency.id && dependency.satisfied_by(&m.version))
        .max_by(|a, b| a.version.cmp(&b.version))
}

/// Entries with exactly this id, ascending by version.
pub fn with_id(entries: Vec<Manifest>, id: &str) -> Vec<Manifest> {
    let mut matches: Vec<Manifest> = entries.into_iter().filter(|m| m.id == id).collect();
    matches.sort_by(|a, b| a.version.cmp(&b.version));
    matches
}

/// Entries whose id starts with `prefix`, case-sensitively, deduplicated by
/// (id, version) and ordered by id then version.
pub fn with_id_prefix(entries: Vec<Manifest>, prefix: &str) -> Vec<Manifest> {
    let mut matches: Vec<Manifest> = Vec::new();
    for entry in entries {
        if entry.id.starts_with(prefix) && !matches.contains(&entry) {
            matches.push(entry);
        }
    }
    matches.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.version.cmp(&b.version)));
    matches
}

/// Entries satisfying every dependency, ascending by version. All
/// dependencies must share one id; mixing ids is an implementation error.
pub fn matching(entries: Vec<Manifest>, dependencies: &[Dependency]) -> Result<Vec<Manifest>> {
    let Some(first) = dependencies.first() else {
        bail!("at least one dependency is required");
    };
    if dependencies.iter().any(|d| d.id != first.id) {
        bail!("all dependencies must share one package id, got '{}'", first.id);
    }

    let mut matches: Vec<Manifest> = entries
        .into_iter()
        .filter(|m| m.id == first.id && dependencies.iter().all(|d| d.satisfied_by(&m.version)))
        .collect();
    matches.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(matches)
}

/// One entry per distinct id: the highest version available, ordered by id.
pub fn latest(entries: Vec<Manifest>) -> Vec<Manifest> {
    let mut highest: HashMap<String, Manifest> = HashMap::new();
    for entry in entries {
        match highest.get(&entry.id) {
            Some(existing) if existing.version >= entry.version => {}
            _ => {
                highest.insert(entry.id.clone(), entry);
            }
        }
    }
    let mut result: Vec<Manifest> = highest.into_values().collect();
    result.sort_by(|a, b| a.id.cmp(&b.id));
    result
}
