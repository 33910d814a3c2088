//! Package metadata documents.
//!
//! Every package carries one JSON metadata document (`<Id>.paku.json`) at
//! the root of its archive. The parsed form is the catalog entry that all
//! sources hand out; identity is `(id, version)`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::dependency::Dependency;
use crate::runtime::Runtime;
use crate::version::Version;

/// Suffix of a metadata document file name.
pub const MANIFEST_SUFFIX: &str = ".paku.json";

/// Whether a file name looks like a metadata document.
pub fn is_manifest_name(name: &str) -> bool {
    name.ends_with(MANIFEST_SUFFIX)
}

/// Metadata snapshot of one package id+version. Immutable once parsed.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Manifest {
    pub id: String,
    pub version: Version,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub require_license_acceptance: bool,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub license_url: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Download location, populated by remote feed entries only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,
}

impl Manifest {
    /// The `{id}-{version}` form used for directory and archive names.
    pub fn id_and_version(&self) -> String {
        format!("{}-{}", self.id, self.version)
    }

    /// File name of this package's metadata document.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.id, MANIFEST_SUFFIX)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse package metadata document")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize package metadata document")
    }

    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read metadata document at {:?}", path))?;
        Self::from_json(&content)
    }

    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        runtime
            .write(path, self.to_json()?.as_bytes())
            .with_context(|| format!("Failed to save metadata document to {:?}", path))
    }
}

impl PartialEq for Manifest {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.version == other.version
    }
}

impl Eq for Manifest {}

impl Hash for Manifest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.version.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_json() -> &'static str {
        r#"{
            "id": "FluentNHibernate",
            "version": "1.1.0.694",
            "description": "Fluent, XML-less, compile safe mappings.",
            "authors": ["James Gregory"],
            "language": "en-US",
            "require_license_acceptance": false,
            "created": "2010-10-25T22:55:28.92+00:00",
            "modified": "2010-10-25T22:55:28.921+00:00",
            "license_url": "http://example.com/LICENSE.txt",
            "dependencies": ["NHibernate.Core 2.1.2.4000"]
        }"#
    }

    #[test]
    fn test_parse_full_document() {
        let m = Manifest::from_json(sample_json()).unwrap();
        assert_eq!(m.id, "FluentNHibernate");
        assert_eq!(m.version.to_string(), "1.1.0.694");
        assert_eq!(m.authors, vec!["James Gregory"]);
        assert_eq!(m.language.as_deref(), Some("en-US"));
        assert!(!m.require_license_acceptance);
        assert_eq!(m.license_url.as_deref(), Some("http://example.com/LICENSE.txt"));
        assert_eq!(m.dependencies.len(), 1);
        assert_eq!(m.dependencies[0].id, "NHibernate.Core");
        assert_eq!(m.id_and_version(), "FluentNHibernate-1.1.0.694");
        assert_eq!(m.file_name(), "FluentNHibernate.paku.json");
    }

    #[test]
    fn test_optional_fields_default() {
        let m = Manifest::from_json(r#"{"id": "NUnit", "version": "2.5.7.10213"}"#).unwrap();
        assert!(m.description.is_none());
        assert!(m.authors.is_empty());
        assert!(m.license_url.is_none());
        assert!(m.dependencies.is_empty());
        assert!(m.archive_url.is_none());
    }

    #[test]
    fn test_missing_required_fields_fail() {
        assert!(Manifest::from_json(r#"{"id": "NUnit"}"#).is_err());
        assert!(Manifest::from_json(r#"{"version": "1.0"}"#).is_err());
        assert!(Manifest::from_json("not json").is_err());
    }

    #[test]
    fn test_identity_is_id_and_version() {
        let a = Manifest::from_json(r#"{"id": "NUnit", "version": "1.0"}"#).unwrap();
        let mut b = Manifest::from_json(r#"{"id": "NUnit", "version": "1.0.0"}"#).unwrap();
        b.description = Some("different metadata, same identity".to_string());
        assert_eq!(a, b);

        let c = Manifest::from_json(r#"{"id": "NUnit", "version": "1.1"}"#).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_load_and_save_through_runtime() {
        let runtime = crate::runtime::RealRuntime;
        let dir = tempfile::tempdir().unwrap();
        let m = Manifest::from_json(sample_json()).unwrap();

        let path = dir.path().join(m.file_name());
        m.save(&runtime, &path).unwrap();
        let back = Manifest::load(&runtime, &path).unwrap();
        assert_eq!(back, m);

        assert!(Manifest::load(&runtime, &dir.path().join("missing.paku.json")).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let m = Manifest::from_json(sample_json()).unwrap();
        let back = Manifest::from_json(&m.to_json().unwrap()).unwrap();
        assert_eq!(back, m);
        assert_eq!(back.dependencies, m.dependencies);
        assert_eq!(back.created, m.created);
    }

    #[test]
    fn test_is_manifest_name() {
        assert!(is_manifest_name("NUnit.paku.json"));
        assert!(!is_manifest_name("NUnit.json"));
        assert!(!is_manifest_name("readme.txt"));
    }
}
