//! A flat local directory of package archives.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::dependency::Dependency;
use crate::error::PackageError;
use crate::manifest::Manifest;
use crate::runtime::Runtime;

use super::PackageSource;

/// A source backed by a directory of `.paku` files. Archive file names are
/// arbitrary; identity always comes from the embedded metadata document.
pub struct DirectorySource<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> DirectorySource<'a, R> {
    pub fn new(runtime: &'a R, path: PathBuf) -> Self {
        Self { runtime, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archive files in the directory, in listing order.
    fn archive_files(&self) -> Vec<PathBuf> {
        let mut entries = self.runtime.read_dir(&self.path).unwrap_or_default();
        entries.sort();
        entries
            .into_iter()
            .filter(|p| !self.runtime.is_dir(p))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(archive::is_archive_name)
            })
            .collect()
    }

    /// Every archive with its parsed metadata.
    fn entries(&self) -> Result<Vec<(PathBuf, Manifest)>> {
        self.archive_files()
            .into_iter()
            .map(|path| {
                let manifest = archive::read_manifest(self.runtime, &path)?;
                Ok((path, manifest))
            })
            .collect()
    }

    /// The archive holding the highest version satisfying `dependency`.
    fn resolve(&self, dependency: &Dependency) -> Result<Option<(PathBuf, Manifest)>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|(_, m)| m.id == dependency.id && dependency.satisfied_by(&m.version))
            .max_by(|(_, a), (_, b)| a.version.cmp(&b.version)))
    }
}

#[async_trait]
impl<R: Runtime> PackageSource for DirectorySource<'_, R> {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn packages(&self) -> Result<Vec<Manifest>> {
        Ok(self.entries()?.into_iter().map(|(_, m)| m).collect())
    }

    async fn fetch(&self, dependency: &Dependency, target_dir: &Path) -> Result<PathBuf> {
        let (path, manifest) = self.resolve(dependency)?.ok_or_else(|| {
            PackageError::PackageNotFound(format!("{} in {}", dependency, self.location()))
        })?;

        let target = target_dir.join(format!(
            "{}.{}",
            manifest.id_and_version(),
            archive::ARCHIVE_EXTENSION
        ));
        self.runtime.copy(&path, &target)?;
        debug!("Fetched {:?} to {:?}", path, target);
        Ok(target)
    }

    async fn push(&self, archive_file: &Path) -> Result<Manifest> {
        let manifest = archive::read_manifest(self.runtime, archive_file)?;
        if !self.runtime.exists(&self.path) {
            self.runtime.create_dir_all(&self.path)?;
        }
        let target = self.path.join(format!(
            "{}.{}",
            manifest.id_and_version(),
            archive::ARCHIVE_EXTENSION
        ));
        self.runtime.copy(archive_file, &target)?;
        debug!("Pushed {:?} into {}", archive_file, self.location());
        Ok(manifest)
    }

    async fn yank(&self, dependency: &Dependency) -> Result<bool> {
        match self.resolve(dependency)? {
            Some((path, manifest)) => {
                self.runtime.remove_file(&path)?;
                debug!("Yanked {} from {}", manifest.id_and_version(), self.location());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
