//! The local installed-package store.
//!
//! The store root (`--root`, `PAKU_ROOT`, or `~/.paku`) holds:
//!
//! - `packages/` unpacked packages, one `{id}-{version}` directory each
//! - `cache/` the archives packages were installed from
//! - `bin/` launcher scripts for tool executables
//! - `sources.list` the configured source registry
//!
//! Installing is `push`: the archive is cached, unpacked, and when the
//! package carries tool executables and is the highest installed version of
//! its id, launcher scripts are written into `bin/`. `yank` reverses it,
//! keeping the cached archive.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::archive;
use crate::dependency::Dependency;
use crate::error::PackageError;
use crate::layout::UnpackedPackage;
use crate::manifest::Manifest;
use crate::runtime::Runtime;
use crate::version::Version;

use super::PackageSource;
use super::sources_list::{DEFAULT_SOURCES_LIST, SourceEntry, parse_sources_list};

/// Environment variable overriding the store root.
pub const ROOT_ENV_VAR: &str = "PAKU_ROOT";

pub struct InstalledStore<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
}

impl<'a, R: Runtime> InstalledStore<'a, R> {
    pub fn new(runtime: &'a R, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    /// Resolve the store root: an explicit flag wins, then the environment,
    /// then `~/.paku`.
    pub fn resolve_root(runtime: &'a R, flag: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = flag {
            return Ok(path);
        }
        if let Ok(path) = runtime.env_var(ROOT_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        let home = runtime
            .home_dir()
            .context("Could not determine the home directory")?;
        Ok(home.join(".paku"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn sources_path(&self) -> PathBuf {
        self.root.join("sources.list")
    }

    /// Create the store directory layout. Seeds `sources.list` with the
    /// commented template on first use; an existing file is left alone.
    pub fn initialize(&self) -> Result<()> {
        for dir in [self.packages_dir(), self.cache_dir(), self.bin_dir()] {
            self.runtime.create_dir_all(&dir)?;
        }
        if !self.runtime.exists(&self.sources_path()) {
            self.runtime
                .write(&self.sources_path(), DEFAULT_SOURCES_LIST.as_bytes())?;
            debug!("Seeded {:?}", self.sources_path());
        }
        Ok(())
    }

    /// Whether the root looks like a usable store.
    pub fn is_initialized(&self) -> bool {
        self.runtime.is_dir(&self.packages_dir())
            && self.runtime.is_dir(&self.cache_dir())
            && self.runtime.exists(&self.sources_path())
    }

    /// The configured sources, in registry order. An uninitialized store
    /// has none.
    pub fn sources(&self) -> Result<Vec<SourceEntry>> {
        if !self.runtime.exists(&self.sources_path()) {
            return Ok(Vec::new());
        }
        let text = self.runtime.read_to_string(&self.sources_path())?;
        Ok(parse_sources_list(&text))
    }

    /// Unpacked package directories, skipping in-progress `.unpack-*` temp
    /// directories.
    fn installed_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self
            .runtime
            .read_dir(&self.packages_dir())
            .unwrap_or_default()
            .into_iter()
            .filter(|p| self.runtime.is_dir(p))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !n.starts_with('.'))
            })
            .collect();
        dirs.sort();
        dirs
    }

    /// Every installed package as its unpacked layout.
    pub fn installed(&self) -> Vec<UnpackedPackage<'a, R>> {
        self.installed_dirs()
            .into_iter()
            .map(|dir| UnpackedPackage::new(self.runtime, dir))
            .collect()
    }

    /// The installed package resolved by `dependency`, highest version
    /// first.
    fn resolve(&self, dependency: &Dependency) -> Result<Option<(UnpackedPackage<'a, R>, Manifest)>> {
        let mut best: Option<(UnpackedPackage<'a, R>, Manifest)> = None;
        for package in self.installed() {
            let manifest = package.manifest()?;
            if manifest.id != dependency.id || !dependency.satisfied_by(&manifest.version) {
                continue;
            }
            if best.as_ref().is_none_or(|(_, b)| manifest.version > b.version) {
                best = Some((package, manifest));
            }
        }
        Ok(best)
    }

    /// The highest installed version of a package id.
    pub fn highest_installed_version(&self, id: &str) -> Result<Option<Version>> {
        let mut highest: Option<Version> = None;
        for package in self.installed() {
            let manifest = package.manifest()?;
            if manifest.id == id && highest.as_ref().is_none_or(|h| manifest.version > *h) {
                highest = Some(manifest.version);
            }
        }
        Ok(highest)
    }

    fn cached_archive_path(&self, manifest: &Manifest) -> PathBuf {
        self.cache_dir().join(format!(
            "{}.{}",
            manifest.id_and_version(),
            archive::ARCHIVE_EXTENSION
        ))
    }

    /// Launcher script base name for a tool executable: the file name
    /// without its `.exe` extension.
    fn launcher_stem(executable: &Path) -> Option<String> {
        executable
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
    }

    /// Write `bin/` launcher scripts pointing at a package's tool
    /// executables: a shell script and a `.bat` per executable.
    fn write_launchers(&self, package: &UnpackedPackage<'a, R>) -> Result<()> {
        for executable in package.tool_executables() {
            let Some(stem) = Self::launcher_stem(&executable) else {
                continue;
            };

            let shell_path = self.bin_dir().join(&stem);
            let shell = format!("#!/bin/sh\nexec \"{}\" \"$@\"\n", executable.display());
            self.runtime.write(&shell_path, shell.as_bytes())?;
            self.runtime.set_permissions(&shell_path, 0o755)?;

            let bat_path = self.bin_dir().join(format!("{}.bat", stem));
            let bat = format!("@ECHO OFF\r\n\"{}\" %*\r\n", executable.display());
            self.runtime.write(&bat_path, bat.as_bytes())?;

            info!("Installed launcher {:?}", shell_path);
        }
        Ok(())
    }

    /// Remove the launcher scripts for a package's tool executables.
    fn remove_launchers(&self, package: &UnpackedPackage<'a, R>) -> Result<()> {
        for executable in package.tool_executables() {
            let Some(stem) = Self::launcher_stem(&executable) else {
                continue;
            };
            for path in [self.bin_dir().join(&stem), self.bin_dir().join(format!("{}.bat", stem))] {
                if self.runtime.exists(&path) {
                    self.runtime.remove_file(&path)?;
                    debug!("Removed launcher {:?}", path);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R: Runtime> PackageSource for InstalledStore<'_, R> {
    fn location(&self) -> String {
        self.root.display().to_string()
    }

    async fn packages(&self) -> Result<Vec<Manifest>> {
        self.installed()
            .iter()
            .map(UnpackedPackage::manifest)
            .collect()
    }

    /// Materialize an installed package's archive: the cached original when
    /// it is still present, otherwise repacked from the unpacked directory.
    async fn fetch(&self, dependency: &Dependency, target_dir: &Path) -> Result<PathBuf> {
        let (package, manifest) = self.resolve(dependency)?.ok_or_else(|| {
            PackageError::PackageNotFound(format!("{} in {}", dependency, self.location()))
        })?;

        let cached = self.cached_archive_path(&manifest);
        if !self.runtime.exists(&cached) {
            debug!("No cached archive for {}, repacking", manifest.id_and_version());
            archive::pack(self.runtime, package.root(), &self.cache_dir())?;
        }

        let target = target_dir.join(format!(
            "{}.{}",
            manifest.id_and_version(),
            archive::ARCHIVE_EXTENSION
        ));
        self.runtime.copy(&cached, &target)?;
        Ok(target)
    }

    /// Install an archive: cache it, unpack it, and write launcher scripts
    /// when this package has tool executables and is now the highest
    /// installed version of its id.
    async fn push(&self, archive_file: &Path) -> Result<Manifest> {
        self.initialize()?;

        let manifest = archive::read_manifest(self.runtime, archive_file)?;
        let cached = self.cached_archive_path(&manifest);
        self.runtime
            .copy(archive_file, &cached)
            .with_context(|| format!("Failed to cache archive {:?}", archive_file))?;

        let unpacked = archive::unpack(self.runtime, &cached, &self.packages_dir())?;
        let package = UnpackedPackage::new(self.runtime, unpacked);

        let is_highest = self
            .highest_installed_version(&manifest.id)?
            .is_some_and(|v| v == manifest.version);
        if is_highest && !package.tool_executables().is_empty() {
            self.write_launchers(&package)?;
        }

        info!("Installed {} into {}", manifest.id_and_version(), self.location());
        Ok(manifest)
    }

    /// Uninstall the package resolved by `dependency`. Its launcher scripts
    /// go with it when it owns them; the cached archive is kept.
    async fn yank(&self, dependency: &Dependency) -> Result<bool> {
        let Some((package, manifest)) = self.resolve(dependency)? else {
            return Ok(false);
        };

        let is_highest = self
            .highest_installed_version(&manifest.id)?
            .is_some_and(|v| v == manifest.version);
        if is_highest && !package.tool_executables().is_empty() {
            self.remove_launchers(&package)?;
        }

        self.runtime.remove_dir_all(package.root())?;
        info!("Removed {} from {}", manifest.id_and_version(), self.location());
        Ok(true)
    }
}
