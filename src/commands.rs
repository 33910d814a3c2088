//! Implementations of the CLI subcommands.
//!
//! Each command resolves the store root, opens whatever sources it needs,
//! and prints its result to stdout. Errors propagate to main.

use anyhow::{Context, Result, bail};
use log::debug;
use std::path::{Path, PathBuf};

use crate::archive;
use crate::dependency::Dependency;
use crate::error::PackageError;
use crate::manifest::Manifest;
use crate::runtime::Runtime;
use crate::source::{DirectorySource, InstalledStore, PackageSource, RemoteFeed, SourceKind};

/// Open a source by its target: URLs become remote feeds, anything else a
/// local archive directory.
pub fn open_source<'a, R: Runtime>(runtime: &'a R, target: &str) -> Box<dyn PackageSource + 'a> {
    match SourceKind::of_target(target) {
        SourceKind::Feed => Box::new(RemoteFeed::new(runtime, reqwest::Client::new(), target)),
        SourceKind::Directory => Box::new(DirectorySource::new(runtime, PathBuf::from(target))),
    }
}

fn store<R: Runtime>(runtime: &R, root: Option<PathBuf>) -> Result<InstalledStore<'_, R>> {
    let root = InstalledStore::resolve_root(runtime, root)?;
    Ok(InstalledStore::new(runtime, root))
}

fn print_entries(entries: &[Manifest]) {
    for entry in entries {
        println!("{}", entry.id_and_version());
    }
}

/// List installed packages, or a source's full catalog with `--source`.
pub async fn list<R: Runtime>(
    runtime: &R,
    root: Option<PathBuf>,
    source: Option<String>,
) -> Result<()> {
    let entries = match source {
        Some(target) => open_source(runtime, &target).packages().await?,
        None => store(runtime, root)?.packages().await?,
    };
    print_entries(&entries);
    Ok(())
}

/// Search by id prefix, against the store or an explicit source.
pub async fn search<R: Runtime>(
    runtime: &R,
    root: Option<PathBuf>,
    prefix: &str,
    source: Option<String>,
) -> Result<()> {
    let entries = match source {
        Some(target) => {
            open_source(runtime, &target)
                .packages_with_id_starting_with(prefix)
                .await?
        }
        None => {
            store(runtime, root)?
                .packages_with_id_starting_with(prefix)
                .await?
        }
    };
    print_entries(&entries);
    Ok(())
}

/// The highest available version of every package id.
pub async fn latest<R: Runtime>(
    runtime: &R,
    root: Option<PathBuf>,
    source: Option<String>,
) -> Result<()> {
    let entries = match source {
        Some(target) => open_source(runtime, &target).latest_packages().await?,
        None => store(runtime, root)?.latest_packages().await?,
    };
    print_entries(&entries);
    Ok(())
}

/// Install a package into the store.
///
/// `spec` is either a path to a local archive file or a dependency string
/// such as `NUnit` or `T4MVC >= 2.6`. Dependencies are resolved against
/// `--source` when given, otherwise against the configured sources in
/// registry order; the first source that can satisfy the dependency wins.
pub async fn install<R: Runtime>(
    runtime: &R,
    root: Option<PathBuf>,
    spec: &str,
    source: Option<String>,
) -> Result<()> {
    let store = store(runtime, root)?;

    let as_path = Path::new(spec);
    if runtime.exists(as_path) && !runtime.is_dir(as_path) {
        let manifest = store.push(as_path).await?;
        println!("Installed {}", manifest.id_and_version());
        return Ok(());
    }

    let dependency: Dependency = spec.parse()?;
    let targets: Vec<String> = match source {
        Some(target) => vec![target],
        None => store.sources()?.into_iter().map(|e| e.target).collect(),
    };
    if targets.is_empty() {
        bail!(
            "No sources configured; add one to {:?} or pass --source",
            store.sources_path()
        );
    }

    for target in &targets {
        let src = open_source(runtime, target);
        if src.get(&dependency).await?.is_none() {
            debug!("{} not found in {}", dependency, src.location());
            continue;
        }
        let fetched = src.fetch(&dependency, &std::env::temp_dir()).await?;
        let manifest = store.push(&fetched).await?;
        runtime.remove_file(&fetched)?;
        println!(
            "Installed {} from {}",
            manifest.id_and_version(),
            src.location()
        );
        return Ok(());
    }

    Err(PackageError::PackageNotFound(format!("{} in any configured source", dependency)).into())
}

/// Uninstall the package matching a dependency string.
pub async fn remove<R: Runtime>(runtime: &R, root: Option<PathBuf>, spec: &str) -> Result<()> {
    let store = store(runtime, root)?;
    let dependency: Dependency = spec.parse()?;
    if store.yank(&dependency).await? {
        println!("Removed {}", dependency);
    } else {
        println!("Nothing matching '{}' is installed", dependency);
    }
    Ok(())
}

/// Copy a package's archive into a local directory. Resolves against the
/// store first, then the configured sources, unless `--source` pins one.
pub async fn fetch<R: Runtime>(
    runtime: &R,
    root: Option<PathBuf>,
    spec: &str,
    out_dir: &Path,
    source: Option<String>,
) -> Result<()> {
    let store = store(runtime, root)?;
    let dependency: Dependency = spec.parse()?;

    if let Some(target) = source {
        let fetched = open_source(runtime, &target)
            .fetch(&dependency, out_dir)
            .await?;
        println!("{}", fetched.display());
        return Ok(());
    }

    if store.get(&dependency).await?.is_some() {
        let fetched = store.fetch(&dependency, out_dir).await?;
        println!("{}", fetched.display());
        return Ok(());
    }
    for entry in store.sources()? {
        let src = open_source(runtime, &entry.target);
        if src.get(&dependency).await?.is_some() {
            let fetched = src.fetch(&dependency, out_dir).await?;
            println!("{}", fetched.display());
            return Ok(());
        }
    }

    Err(PackageError::PackageNotFound(format!("{} in any configured source", dependency)).into())
}

/// Pack a layout directory into an archive.
pub fn pack<R: Runtime>(runtime: &R, dir: &Path, out_dir: &Path) -> Result<()> {
    let archive_path = archive::pack(runtime, dir, out_dir)
        .with_context(|| format!("Failed to pack {:?}", dir))?;
    println!("{}", archive_path.display());
    Ok(())
}

/// Unpack an archive into a directory.
pub fn unpack<R: Runtime>(runtime: &R, archive_file: &Path, out_dir: &Path) -> Result<()> {
    let unpacked = archive::unpack(runtime, archive_file, out_dir)
        .with_context(|| format!("Failed to unpack {:?}", archive_file))?;
    println!("{}", unpacked.display());
    Ok(())
}

/// Print the configured sources in registry order.
pub fn sources<R: Runtime>(runtime: &R, root: Option<PathBuf>) -> Result<()> {
    let store = store(runtime, root)?;
    for entry in store.sources()? {
        match entry.name {
            Some(name) => println!("{}\t{} ({})", name, entry.target, entry.kind),
            None => println!("{} ({})", entry.target, entry.kind),
        }
    }
    Ok(())
}
