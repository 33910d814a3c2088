//! Packing and unpacking of package archives.
//!
//! An archive is a zip-compatible container named `{id}-{version}.paku`
//! whose top level carries the package's metadata document. Unpacking
//! extracts into a temp directory first, reads the metadata to learn the
//! package identity, then renames to `{id}-{version}` under the
//! destination. Packing writes every file under a layout root, preserving
//! relative paths with forward-slash names.

use anyhow::{Context, Result};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::PackageError;
use crate::layout::UnpackedPackage;
use crate::manifest::{self, Manifest};
use crate::runtime::Runtime;

/// File extension of a package archive.
pub const ARCHIVE_EXTENSION: &str = "paku";

/// Whether a file name looks like a package archive.
pub fn is_archive_name(name: &str) -> bool {
    name.to_lowercase().ends_with(&format!(".{}", ARCHIVE_EXTENSION))
}

/// Open an archive through the runtime. The zip reader needs Seek, which
/// `Runtime::open` cannot give us, so the whole file is buffered in memory.
fn open_archive<R: Runtime>(runtime: &R, archive_path: &Path) -> Result<ZipArchive<Cursor<Vec<u8>>>> {
    let mut reader = runtime
        .open(archive_path)
        .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
    let mut buffer = Vec::new();
    reader
        .read_to_end(&mut buffer)
        .with_context(|| format!("Failed to read archive {:?}", archive_path))?;

    ZipArchive::new(Cursor::new(buffer)).map_err(|e| {
        PackageError::CorruptArchive(format!("{:?} is not a readable container: {}", archive_path, e))
            .into()
    })
}

/// Name of the top-level metadata document entry, if the archive has one.
fn manifest_entry_name(archive: &ZipArchive<Cursor<Vec<u8>>>) -> Option<String> {
    archive
        .file_names()
        .find(|name| !name.contains('/') && manifest::is_manifest_name(name))
        .map(str::to_string)
}

/// Parse the metadata document out of an archive without unpacking it.
#[tracing::instrument(skip(runtime))]
pub fn read_manifest<R: Runtime>(runtime: &R, archive_path: &Path) -> Result<Manifest> {
    let mut archive = open_archive(runtime, archive_path)?;
    let name = manifest_entry_name(&archive).ok_or_else(|| {
        PackageError::CorruptArchive(format!(
            "{:?} has no *{} entry",
            archive_path,
            manifest::MANIFEST_SUFFIX
        ))
    })?;

    let mut entry = archive
        .by_name(&name)
        .with_context(|| format!("Failed to read entry '{}' in {:?}", name, archive_path))?;
    let mut json = String::new();
    entry
        .read_to_string(&mut json)
        .with_context(|| format!("Failed to read entry '{}' in {:?}", name, archive_path))?;
    Manifest::from_json(&json)
}

/// Unpack an archive into `dest_dir/{id}-{version}`, preserving every
/// entry's relative path and casing. Returns the unpacked directory.
#[tracing::instrument(skip(runtime))]
pub fn unpack<R: Runtime>(runtime: &R, archive_path: &Path, dest_dir: &Path) -> Result<PathBuf> {
    log::debug!("Unpacking {:?} into {:?}...", archive_path, dest_dir);
    let mut archive = open_archive(runtime, archive_path)?;
    if manifest_entry_name(&archive).is_none() {
        return Err(PackageError::CorruptArchive(format!(
            "{:?} has no *{} entry",
            archive_path,
            manifest::MANIFEST_SUFFIX
        ))
        .into());
    }

    // Extract to a temp directory first so we can read the metadata and
    // learn the package identity before choosing the final name.
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package".to_string());
    let temp_dir = dest_dir.join(format!(".unpack-{}", stem));
    if runtime.exists(&temp_dir) {
        runtime.remove_dir_all(&temp_dir)?;
    }
    runtime.create_dir_all(&temp_dir)?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {}", i))?;

        let entry_path = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                log::debug!("Skipping entry with invalid path");
                continue;
            }
        };

        let full_path = temp_dir.join(&entry_path);
        if entry.is_dir() {
            runtime.create_dir_all(&full_path)?;
        } else {
            if let Some(parent) = full_path.parent() {
                runtime.create_dir_all(parent)?;
            }
            let mut dest_file = runtime.create_file(&full_path)?;
            std::io::copy(&mut entry, &mut dest_file)
                .with_context(|| format!("Failed to extract file {:?}", full_path))?;

            if let Some(mode) = entry.unix_mode()
                && let Err(e) = runtime.set_permissions(&full_path, mode)
            {
                log::debug!("Failed to set permissions on {:?}: {}", full_path, e);
            }
        }
    }

    let manifest = UnpackedPackage::new(runtime, temp_dir.clone()).manifest()?;
    let final_dir = dest_dir.join(manifest.id_and_version());
    if runtime.exists(&final_dir) {
        runtime.remove_dir_all(&final_dir)?;
    }
    runtime.rename(&temp_dir, &final_dir)?;

    log::info!("Unpacked {}", manifest.id_and_version());
    Ok(final_dir)
}

/// Pack a layout root into `out_dir/{id}-{version}.paku`. Returns the
/// archive path.
#[tracing::instrument(skip(runtime))]
pub fn pack<R: Runtime>(runtime: &R, root: &Path, out_dir: &Path) -> Result<PathBuf> {
    let layout = UnpackedPackage::new(runtime, root.to_path_buf());
    let manifest = layout.manifest()?;

    // The zip writer needs Seek, so the archive is assembled in memory and
    // written out in one shot.
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    for rel in layout.files() {
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        writer
            .start_file(name, options)
            .with_context(|| format!("Failed to add archive entry for {:?}", rel))?;
        let mut reader = runtime.open(&root.join(&rel))?;
        std::io::copy(&mut reader, &mut writer)
            .with_context(|| format!("Failed to compress {:?}", rel))?;
    }

    let cursor = writer.finish().context("Failed to finalize archive")?;
    let archive_path = out_dir.join(format!("{}.{}", manifest.id_and_version(), ARCHIVE_EXTENSION));
    runtime.write(&archive_path, &cursor.into_inner())?;

    log::info!("Packed {:?}", archive_path);
    Ok(archive_path)
}
