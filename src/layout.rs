//! Convention-based layout of an unpacked package directory.
//!
//! An unpacked package keeps libraries under `lib/`, executable tools under
//! `tools/`, content files under `content/` and sources under `src/` - all
//! matched case-insensitively against whatever the archive author used
//! (`LiB`, `tOolS`, ...). Immediate subdirectories of the libraries
//! directory whose names are recognized framework monikers (`net20`,
//! `Net35`) scope their files to that framework; files directly inside the
//! libraries directory are "global" and apply to every framework.
//!
//! Nothing here is cached: every accessor resolves against the file system
//! at query time, so results stay correct across mutation.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::error::PackageError;
use crate::manifest::{self, Manifest};
use crate::runtime::Runtime;

/// A target framework identified by a short moniker such as `net35`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFramework {
    /// Full framework identifier.
    pub identifier: String,
    /// Framework version, e.g. "3.5".
    pub version: String,
}

impl TargetFramework {
    /// Parse a `net<digits>`-style short name, case-insensitively.
    ///
    /// `net20` -> (".NETFramework", "2.0"), `Net35` -> (".NETFramework", "3.5"),
    /// `net4` -> (".NETFramework", "4.0"). Anything else is not a framework
    /// moniker and returns `None`.
    pub fn from_moniker(moniker: &str) -> Option<Self> {
        let lower = moniker.to_ascii_lowercase();
        let digits = lower.strip_prefix("net")?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let version = if digits.len() == 1 {
            format!("{}.0", digits)
        } else {
            digits
                .chars()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(".")
        };
        Some(TargetFramework {
            identifier: ".NETFramework".to_string(),
            version,
        })
    }

    /// The short name form, e.g. "net35".
    pub fn moniker(&self) -> String {
        format!("net{}", self.version.replace('.', ""))
    }
}

/// An unpacked package rooted at a directory, resolved at query time.
pub struct UnpackedPackage<'a, R: Runtime> {
    runtime: &'a R,
    root: PathBuf,
}

impl<'a, R: Runtime> UnpackedPackage<'a, R> {
    pub fn new(runtime: &'a R, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The metadata document at the layout root, if present.
    pub fn manifest_path(&self) -> Option<PathBuf> {
        files_directly_in(self.runtime, &self.root)
            .into_iter()
            .find(|p| file_name(p).is_some_and(manifest::is_manifest_name))
    }

    /// Parse the metadata document at the layout root.
    pub fn manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path().ok_or_else(|| {
            PackageError::MetadataMissing(format!("no *{} at {:?}", manifest::MANIFEST_SUFFIX, self.root))
        })?;
        Manifest::load(self.runtime, &path)
    }

    /// Every file under the root, relative paths in sorted listing order.
    pub fn files(&self) -> Vec<PathBuf> {
        files_under(self.runtime, &self.root)
            .into_iter()
            .filter_map(|p| p.strip_prefix(&self.root).ok().map(Path::to_path_buf))
            .collect()
    }

    pub fn libraries_dir(&self) -> Option<PathBuf> {
        subdir_ignoring_case(self.runtime, &self.root, "lib")
    }

    pub fn tools_dir(&self) -> Option<PathBuf> {
        subdir_ignoring_case(self.runtime, &self.root, "tools")
    }

    pub fn content_dir(&self) -> Option<PathBuf> {
        subdir_ignoring_case(self.runtime, &self.root, "content")
    }

    pub fn source_dir(&self) -> Option<PathBuf> {
        subdir_ignoring_case(self.runtime, &self.root, "src")
    }

    /// Frameworks that have a library subdirectory in this package.
    pub fn frameworks(&self) -> Vec<TargetFramework> {
        let Some(lib) = self.libraries_dir() else {
            return Vec::new();
        };
        subdirs_of(self.runtime, &lib)
            .into_iter()
            .filter_map(|dir| file_name(&dir).and_then(TargetFramework::from_moniker))
            .collect()
    }

    /// The library subdirectory for a framework moniker, matched
    /// case-insensitively. `None` when the libraries directory is absent or
    /// has no such subdirectory.
    pub fn library_dir_for(&self, moniker: &str) -> Option<PathBuf> {
        let lib = self.libraries_dir()?;
        subdir_ignoring_case(self.runtime, &lib, moniker)
    }

    /// Files directly inside the libraries directory; these apply to every
    /// framework.
    pub fn global_libraries(&self) -> Vec<PathBuf> {
        match self.libraries_dir() {
            Some(lib) => files_directly_in(self.runtime, &lib),
            None => Vec::new(),
        }
    }

    /// Only the framework-specific libraries for a moniker.
    pub fn just_libraries_for(&self, moniker: &str) -> Vec<PathBuf> {
        match self.library_dir_for(moniker) {
            Some(dir) => files_directly_in(self.runtime, &dir),
            None => Vec::new(),
        }
    }

    /// Libraries applicable to a framework: global first, then the
    /// framework-specific subset, each in listing order.
    pub fn libraries_for(&self, moniker: &str) -> Vec<PathBuf> {
        let mut libraries = self.global_libraries();
        libraries.extend(self.just_libraries_for(moniker));
        libraries
    }

    /// All libraries in the package: global files once, then the files of
    /// every recognized framework subdirectory.
    pub fn libraries(&self) -> Vec<PathBuf> {
        let mut libraries = self.global_libraries();
        let Some(lib) = self.libraries_dir() else {
            return libraries;
        };
        for dir in subdirs_of(self.runtime, &lib) {
            if file_name(&dir).and_then(TargetFramework::from_moniker).is_some() {
                libraries.extend(files_directly_in(self.runtime, &dir));
            }
        }
        libraries
    }

    /// Every file under the tools directory, recursively.
    pub fn tools(&self) -> Vec<PathBuf> {
        match self.tools_dir() {
            Some(dir) => files_under(self.runtime, &dir),
            None => Vec::new(),
        }
    }

    /// Tool files that are executables (`.exe`, case-insensitive). These are
    /// the files launcher scripts get generated for.
    pub fn tool_executables(&self) -> Vec<PathBuf> {
        self.tools()
            .into_iter()
            .filter(|p| {
                p.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
            })
            .collect()
    }

    /// Every file under the content directory, recursively.
    pub fn content(&self) -> Vec<PathBuf> {
        match self.content_dir() {
            Some(dir) => files_under(self.runtime, &dir),
            None => Vec::new(),
        }
    }

    /// Every file under the source directory, recursively.
    pub fn source_files(&self) -> Vec<PathBuf> {
        match self.source_dir() {
            Some(dir) => files_under(self.runtime, &dir),
            None => Vec::new(),
        }
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Immediate subdirectory of `parent` whose name equals `name` ignoring
/// ASCII case. No match is not an error.
fn subdir_ignoring_case<R: Runtime>(runtime: &R, parent: &Path, name: &str) -> Option<PathBuf> {
    sorted_entries(runtime, parent)
        .into_iter()
        .filter(|p| runtime.is_dir(p))
        .find(|p| file_name(p).is_some_and(|n| n.eq_ignore_ascii_case(name)))
}

/// Immediate subdirectories of `dir`, in listing order.
fn subdirs_of<R: Runtime>(runtime: &R, dir: &Path) -> Vec<PathBuf> {
    sorted_entries(runtime, dir)
        .into_iter()
        .filter(|p| runtime.is_dir(p))
        .collect()
}

/// Regular files directly inside `dir` (no recursion), in listing order.
fn files_directly_in<R: Runtime>(runtime: &R, dir: &Path) -> Vec<PathBuf> {
    sorted_entries(runtime, dir)
        .into_iter()
        .filter(|p| !runtime.is_dir(p))
        .collect()
}

/// Every file under `dir`, depth-first in listing order.
fn files_under<R: Runtime>(runtime: &R, dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in sorted_entries(runtime, dir) {
        if runtime.is_dir(&entry) {
            files.extend(files_under(runtime, &entry));
        } else {
            files.push(entry);
        }
    }
    files
}

/// Directory entries sorted case-insensitively by name, so listing order is
/// stable across platforms. A missing directory lists as empty.
fn sorted_entries<R: Runtime>(runtime: &R, dir: &Path) -> Vec<PathBuf> {
    let mut entries = runtime.read_dir(dir).unwrap_or_default();
    entries.sort_by_key(|p| file_name(p).map(str::to_ascii_lowercase));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use std::fs;
    use tempfile::{TempDir, tempdir};

    // The Foo fixture exercises every casing corner:
    //
    // Foo/
    // |-- Foo.paku.json
    // |-- cOnTeNt/file.html, cOnTeNt/subdir/hi.there
    // |-- LiB/Another.Global.DLL, LiB/global_1.dll
    // |-- LiB/nEt20/Hi.DlL, LiB/nEt20/TherE.dLl
    // |-- LiB/Net35/fooooo.dll
    // |-- sRc/hi.cs, sRc/more/FooFile.cs
    // `-- tOolS/this/that/hi.exe, tOolS/this/that/neato.bat
    fn foo_fixture() -> TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let write = |rel: &str| {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"").unwrap();
        };
        fs::write(
            root.join("Foo.paku.json"),
            r#"{"id": "Foo", "version": "1.0"}"#,
        )
        .unwrap();
        write("cOnTeNt/file.html");
        write("cOnTeNt/subdir/hi.there");
        write("LiB/Another.Global.DLL");
        write("LiB/global_1.dll");
        write("LiB/nEt20/Hi.DlL");
        write("LiB/nEt20/TherE.dLl");
        write("LiB/Net35/fooooo.dll");
        write("sRc/hi.cs");
        write("sRc/more/FooFile.cs");
        write("tOolS/this/that/hi.exe");
        write("tOolS/this/that/neato.bat");
        dir
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_framework_moniker_parsing() {
        let net20 = TargetFramework::from_moniker("net20").unwrap();
        assert_eq!(net20.identifier, ".NETFramework");
        assert_eq!(net20.version, "2.0");
        assert_eq!(net20.moniker(), "net20");

        assert_eq!(TargetFramework::from_moniker("NET35").unwrap().version, "3.5");
        assert_eq!(TargetFramework::from_moniker("net4").unwrap().version, "4.0");

        assert!(TargetFramework::from_moniker("lib").is_none());
        assert!(TargetFramework::from_moniker("net").is_none());
        assert!(TargetFramework::from_moniker("netstandard").is_none());
    }

    #[test]
    fn test_directory_resolution_is_case_insensitive() {
        let fixture = foo_fixture();
        let runtime = RealRuntime;
        let package = UnpackedPackage::new(&runtime, fixture.path().to_path_buf());

        assert_eq!(package.libraries_dir(), Some(fixture.path().join("LiB")));
        assert_eq!(package.tools_dir(), Some(fixture.path().join("tOolS")));
        assert_eq!(package.content_dir(), Some(fixture.path().join("cOnTeNt")));
        assert_eq!(package.source_dir(), Some(fixture.path().join("sRc")));
    }

    #[test]
    fn test_absent_directories_are_none() {
        let dir = tempdir().unwrap();
        let runtime = RealRuntime;
        let package = UnpackedPackage::new(&runtime, dir.path().to_path_buf());

        assert!(package.libraries_dir().is_none());
        assert!(package.tools_dir().is_none());
        assert!(package.tools().is_empty());
        assert!(package.libraries_for("net20").is_empty());
        assert!(package.frameworks().is_empty());
    }

    #[test]
    fn test_global_libraries() {
        let fixture = foo_fixture();
        let runtime = RealRuntime;
        let package = UnpackedPackage::new(&runtime, fixture.path().to_path_buf());

        assert_eq!(
            names(&package.global_libraries()),
            ["Another.Global.DLL", "global_1.dll"]
        );
    }

    #[test]
    fn test_framework_scoped_libraries() {
        let fixture = foo_fixture();
        let runtime = RealRuntime;
        let package = UnpackedPackage::new(&runtime, fixture.path().to_path_buf());

        assert_eq!(
            package.library_dir_for("net20"),
            Some(fixture.path().join("LiB").join("nEt20"))
        );
        assert_eq!(names(&package.just_libraries_for("net20")), ["Hi.DlL", "TherE.dLl"]);
        assert_eq!(
            names(&package.libraries_for("net20")),
            ["Another.Global.DLL", "global_1.dll", "Hi.DlL", "TherE.dLl"]
        );

        // Moniker matching is case-insensitive too.
        assert_eq!(
            package.library_dir_for("NET35"),
            Some(fixture.path().join("LiB").join("Net35"))
        );
        assert_eq!(
            names(&package.libraries_for("NET35")),
            ["Another.Global.DLL", "global_1.dll", "fooooo.dll"]
        );
    }

    #[test]
    fn test_libraries_lists_globals_once() {
        let fixture = foo_fixture();
        let runtime = RealRuntime;
        let package = UnpackedPackage::new(&runtime, fixture.path().to_path_buf());

        assert_eq!(
            names(&package.libraries()),
            [
                "Another.Global.DLL",
                "global_1.dll",
                "Hi.DlL",
                "TherE.dLl",
                "fooooo.dll"
            ]
        );
    }

    #[test]
    fn test_detected_frameworks() {
        let fixture = foo_fixture();
        let runtime = RealRuntime;
        let package = UnpackedPackage::new(&runtime, fixture.path().to_path_buf());

        let monikers: Vec<String> = package.frameworks().iter().map(|f| f.moniker()).collect();
        assert_eq!(monikers, ["net20", "net35"]);
    }

    #[test]
    fn test_recursive_listings() {
        let fixture = foo_fixture();
        let runtime = RealRuntime;
        let package = UnpackedPackage::new(&runtime, fixture.path().to_path_buf());

        assert_eq!(names(&package.tools()), ["hi.exe", "neato.bat"]);
        assert_eq!(names(&package.tool_executables()), ["hi.exe"]);
        assert_eq!(names(&package.content()), ["file.html", "hi.there"]);
        assert_eq!(names(&package.source_files()), ["hi.cs", "FooFile.cs"]);
    }

    #[test]
    fn test_manifest_from_layout_root() {
        let fixture = foo_fixture();
        let runtime = RealRuntime;
        let package = UnpackedPackage::new(&runtime, fixture.path().to_path_buf());

        let manifest = package.manifest().unwrap();
        assert_eq!(manifest.id_and_version(), "Foo-1.0");

        let empty = tempdir().unwrap();
        let bare = UnpackedPackage::new(&runtime, empty.path().to_path_buf());
        let err = bare.manifest().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::PackageError>(),
            Some(crate::error::PackageError::MetadataMissing(_))
        ));
    }

    #[test]
    fn test_resolution_with_mocked_listing() {
        // A root whose only subdirectory is `LiB` resolves identically to
        // one named `lib`.
        let mut runtime = MockRuntime::new();
        let root = PathBuf::from("/pkg/Foo-1.0");
        let lib = root.join("LiB");

        let lib_clone = lib.clone();
        runtime
            .expect_read_dir()
            .withf(move |p| p == Path::new("/pkg/Foo-1.0"))
            .returning(move |_| Ok(vec![lib_clone.clone()]));
        runtime.expect_is_dir().returning(|p| p.ends_with("LiB"));

        let package = UnpackedPackage::new(&runtime, root);
        assert_eq!(package.libraries_dir(), Some(lib));
    }
}
