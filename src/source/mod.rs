//! Package source abstraction.
//!
//! A source is anywhere packages can be listed and resolved from: a flat
//! directory of archives, a remote paged catalog feed, or the local
//! installed-package store. All three answer the same query contract; the
//! mutating half (`push`/`yank`) is only meaningful for sources that own
//! their storage and defaults to an unsupported error.

mod directory;
mod feed;
pub(crate) mod query;
mod sources_list;
mod store;

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::dependency::Dependency;
use crate::manifest::Manifest;

pub use directory::DirectorySource;
pub use feed::RemoteFeed;
pub use sources_list::{DEFAULT_SOURCES_LIST, SourceEntry, SourceKind, parse_sources_list};
pub use store::{InstalledStore, ROOT_ENV_VAR};

/// The uniform query/mutate contract implemented by every source variant.
///
/// Query operations have default implementations over `packages()`; a
/// variant overrides them when it can answer more cheaply (the remote feed
/// pushes filters to the server).
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Where this source reads from (path or URL), for display and errors.
    fn location(&self) -> String;

    /// Full listing of this source's catalog entries.
    async fn packages(&self) -> Result<Vec<Manifest>>;

    /// The highest version satisfying `dependency`, or `None` when nothing
    /// matches (including an id that is absent entirely).
    async fn get(&self, dependency: &Dependency) -> Result<Option<Manifest>> {
        Ok(query::best_match(self.packages().await?, dependency))
    }

    /// All entries with exactly this id, ascending by version.
    async fn packages_with_id(&self, id: &str) -> Result<Vec<Manifest>> {
        Ok(query::with_id(self.packages().await?, id))
    }

    /// All entries whose id starts with `prefix` (case-sensitive), one
    /// entry per (id, version).
    async fn packages_with_id_starting_with(&self, prefix: &str) -> Result<Vec<Manifest>> {
        Ok(query::with_id_prefix(self.packages().await?, prefix))
    }

    /// Entries satisfying the conjunction of every given dependency.
    /// All dependencies must name the same id.
    async fn packages_matching(&self, dependencies: &[Dependency]) -> Result<Vec<Manifest>> {
        query::matching(self.packages().await?, dependencies)
    }

    /// One entry per distinct id: the highest version available.
    async fn latest_packages(&self) -> Result<Vec<Manifest>> {
        Ok(query::latest(self.packages().await?))
    }

    /// Resolve `dependency` and materialize its archive inside
    /// `target_dir`. Fails with [`crate::error::PackageError::PackageNotFound`]
    /// when nothing satisfies the dependency.
    async fn fetch(&self, dependency: &Dependency, target_dir: &Path) -> Result<PathBuf>;

    /// Install an archive into this source.
    async fn push(&self, archive: &Path) -> Result<Manifest> {
        let _ = archive;
        anyhow::bail!("{} does not accept pushed packages", self.location())
    }

    /// Remove the package resolved by `dependency` from this source.
    /// Returns false when nothing matched.
    async fn yank(&self, dependency: &Dependency) -> Result<bool> {
        let _ = dependency;
        anyhow::bail!("{} does not support yanking packages", self.location())
    }
}
