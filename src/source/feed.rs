//! Remote paged catalog feed.
//!
//! The feed serves `GET {base}/packages` as JSON pages of catalog entries.
//! Pagination uses an opaque continuation token: a page that has more
//! results carries `next`, which the client sends back as `after=<token>`
//! until a page arrives without one. Filters (`id`, `id_prefix`,
//! `latest=true`) are evaluated server-side to keep transfer volume down;
//! results are still run through the local query helpers as a defensive
//! second pass.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::archive::ARCHIVE_EXTENSION;
use crate::dependency::Dependency;
use crate::error::PackageError;
use crate::http::HttpClient;
use crate::manifest::Manifest;
use crate::runtime::Runtime;

use super::{PackageSource, query};

/// Feed wire types (internal).
mod api {
    use serde::Deserialize;

    use crate::manifest::Manifest;

    /// One page of catalog entries. The entry shape is the metadata
    /// document itself, so `Manifest` deserializes it directly.
    #[derive(Deserialize, Debug)]
    pub struct Page {
        pub packages: Vec<Manifest>,
        /// Continuation token; absent on the last page.
        #[serde(default)]
        pub next: Option<String>,
    }
}

/// A remote feed source. Caches the full page set for its lifetime.
pub struct RemoteFeed<'a, R: Runtime> {
    runtime: &'a R,
    http_client: HttpClient,
    base_url: String,
    cache: Mutex<Option<Vec<Manifest>>>,
}

impl<'a, R: Runtime> RemoteFeed<'a, R> {
    /// Create a new feed source over a base URL.
    pub fn new(runtime: &'a R, client: Client, base_url: &str) -> Self {
        Self::from_http_client(runtime, HttpClient::new(client), base_url)
    }

    /// Create from an existing HttpClient.
    pub fn from_http_client(runtime: &'a R, http_client: HttpClient, base_url: &str) -> Self {
        Self {
            runtime,
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Mutex::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Follow continuation tokens until a page carries none, concatenating
    /// results in page order. Entries are deduplicated by (id, version) so
    /// a retried or overlapping page cannot duplicate results; a repeated
    /// token ends the walk rather than looping.
    async fn fetch_all_pages(&self, filters: &[(&str, &str)]) -> Result<Vec<Manifest>> {
        let url = format!("{}/packages", self.base_url);
        let mut results = Vec::new();
        let mut seen_entries: HashSet<(String, String)> = HashSet::new();
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut token: Option<String> = None;
        let mut page_number = 1;

        loop {
            let mut query: Vec<(&str, &str)> = filters.to_vec();
            if let Some(ref t) = token {
                query.push(("after", t));
            }
            debug!("Fetching catalog page {} from {}...", page_number, url);

            let page: api::Page = self.http_client.get_json_with_query(&url, &query).await?;

            for manifest in page.packages {
                let key = (manifest.id.clone(), manifest.version.to_string());
                if seen_entries.insert(key) {
                    results.push(manifest);
                }
            }

            match page.next {
                Some(next) => {
                    if !seen_tokens.insert(next.clone()) {
                        debug!("Continuation token repeated, stopping pagination");
                        break;
                    }
                    token = Some(next);
                    page_number += 1;
                }
                None => break,
            }
        }

        debug!("Fetched {} catalog entries over {} page(s)", results.len(), page_number);
        Ok(results)
    }
}

#[async_trait]
impl<R: Runtime> PackageSource for RemoteFeed<'_, R> {
    fn location(&self) -> String {
        self.base_url.clone()
    }

    async fn packages(&self) -> Result<Vec<Manifest>> {
        let mut cache = self.cache.lock().await;
        if cache.is_none() {
            *cache = Some(self.fetch_all_pages(&[]).await?);
        }
        Ok(cache.clone().unwrap_or_default())
    }

    async fn get(&self, dependency: &Dependency) -> Result<Option<Manifest>> {
        let entries = self.packages_with_id(&dependency.id).await?;
        Ok(query::best_match(entries, dependency))
    }

    async fn packages_with_id(&self, id: &str) -> Result<Vec<Manifest>> {
        let entries = self.fetch_all_pages(&[("id", id)]).await?;
        Ok(query::with_id(entries, id))
    }

    async fn packages_with_id_starting_with(&self, prefix: &str) -> Result<Vec<Manifest>> {
        let entries = self.fetch_all_pages(&[("id_prefix", prefix)]).await?;
        Ok(query::with_id_prefix(entries, prefix))
    }

    async fn packages_matching(&self, dependencies: &[Dependency]) -> Result<Vec<Manifest>> {
        let entries = match dependencies.first() {
            Some(first) => self.fetch_all_pages(&[("id", &first.id)]).await?,
            None => Vec::new(),
        };
        query::matching(entries, dependencies)
    }

    async fn latest_packages(&self) -> Result<Vec<Manifest>> {
        // The server filters to latest versions; dedupe defensively anyway.
        let entries = self.fetch_all_pages(&[("latest", "true")]).await?;
        Ok(query::latest(entries))
    }

    async fn fetch(&self, dependency: &Dependency, target_dir: &Path) -> Result<PathBuf> {
        let manifest = self.get(dependency).await?.ok_or_else(|| {
            PackageError::PackageNotFound(format!("{} in {}", dependency, self.location()))
        })?;
        let archive_url = manifest.archive_url.clone().with_context(|| {
            format!(
                "Feed entry {} has no archive download location",
                manifest.id_and_version()
            )
        })?;

        let target = target_dir.join(format!("{}.{}", manifest.id_and_version(), ARCHIVE_EXTENSION));
        self.http_client
            .download_file(&archive_url, || {
                self.runtime
                    .create_file(&target)
                    .with_context(|| format!("Failed to create archive file at {:?}", target))
            })
            .await?;
        Ok(target)
    }
}
