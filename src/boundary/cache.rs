//! Boundary dataset cache keyed by dataset identity.
//!
//! Remote datasets are downloaded once into the cache directory and every
//! parsed [`TerritorySet`] is kept in memory until it is invalidated.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info};
use url::Url;
use xxhash_rust::xxh64::xxh64;

use super::territory::{load_territories, LabelProperties};
use crate::error::Error;
use crate::models::TerritorySet;

/// Where a boundary dataset comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasetSource {
    Local(PathBuf),
    Remote(Url),
}

impl DatasetSource {
    /// http(s) URLs are remote, anything else is a filesystem path
    pub fn parse(s: &str) -> Self {
        match Url::parse(s) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => DatasetSource::Remote(url),
            _ => DatasetSource::Local(PathBuf::from(s)),
        }
    }

    /// Cache key
    pub fn identity(&self) -> String {
        self.to_string()
    }

    fn is_gzip(&self) -> bool {
        match self {
            DatasetSource::Local(p) => p.extension().map_or(false, |e| e == "gz"),
            DatasetSource::Remote(u) => u.path().ends_with(".gz"),
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Local(p) => write!(f, "{}", p.display()),
            DatasetSource::Remote(u) => write!(f, "{}", u),
        }
    }
}

/// Explicit, invalidatable cache of loaded boundary datasets
pub struct BoundaryCache {
    cache_dir: PathBuf,
    properties: LabelProperties,
    client: Client,
    loaded: HashMap<String, Arc<TerritorySet>>,
}

impl BoundaryCache {
    pub fn new(cache_dir: impl Into<PathBuf>, properties: LabelProperties) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("territorio/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            cache_dir: cache_dir.into(),
            properties,
            client,
            loaded: HashMap::new(),
        })
    }

    /// Get the territories for a dataset, loading (and downloading) on a miss
    pub async fn get(&mut self, source: &DatasetSource) -> Result<Arc<TerritorySet>> {
        let key = source.identity();

        if let Some(set) = self.loaded.get(&key) {
            debug!("Boundary cache hit for {}", key);
            return Ok(Arc::clone(set));
        }

        let path = match source {
            DatasetSource::Local(path) => path.clone(),
            DatasetSource::Remote(url) => self.download(source, url).await?,
        };

        let set = load_territories(&path, &key, &self.properties)
            .with_context(|| format!("Failed to load boundaries from {}", path.display()))?;
        let set = Arc::new(set);
        self.loaded.insert(key, Arc::clone(&set));

        Ok(set)
    }

    /// Drop a dataset from memory and, for remote sources, from disk.
    /// Returns whether anything was cached.
    pub fn invalidate(&mut self, source: &DatasetSource) -> Result<bool> {
        let mut removed = self.loaded.remove(&source.identity()).is_some();

        if let DatasetSource::Remote(_) = source {
            let path = self.cached_path(source);
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                removed = true;
            }
        }

        if removed {
            info!("Invalidated cached boundaries for {}", source);
        }
        Ok(removed)
    }

    /// Forget every in-memory dataset. Downloaded files are kept.
    pub fn clear(&mut self) {
        self.loaded.clear();
    }

    pub fn is_loaded(&self, source: &DatasetSource) -> bool {
        self.loaded.contains_key(&source.identity())
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// On-disk location of a downloaded dataset
    pub fn cached_path(&self, source: &DatasetSource) -> PathBuf {
        let hash = xxh64(source.identity().as_bytes(), 0);
        let ext = if source.is_gzip() { "geojson.gz" } else { "geojson" };
        self.cache_dir.join(format!("{:016x}.{}", hash, ext))
    }

    async fn download(&self, source: &DatasetSource, url: &Url) -> Result<PathBuf> {
        let path = self.cached_path(source);
        if path.exists() {
            info!("Using downloaded boundaries at {}", path.display());
            return Ok(path);
        }

        std::fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!("Failed to create cache dir {}", self.cache_dir.display())
        })?;

        info!("Downloading boundaries from {}...", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .context("Boundary download failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Boundary download returned {}", response.status());
        }

        let bytes = response.bytes().await.map_err(Error::from)?;
        // Write under a temporary name so an interrupted download is never reused
        let partial = path.with_extension("part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        info!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }
}
