//! Grid resolution against the external region catalog
//!
//! Request clients identify grids by the numeric ids of the region catalog;
//! the grid configuration identifies them by name. The catalog returns a
//! collection of `{grid_id, resolution}` entries and the resolver maps one to
//! the other.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Resolve an external grid id to a grid name
#[async_trait]
pub trait GridResolver: Send + Sync + 'static {
    async fn resolve_grid_name(&self, grid_id: &str) -> Result<String, ResolveError>;
}

#[derive(Debug, Error)]
pub enum ResolveError {
    /// No catalog entry carries this grid id
    #[error("grid_id '{0}' not found in region catalog")]
    NotFound(String),

    /// The catalog could not be reached or returned an unusable response
    #[error("region catalog unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<reqwest::Error> for ResolveError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ResolveError::UpstreamUnavailable("request timed out".to_string())
        } else {
            ResolveError::UpstreamUnavailable(error.to_string())
        }
    }
}

/// One entry of the region catalog
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    /// Numeric or string id; compared in its string form
    #[serde(default)]
    pub grid_id: serde_json::Value,

    #[serde(default)]
    pub resolution: Option<String>,
}

impl CatalogEntry {
    fn matches(&self, grid_id: &str) -> bool {
        match &self.grid_id {
            serde_json::Value::String(id) => id.trim() == grid_id,
            serde_json::Value::Number(id) => id.to_string() == grid_id,
            _ => false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogBody {
    Entries(Vec<CatalogEntry>),
    Wrapped { data: Vec<CatalogEntry> },
}

impl CatalogBody {
    fn into_entries(self) -> Vec<CatalogEntry> {
        match self {
            CatalogBody::Entries(entries) | CatalogBody::Wrapped { data: entries } => entries,
        }
    }
}

/// Find the resolution declared for `grid_id`
///
/// Entries carrying the id but no resolution are skipped.
pub fn find_resolution(entries: &[CatalogEntry], grid_id: &str) -> Result<String, ResolveError> {
    let grid_id = grid_id.trim();

    entries
        .iter()
        .filter(|entry| entry.matches(grid_id))
        .find_map(|entry| entry.resolution.clone())
        .ok_or_else(|| ResolveError::NotFound(grid_id.to_string()))
}

struct CachedCatalog {
    entries: Arc<Vec<CatalogEntry>>,
    expires_at: Instant,
}

/// [`GridResolver`] backed by the region catalog HTTP service
///
/// Every lookup fetches the catalog unless a cache TTL is configured, in
/// which case a successfully fetched catalog is reused for at most that long.
/// Failed fetches are never cached.
pub struct RegionCatalogResolver {
    url: String,
    http: reqwest::Client,
    cache_ttl: Duration,
    cache: RwLock<Option<CachedCatalog>>,
}

impl RegionCatalogResolver {
    /// Create a resolver
    ///
    /// # Arguments
    ///
    /// * `url` - Catalog endpoint returning the `{grid_id, resolution}` collection
    /// * `timeout` - Per-request timeout for catalog calls
    /// * `cache_ttl` - How long a fetched catalog may be reused (`Duration::ZERO` disables caching)
    pub fn new(url: impl Into<String>, timeout: Duration, cache_ttl: Duration) -> Result<Self, ResolveError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            url: url.into(),
            http,
            cache_ttl,
            cache: RwLock::new(None),
        })
    }

    fn cache_enabled(&self) -> bool {
        self.cache_ttl > Duration::ZERO
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, ResolveError> {
        let response = self.http.get(&self.url).send().await?.error_for_status()?;
        let body: CatalogBody = response.json().await?;
        Ok(body.into_entries())
    }

    async fn catalog(&self) -> Result<Arc<Vec<CatalogEntry>>, ResolveError> {
        if !self.cache_enabled() {
            return Ok(Arc::new(self.fetch_catalog().await?));
        }

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|cached| cached.expires_at > Instant::now()) {
                return Ok(cached.entries.clone());
            }
        }

        let entries = Arc::new(self.fetch_catalog().await?);
        tracing::debug!(entries = entries.len(), "refreshed region catalog cache");

        let mut cache = self.cache.write().await;
        *cache = Some(CachedCatalog {
            entries: entries.clone(),
            expires_at: Instant::now() + self.cache_ttl,
        });

        Ok(entries)
    }
}

#[async_trait]
impl GridResolver for RegionCatalogResolver {
    async fn resolve_grid_name(&self, grid_id: &str) -> Result<String, ResolveError> {
        let entries = self.catalog().await?;
        find_resolution(&entries, grid_id)
    }
}
