use super::{Cache, CacheKey, CatalogSource};
use crate::{cached, error::AppResult, models::FoodItem};

/// Bumped whenever the cached `FoodItem` layout changes
const CATALOG_CACHE_VERSION: u32 = 1;

/// Catalog source that keeps the catalog in Redis between requests
pub struct CachedCatalog<S> {
    source: S,
    cache: Cache,
    ttl: u64,
}

impl<S: CatalogSource> CachedCatalog<S> {
    pub fn new(source: S, cache: Cache, ttl: u64) -> Self {
        Self { source, cache, ttl }
    }
}

#[async_trait::async_trait]
impl<S: CatalogSource> CatalogSource for CachedCatalog<S> {
    async fn load_catalog(&self) -> AppResult<Vec<FoodItem>> {
        cached!(
            self.cache,
            CacheKey::Catalog(CATALOG_CACHE_VERSION),
            self.ttl,
            async { self.source.load_catalog().await }
        )
    }
}
