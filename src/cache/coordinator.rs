//! Composes the configured cache tiers into the single object the runner talks to:
//! fixed read orders per operation, unconditional write fan-out, and stats aggregation
//! (§4.8).

use std::path::Path;
use std::sync::Arc;

use crate::cache::gcs::GcsCache;
use crate::cache::http::HttpCache;
use crate::cache::local::LocalCache;
use crate::cache::redis::RedisCache;
use crate::cache::s3::S3Cache;
use crate::cache::CacheTier;
use crate::config::Config;
use crate::stats::StatsSnapshot;

/// Orders the configured tiers for each operation and fans writes out to all of them.
///
/// The local tier is always present; remote tiers are constructed lazily, only when
/// their corresponding environment variables are set (§4.7).
pub struct CacheCoordinator {
    local: Arc<LocalCache>,
    http: Option<Arc<HttpCache>>,
    redis: Option<Arc<RedisCache>>,
    s3: Option<Arc<S3Cache>>,
    gcs: Option<Arc<GcsCache>>,
}

impl CacheCoordinator {
    /// Builds a coordinator from `config`, constructing only the tiers whose backing
    /// environment variables were set.
    pub async fn from_config(config: &Config) -> Self {
        let local = Arc::new(LocalCache::new(config.cache_dir.clone()));

        let http = config.http.as_ref().map(|c| Arc::new(HttpCache::new(c)));

        let redis = match &config.redis {
            Some(c) => match RedisCache::new(c) {
                Ok(cache) => Some(Arc::new(cache)),
                Err(e) => {
                    log::error!("Failed to configure redis cache tier: {e}");
                    None
                }
            },
            None => None,
        };

        let s3 = match &config.s3 {
            Some(c) => Some(Arc::new(S3Cache::new(c).await)),
            None => None,
        };

        let gcs = match &config.gcs {
            Some(c) => Some(Arc::new(GcsCache::new(c).await)),
            None => None,
        };

        CacheCoordinator {
            local,
            http,
            redis,
            s3,
            gcs,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        self.local.cache_dir()
    }

    pub fn local(&self) -> &LocalCache {
        &self.local
    }

    /// Presence check in read order local → HTTP → S3 → GCS → Redis, short-circuiting
    /// on the first hit (§4.8).
    pub async fn is_cached(&self, digest: &str) -> bool {
        if self.local.is_cached(digest).await {
            return true;
        }
        if let Some(http) = &self.http {
            if http.is_cached(digest).await {
                return true;
            }
        }
        if let Some(s3) = &self.s3 {
            if s3.is_cached(digest).await {
                return true;
            }
        }
        if let Some(gcs) = &self.gcs {
            if gcs.is_cached(digest).await {
                return true;
            }
        }
        if let Some(redis) = &self.redis {
            if redis.is_cached(digest).await {
                return true;
            }
        }
        false
    }

    /// Payload lookup in read order local → GCS → Redis; HTTP and S3 are presence-only
    /// and are skipped entirely (§4.8).
    pub async fn get_cache_data(&self, digest: &str) -> Option<Vec<u8>> {
        if let Some(data) = self.local.get_cache_data(digest).await {
            return Some(data);
        }
        if let Some(gcs) = &self.gcs {
            if let Some(data) = gcs.get_cache_data(digest).await {
                return Some(data);
            }
        }
        if let Some(redis) = &self.redis {
            if let Some(data) = redis.get_cache_data(digest).await {
                return Some(data);
            }
        }
        None
    }

    /// Unconditional fan-out to every configured tier; a failure in one tier never
    /// prevents the others from being written (§4.8, §5).
    pub async fn store_in_cache(&self, digest: &str) {
        self.local.store_in_cache(digest).await;
        if let Some(http) = &self.http {
            http.store_in_cache(digest).await;
        }
        if let Some(s3) = &self.s3 {
            s3.store_in_cache(digest).await;
        }
        if let Some(gcs) = &self.gcs {
            gcs.store_in_cache(digest).await;
        }
        if let Some(redis) = &self.redis {
            redis.store_in_cache(digest).await;
        }
    }

    pub async fn store_in_cache_with_data(&self, digest: &str, data: &[u8]) {
        self.local.store_in_cache_with_data(digest, data).await;
        if let Some(http) = &self.http {
            http.store_in_cache_with_data(digest, data).await;
        }
        if let Some(s3) = &self.s3 {
            s3.store_in_cache_with_data(digest, data).await;
        }
        if let Some(gcs) = &self.gcs {
            gcs.store_in_cache_with_data(digest, data).await;
        }
        if let Some(redis) = &self.redis {
            redis.store_in_cache_with_data(digest, data).await;
        }
    }

    /// Delegates to the HTTP server's own aggregate view when one is configured;
    /// otherwise computes a snapshot from the local counters and a directory walk
    /// (§4.8, §6).
    pub async fn query_stats(&self) -> StatsSnapshot {
        if let Some(http) = &self.http {
            if let Some(snapshot) = http.query_stats().await {
                return snapshot;
            }
        }
        let (hits, misses) = self.local.read_counts();
        StatsSnapshot::local(hits, misses, self.local.cached_count() as u64)
    }
}
