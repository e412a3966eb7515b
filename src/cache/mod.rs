//! The cache tier abstraction shared by the local filesystem cache and every remote
//! backend, plus the coordinator that composes them.

pub mod coordinator;
pub mod gcs;
pub mod http;
pub mod local;
pub mod redis;
pub mod s3;

pub use coordinator::CacheCoordinator;
pub use local::LocalCache;

use async_trait::async_trait;

/// One cache backend: the local filesystem, or a remote key/value/object store.
///
/// Presence-only tiers (HTTP, S3) just leave [`CacheTier::get_cache_data`] and
/// [`CacheTier::store_in_cache_with_data`] at their default implementations; payload
/// tiers (local, Redis, GCS) override both and set [`CacheTier::supports_payload`].
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// A short name for logging ("local", "http", "redis", "s3", "gcs").
    fn name(&self) -> &'static str;

    /// Whether this tier can store and return a payload, not just presence.
    fn supports_payload(&self) -> bool {
        false
    }

    /// Whether `digest` has been seen by this tier.
    async fn is_cached(&self, digest: &str) -> bool;

    /// Returns the stored payload for `digest`, if this tier supports payloads and has
    /// one. `None` on a miss or on a presence-only tier.
    async fn get_cache_data(&self, digest: &str) -> Option<Vec<u8>> {
        None
    }

    /// Records that `digest` has been seen, with no payload.
    async fn store_in_cache(&self, digest: &str);

    /// Records that `digest` has been seen, along with its payload. Tiers that do not
    /// support payloads fall back to a presence-only store.
    async fn store_in_cache_with_data(&self, digest: &str, data: &[u8]) {
        let _ = data;
        self.store_in_cache(digest).await;
    }
}
