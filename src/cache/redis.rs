//! The Redis cache tier: a payload-capable remote cache, keyed by `<namespace><digest>`
//! (§4.7, §4.8).

use async_trait::async_trait;
use log::error;
use redis::AsyncCommands;

use crate::cache::CacheTier;
use crate::config::RedisConfig;

/// Connects lazily (via `redis::Client`'s multiplexed connection) on every call, so a
/// transient connection drop does not need explicit reconnect handling here.
pub struct RedisCache {
    client: redis::Client,
    namespace: String,
}

impl RedisCache {
    pub fn new(config: &RedisConfig) -> Result<Self, redis::RedisError> {
        let mut url = String::from("redis://");
        if let Some(username) = &config.username {
            url.push_str(username);
            if let Some(password) = &config.password {
                url.push(':');
                url.push_str(password);
            }
            url.push('@');
        } else if let Some(password) = &config.password {
            url.push(':');
            url.push_str(password);
            url.push('@');
        }
        url.push_str(&format!("{}:{}", config.host, config.port));

        Ok(RedisCache {
            client: redis::Client::open(url)?,
            namespace: config.namespace.clone(),
        })
    }

    fn key(&self, digest: &str) -> String {
        format!("{}{}", self.namespace, digest)
    }
}

#[async_trait]
impl CacheTier for RedisCache {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn supports_payload(&self) -> bool {
        true
    }

    async fn is_cached(&self, digest: &str) -> bool {
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            error!("Failed to connect to redis cache");
            return false;
        };
        match conn.exists::<_, bool>(self.key(digest)).await {
            Ok(exists) => exists,
            Err(e) => {
                error!("Redis EXISTS for {digest} failed: {e}");
                false
            }
        }
    }

    async fn get_cache_data(&self, digest: &str) -> Option<Vec<u8>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .inspect_err(|e| error!("Failed to connect to redis cache: {e}"))
            .ok()?;
        match conn.get::<_, Option<Vec<u8>>>(self.key(digest)).await {
            Ok(data) => data.filter(|d| !d.is_empty()),
            Err(e) => {
                error!("Redis GET for {digest} failed: {e}");
                None
            }
        }
    }

    async fn store_in_cache(&self, digest: &str) {
        self.store_in_cache_with_data(digest, b"").await;
    }

    async fn store_in_cache_with_data(&self, digest: &str, data: &[u8]) {
        let Ok(mut conn) = self.client.get_multiplexed_async_connection().await else {
            error!("Failed to connect to redis cache");
            return;
        };
        if let Err(e) = conn.set::<_, _, ()>(self.key(digest), data).await {
            error!("Redis SET for {digest} failed: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn key_includes_namespace_prefix() {
        let config = RedisConfig {
            host: "localhost".to_string(),
            port: 6379,
            username: None,
            password: None,
            namespace: "ctcache/".to_string(),
        };
        let cache = RedisCache::new(&config).unwrap();
        assert_eq!(cache.key("abc123"), "ctcache/abc123");
    }

    #[test]
    fn connection_url_embeds_credentials() {
        let config = RedisConfig {
            host: "redis.example.com".to_string(),
            port: 6380,
            username: Some("svc".to_string()),
            password: Some("hunter2".to_string()),
            namespace: "ctcache/".to_string(),
        };
        // Just exercises that construction does not error on a credentialed URL.
        assert!(RedisCache::new(&config).is_ok());
    }
}
