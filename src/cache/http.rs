//! The HTTP cache tier: a presence-only remote cache reached over a small REST API
//! (§4.7, §4.8). Network failures are treated as a miss and logged, never as a hard
//! error — a flaky cache server must not block the analyzer from running.

use async_trait::async_trait;
use log::error;
use reqwest::Client;
use std::time::Duration;

use crate::cache::CacheTier;
use crate::config::HttpConfig;
use crate::stats::StatsSnapshot;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Talks to the `ctcache` HTTP server: `GET /is_cached/<digest>`, `GET /cache/<digest>`
/// (stores), and `GET /stats`.
pub struct HttpCache {
    base_url: String,
    client: Client,
}

impl HttpCache {
    pub fn new(config: &HttpConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        HttpCache {
            base_url: config.base_url(),
            client,
        }
    }

    /// Queries the server's own aggregate stats, for `--show-stats` when an HTTP tier is
    /// configured (§6). Returns `None` on any network or decode failure.
    pub async fn query_stats(&self) -> Option<StatsSnapshot> {
        match self.client.get(format!("{}/stats", self.base_url)).send().await {
            Ok(resp) => match resp.json::<StatsSnapshot>().await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    error!("Failed to decode stats response from cache server: {e}");
                    None
                }
            },
            Err(e) => {
                error!("Failed to reach cache server for stats: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl CacheTier for HttpCache {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn is_cached(&self, digest: &str) -> bool {
        match self
            .client
            .get(format!("{}/is_cached/{digest}", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.json::<bool>().await.unwrap_or_else(|e| {
                error!("Failed to decode is_cached response for {digest}: {e}");
                false
            }),
            Err(e) => {
                error!("HTTP cache lookup for {digest} failed: {e}");
                false
            }
        }
    }

    async fn store_in_cache(&self, digest: &str) {
        if let Err(e) = self
            .client
            .get(format!("{}/cache/{digest}", self.base_url))
            .send()
            .await
        {
            error!("HTTP cache store for {digest} failed: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mockito::Server;

    fn http_config(base: &str) -> HttpConfig {
        // mockito gives us "http://127.0.0.1:PORT"; split it by hand rather than
        // pulling in a URL-parsing crate just for tests.
        let rest = base.strip_prefix("http://").expect("mockito serves plain http");
        let (host, port) = rest.split_once(':').expect("mockito url carries a port");
        HttpConfig {
            proto: "http".to_string(),
            host: host.to_string(),
            port: port.parse().expect("mockito port is numeric"),
        }
    }

    #[tokio::test]
    async fn is_cached_true_on_json_true_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/is_cached/abc123")
            .with_status(200)
            .with_body("true")
            .create_async()
            .await;
        let cache = HttpCache::new(&http_config(&server.url()));
        assert!(cache.is_cached("abc123").await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn is_cached_false_on_json_false_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/is_cached/missing")
            .with_status(200)
            .with_body("false")
            .create_async()
            .await;
        let cache = HttpCache::new(&http_config(&server.url()));
        assert!(!cache.is_cached("missing").await);
    }

    #[tokio::test]
    async fn is_cached_false_on_network_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/is_cached/missing")
            .with_status(404)
            .create_async()
            .await;
        let cache = HttpCache::new(&http_config(&server.url()));
        assert!(!cache.is_cached("missing").await);
    }

    #[tokio::test]
    async fn store_in_cache_gets_the_store_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/cache/abc123")
            .with_status(200)
            .create_async()
            .await;
        let cache = HttpCache::new(&http_config(&server.url()));
        cache.store_in_cache("abc123").await;
        mock.assert_async().await;
    }
}
