//! The S3 cache tier: a presence-only remote cache, objects at
//! `<folder>/<digest[0:2]>/<digest[2:]>` (§4.7, §4.8). S3 is never consulted for
//! payload data, only presence. In anonymous mode (no credentials configured),
//! reads still work against a public bucket but writes are skipped entirely.

use async_trait::async_trait;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::Client;
use log::error;

use crate::cache::CacheTier;
use crate::config::S3Config;

pub struct S3Cache {
    client: Client,
    bucket: String,
    folder: String,
    anonymous: bool,
}

impl S3Cache {
    pub async fn new(config: &S3Config) -> Self {
        let shared = aws_config::load_from_env().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if config.no_credentials {
            builder = builder.credentials_provider(Credentials::for_tests());
        }
        S3Cache {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            folder: config.folder.clone(),
            anonymous: config.no_credentials,
        }
    }

    fn object_key(&self, digest: &str) -> String {
        let (prefix, rest) = digest.split_at(2.min(digest.len()));
        format!("{}/{prefix}/{rest}", self.folder)
    }
}

#[async_trait]
impl CacheTier for S3Cache {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn is_cached(&self, digest: &str) -> bool {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.object_key(digest))
            .send()
            .await
        {
            Ok(_) => true,
            Err(SdkError::ServiceError(e)) if e.err().is_not_found() => false,
            Err(e) => {
                error!("S3 head_object for {digest} failed: {e}");
                false
            }
        }
    }

    async fn store_in_cache(&self, digest: &str) {
        if self.anonymous {
            return;
        }
        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(self.object_key(digest))
            .body(digest.as_bytes().to_vec().into())
            .send()
            .await;
        if let Err(e) = result {
            error!("S3 put_object for {digest} failed: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn object_key_shards_by_digest_prefix() {
        let config = S3Config {
            bucket: "bucket".to_string(),
            folder: "ctcache".to_string(),
            no_credentials: true,
        };
        let cache = S3Cache::new(&config).await;
        assert_eq!(cache.object_key("abcdef0123"), "ctcache/ab/cdef0123");
    }

    #[tokio::test]
    async fn store_is_skipped_in_anonymous_mode() {
        let config = S3Config {
            bucket: "bucket".to_string(),
            folder: "ctcache".to_string(),
            no_credentials: true,
        };
        let cache = S3Cache::new(&config).await;
        // No real S3 endpoint is reachable here; if store_in_cache attempted a
        // put_object it would hang or error against the real AWS endpoint. Returning
        // cleanly confirms the anonymous early-return fired instead.
        cache.store_in_cache("abcdef0123").await;
    }
}
