//! Process-wide configuration, read once from the environment.
//!
//! Every environment variable `ctcache` recognizes is parsed exactly once, here, into an
//! immutable [`Config`]. A malformed variable (an unparsable port, a broken regex) is
//! reported once at startup instead of surfacing deep inside the cache coordinator on
//! first use.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use regex::Regex;

/// Endpoint for the optional HTTP key/value cache server.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub proto: String,
    pub host: String,
    pub port: u16,
}

impl HttpConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.proto, self.host, self.port)
    }
}

/// Configuration for the S3 remote tier.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub folder: String,
    pub no_credentials: bool,
}

/// Configuration for the Google Cloud Storage remote tier.
#[derive(Debug, Clone)]
pub struct GcsConfig {
    pub bucket: String,
    pub folder: String,
    pub no_credentials: bool,
}

/// Configuration for the Redis remote tier.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub namespace: String,
}

/// All environment-sourced configuration for one `ctcache` invocation.
///
/// Constructed once in `main` and passed down by reference; nothing in the rest of the
/// crate reads the process environment directly.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub strip_list: Vec<String>,
    pub save_output: bool,
    pub ignore_output: bool,
    pub exclude_hash_regex: Option<Regex>,
    pub debug: bool,
    pub dump: bool,
    pub dump_dir: PathBuf,
    pub http: Option<HttpConfig>,
    pub s3: Option<S3Config>,
    pub gcs: Option<GcsConfig>,
    pub redis: Option<RedisConfig>,
}

fn env_flag(name: &str) -> bool {
    env::var(name).is_ok_and(|v| !v.is_empty())
}

fn default_cache_dir() -> PathBuf {
    let user = env::var("USER")
        .or_else(|_| env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    env::temp_dir().join(format!("ctcache-{user}"))
}

impl Config {
    /// Reads and validates every recognized `CTCACHE_*` environment variable.
    pub fn from_env() -> Result<Self> {
        let cache_dir = match env::var("CTCACHE_DIR") {
            Ok(v) if !v.is_empty() => PathBuf::from(v),
            _ => default_cache_dir(),
        };

        let strip_list = env::var("CTCACHE_STRIP")
            .ok()
            .filter(|v| !v.is_empty())
            .map(|v| v.split(':').map(str::to_string).collect())
            .unwrap_or_default();

        let exclude_hash_regex = match env::var("CTCACHE_EXCLUDE_HASH_REGEX") {
            Ok(v) if !v.is_empty() => Some(
                Regex::new(&v)
                    .with_context(|| format!("CTCACHE_EXCLUDE_HASH_REGEX is not valid: {v}"))?,
            ),
            _ => None,
        };

        let http = env::var("CTCACHE_HOST").ok().filter(|v| !v.is_empty()).map(|host| {
            let proto = env::var("CTCACHE_PROTO").unwrap_or_else(|_| "http".to_string());
            let port = env::var("CTCACHE_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(5000);
            HttpConfig { proto, host, port }
        });

        let s3 = env::var("CTCACHE_S3_BUCKET").ok().filter(|v| !v.is_empty()).map(|bucket| {
            S3Config {
                bucket,
                folder: env::var("CTCACHE_S3_FOLDER").unwrap_or_else(|_| "ctcache".to_string()),
                no_credentials: env_flag("CTCACHE_S3_NO_CREDENTIALS"),
            }
        });

        let gcs = env::var("CTCACHE_GCS_BUCKET").ok().filter(|v| !v.is_empty()).map(|bucket| {
            GcsConfig {
                bucket,
                folder: env::var("CTCACHE_GCS_FOLDER").unwrap_or_else(|_| "ctcache".to_string()),
                no_credentials: env_flag("CTCACHE_GCS_NO_CREDENTIALS"),
            }
        });

        let redis = env::var("CTCACHE_REDIS_HOST").ok().filter(|v| !v.is_empty()).map(|host| {
            let port = env::var("CTCACHE_REDIS_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(6379);
            RedisConfig {
                host,
                port,
                username: env::var("CTCACHE_REDIS_USERNAME").ok().filter(|v| !v.is_empty()),
                password: env::var("CTCACHE_REDIS_PASSWORD").ok().filter(|v| !v.is_empty()),
                namespace: env::var("CTCACHE_REDIS_NAMESPACE")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| "ctcache/".to_string()),
            }
        });

        Ok(Config {
            cache_dir,
            strip_list,
            save_output: env_flag("CTCACHE_SAVE_OUTPUT"),
            ignore_output: env_flag("CTCACHE_IGNORE_OUTPUT"),
            exclude_hash_regex,
            debug: env_flag("CTCACHE_DEBUG"),
            dump: env_flag("CTCACHE_DUMP"),
            dump_dir: env::var("CTCACHE_DUMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            http,
            s3,
            gcs,
            redis,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_with_no_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        for var in [
            "CTCACHE_DIR",
            "CTCACHE_STRIP",
            "CTCACHE_HOST",
            "CTCACHE_S3_BUCKET",
            "CTCACHE_GCS_BUCKET",
            "CTCACHE_REDIS_HOST",
            "CTCACHE_EXCLUDE_HASH_REGEX",
        ] {
            unsafe { env::remove_var(var) };
        }
        let config = Config::from_env().unwrap();
        assert!(config.strip_list.is_empty());
        assert!(config.http.is_none());
        assert!(config.s3.is_none());
        assert!(config.gcs.is_none());
        assert!(config.redis.is_none());
        assert!(!config.save_output);
    }

    #[test]
    fn parses_http_endpoint() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::set_var("CTCACHE_HOST", "cache.example.com");
            env::set_var("CTCACHE_PORT", "8080");
        }
        let config = Config::from_env().unwrap();
        let http = config.http.clone().expect("http tier should be configured");
        assert_eq!(http.base_url(), "http://cache.example.com:8080");
        unsafe {
            env::remove_var("CTCACHE_HOST");
            env::remove_var("CTCACHE_PORT");
        }
    }

    #[test]
    fn rejects_bad_regex() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe { env::set_var("CTCACHE_EXCLUDE_HASH_REGEX", "(unclosed") };
        assert!(Config::from_env().is_err());
        unsafe { env::remove_var("CTCACHE_EXCLUDE_HASH_REGEX") };
    }
}
