//! The local filesystem cache tier: the first tier consulted and the one every other
//! backend exists to save a trip to (§4.6).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use log::warn;
use regex::Regex;

use crate::cache::CacheTier;
use crate::stats::StatsStore;

/// Matches the 38 hex characters left after the two-character shard prefix is split
/// off a digest, so stray files dropped into a shard directory don't inflate the count.
fn is_cache_entry_name(name: &str) -> bool {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9a-f]{38}$").expect("valid regex"))
        .is_match(name)
}

/// Splits a digest into the two-level shard `<dir>/<digest[0:2]>/<digest[2:]>` used for
/// both the presence marker and (when saved) the payload file.
fn shard_path(cache_dir: &Path, digest: &str) -> PathBuf {
    let (prefix, rest) = digest.split_at(2.min(digest.len()));
    cache_dir.join(prefix).join(rest)
}

/// Filesystem-backed cache tier, storing one file per digest under a sharded directory
/// tree, plus the hit/miss counters in `stats`.
pub struct LocalCache {
    cache_dir: PathBuf,
    stats: StatsStore,
}

impl LocalCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        LocalCache {
            stats: StatsStore::new(cache_dir.clone()),
            cache_dir,
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, digest: &str) -> PathBuf {
        shard_path(&self.cache_dir, digest)
    }

    /// Bumps the entry's mtime so it reads as recently used, without touching content.
    fn touch(path: &Path) {
        if let Err(e) = fs::File::open(path).and_then(|f| f.set_modified(SystemTime::now())) {
            warn!("Failed to touch cache entry {}: {e}", path.display());
        }
    }

    /// Records a hit or miss in the local stats counter. Failures are logged, not fatal:
    /// a cache that can't count is still a cache.
    fn record_stat(&self, hit: bool) {
        if let Err(e) = self.stats.record(hit) {
            warn!("Failed to update local cache stats: {e}");
        }
    }

    /// The number of entries currently stored, by walking the sharded tree. Used by the
    /// `--show-stats` management mode.
    pub fn cached_count(&self) -> usize {
        let Ok(shards) = fs::read_dir(&self.cache_dir) else {
            return 0;
        };
        shards
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|shard| {
                let Ok(entries) = fs::read_dir(shard.path()) else {
                    return 0;
                };
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| {
                        e.file_name()
                            .to_str()
                            .is_some_and(is_cache_entry_name)
                    })
                    .count()
            })
            .sum()
    }

    /// Deletes every cache entry (not the stats file). Used by the `clean` management
    /// mode; returns the number of files removed.
    pub fn clean(&self) -> io::Result<usize> {
        let mut removed = 0;
        let Ok(shards) = fs::read_dir(&self.cache_dir) else {
            return Ok(0);
        };
        for shard in shards.filter_map(|e| e.ok()) {
            let path = shard.path();
            if !path.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&path)?.filter_map(|e| e.ok()) {
                if fs::remove_file(entry.path()).is_ok() {
                    removed += 1;
                }
            }
            let _ = fs::remove_dir(&path);
        }
        Ok(removed)
    }

    pub fn read_counts(&self) -> (u64, u64) {
        self.stats.read_counts()
    }

    pub fn zero_stats(&self) -> io::Result<()> {
        self.stats.zero()
    }
}

#[async_trait]
impl CacheTier for LocalCache {
    fn name(&self) -> &'static str {
        "local"
    }

    fn supports_payload(&self) -> bool {
        true
    }

    async fn is_cached(&self, digest: &str) -> bool {
        let path = self.entry_path(digest);
        let hit = path.is_file();
        if hit {
            Self::touch(&path);
        }
        self.record_stat(hit);
        hit
    }

    async fn get_cache_data(&self, digest: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(digest);
        let result = match fs::read(&path) {
            Ok(data) => {
                Self::touch(&path);
                Some(data)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read cache entry {}: {e}", path.display());
                None
            }
        };
        self.record_stat(result.is_some());
        result
    }

    async fn store_in_cache(&self, digest: &str) {
        let path = self.entry_path(digest);
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create cache shard {}: {e}", parent.display());
                return;
            }
        }
        if let Err(e) = fs::File::create(&path) {
            warn!("Failed to create cache entry {}: {e}", path.display());
        }
    }

    async fn store_in_cache_with_data(&self, digest: &str, data: &[u8]) {
        let path = self.entry_path(digest);
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create cache shard {}: {e}", parent.display());
                return;
            }
        }
        if let Err(e) = fs::write(&path, data) {
            warn!("Failed to write cache entry {}: {e}", path.display());
        }
    }
}
