//! Cache statistics: the concurrency-safe local hit/miss counter, and the snapshot type
//! used to print `--show-stats` output (whether the numbers came from the local cache
//! or were delegated to the HTTP stats server).

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use serde::Deserialize;

const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(100);
const LOCK_TIMEOUT: Duration = Duration::from_secs(3);

/// Holds the advisory lock on `<cache-dir>/stats.lock` for the lifetime of the guard.
/// Release happens on every exit path, including panics, via `Drop`.
struct StatsLockGuard {
    path: PathBuf,
}

impl Drop for StatsLockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn acquire_lock(lock_path: &Path) -> Result<StatsLockGuard> {
    let start = Instant::now();
    loop {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(lock_path)
        {
            Ok(_) => {
                return Ok(StatsLockGuard {
                    path: lock_path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if start.elapsed() >= LOCK_TIMEOUT {
                    bail!(
                        "timed out acquiring stats lock at {} after {:?}; it may be stale and safe to remove by hand",
                        lock_path.display(),
                        LOCK_TIMEOUT
                    );
                }
                sleep(LOCK_RETRY_INTERVAL);
            }
            Err(e) => bail!("failed to create stats lock {}: {e}", lock_path.display()),
        }
    }
}

/// The local hit/miss counter file under `<cache-dir>/stats`.
pub struct StatsStore {
    dir: PathBuf,
}

impl StatsStore {
    pub fn new(dir: PathBuf) -> Self {
        StatsStore { dir }
    }

    fn stats_path(&self) -> PathBuf {
        self.dir.join("stats")
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join("stats.lock")
    }

    /// Reads `(hits, misses)`. A missing or malformed file reads as `(0, 0)`.
    pub fn read_counts(&self) -> (u64, u64) {
        let Ok(contents) = fs::read_to_string(self.stats_path()) else {
            return (0, 0);
        };
        let mut parts = contents.split_whitespace();
        let hits = parts.next().and_then(|s| s.parse().ok());
        let misses = parts.next().and_then(|s| s.parse().ok());
        match (hits, misses) {
            (Some(h), Some(m)) => (h, m),
            _ => (0, 0),
        }
    }

    /// Increments the hit (or miss) counter, serialized by the advisory lock.
    pub fn record(&self, hit: bool) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| anyhow::anyhow!("failed to create cache directory {}: {e}", self.dir.display()))?;
        let _guard = acquire_lock(&self.lock_path())?;
        let (mut hits, mut misses) = self.read_counts();
        if hit {
            hits += 1;
        } else {
            misses += 1;
        }
        fs::write(self.stats_path(), format!("{hits} {misses}\n"))
            .map_err(|e| anyhow::anyhow!("failed to write stats file: {e}"))?;
        Ok(())
    }

    /// Deletes the local stats file. Missing is not an error.
    pub fn zero(&self) -> io::Result<()> {
        match fs::remove_file(self.stats_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// A point-in-time view of cache statistics, either computed locally or delegated to
/// the HTTP stats server (whose response carries the richer, optional fields).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsSnapshot {
    pub hit_count: u64,
    pub miss_count: u64,
    #[serde(default)]
    pub hit_rate: Option<f64>,
    #[serde(default)]
    pub miss_rate: Option<f64>,
    #[serde(default)]
    pub total_hit_rate: Option<f64>,
    #[serde(default)]
    pub cached_count: Option<u64>,
    #[serde(default)]
    pub cleaned_count: Option<u64>,
    #[serde(default)]
    pub cleaned_seconds_ago: Option<u64>,
    #[serde(default)]
    pub saved_seconds_ago: Option<u64>,
    #[serde(default)]
    pub saved_size_bytes: Option<u64>,
    #[serde(default)]
    pub uptime_seconds: Option<u64>,
    #[serde(default)]
    pub age_days_histogram: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub hit_count_histogram: Option<BTreeMap<String, u64>>,
}

impl StatsSnapshot {
    /// Builds a snapshot purely from the local counters plus a walked `cached_count`.
    /// Every field the local backend cannot produce (age histograms, uptime, ...)
    /// stays `None`.
    pub fn local(hit_count: u64, miss_count: u64, cached_count: u64) -> Self {
        let total = hit_count + miss_count;
        let rate = |n: u64| if total == 0 { None } else { Some(n as f64 / total as f64) };
        StatsSnapshot {
            hit_count,
            miss_count,
            hit_rate: rate(hit_count),
            miss_rate: rate(miss_count),
            cached_count: Some(cached_count),
            ..Default::default()
        }
    }
}

fn row(label: &str, value: Option<String>) {
    println!("{label}: {}", value.unwrap_or_else(|| "N/A".to_string()));
}

fn fmt_rate(rate: Option<f64>) -> Option<String> {
    rate.map(|r| format!("{:.2}%", r * 100.0))
}

/// Prints a stats snapshot. Every row is independent: a missing field prints `N/A`
/// rather than failing the whole command (§9 open question).
pub fn print_stats(snapshot: &StatsSnapshot) {
    row("Cache hits", Some(snapshot.hit_count.to_string()));
    row("Cache misses", Some(snapshot.miss_count.to_string()));
    row("Hit rate", fmt_rate(snapshot.hit_rate));
    row("Miss rate", fmt_rate(snapshot.miss_rate));
    row("Total hit rate", fmt_rate(snapshot.total_hit_rate));
    row("Cached entries", snapshot.cached_count.map(|v| v.to_string()));
    row("Cleaned entries", snapshot.cleaned_count.map(|v| v.to_string()));
    row(
        "Last cleaned",
        snapshot.cleaned_seconds_ago.map(|v| format!("{v}s ago")),
    );
    row(
        "Last saved",
        snapshot.saved_seconds_ago.map(|v| format!("{v}s ago")),
    );
    row("Saved size", snapshot.saved_size_bytes.map(|v| format!("{v} bytes")));
    row("Server uptime", snapshot.uptime_seconds.map(|v| format!("{v}s")));
}
