//! A streaming SHA-1 fingerprint accumulator, with an optional append-only debug dump.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

/// Streams bytes into a SHA-1 digest, optionally mirroring every byte into
/// `<dump-dir>/ctcache.dump` so operators can diff two digest computations byte-for-byte.
pub struct Hasher {
    inner: Sha1,
    dump: Option<File>,
}

impl Hasher {
    /// Creates a hasher with debug dumping disabled.
    pub fn new() -> Self {
        Hasher {
            inner: Sha1::new(),
            dump: None,
        }
    }

    /// Creates a hasher that additionally appends every hashed byte to
    /// `<dump_dir>/ctcache.dump`.
    pub fn with_debug_dump(dump_dir: &Path) -> io::Result<Self> {
        let path = dump_dir.join("ctcache.dump");
        let dump = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Hasher {
            inner: Sha1::new(),
            dump: Some(dump),
        })
    }

    /// Path the debug dump would be written to, for callers that want to log it.
    pub fn dump_path(dump_dir: &Path) -> PathBuf {
        dump_dir.join("ctcache.dump")
    }

    /// Feeds `bytes` into the digest (and, if enabled, the debug dump).
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
        if let Some(dump) = &mut self.dump {
            // A debug aid; failures here must never affect the digest itself.
            let _ = dump.write_all(bytes);
        }
    }

    /// Finalizes and returns the 40-hex-character digest.
    pub fn hexdigest(self) -> String {
        format!("{:x}", self.inner.finalize())
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn matches_known_sha1_vector() {
        let mut hasher = Hasher::new();
        hasher.update(b"abc");
        assert_eq!(hasher.hexdigest(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn incremental_updates_match_single_update() {
        let mut incremental = Hasher::new();
        incremental.update(b"ab");
        incremental.update(b"c");

        let mut single = Hasher::new();
        single.update(b"abc");

        assert_eq!(incremental.hexdigest(), single.hexdigest());
    }

    #[test]
    fn debug_dump_records_every_hashed_byte() {
        let dir = tempdir().unwrap();
        let mut hasher = Hasher::with_debug_dump(dir.path()).unwrap();
        hasher.update(b"abc");
        hasher.update(b"def");
        let dumped = fs::read(Hasher::dump_path(dir.path())).unwrap();
        assert_eq!(dumped, b"abcdef");
    }
}
