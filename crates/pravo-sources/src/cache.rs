//! Filesystem cache of fetched raw bytes, keyed by URL hash.

use pravo_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Content cache under one directory. Entries never expire on their own;
/// re-ingest overwrites them.
pub struct FetchCache {
    dir: PathBuf,
}

impl FetchCache {
    /// Opens (and creates) a cache directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Internal(anyhow::anyhow!("cache dir: {e}")))?;
        Ok(Self { dir })
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join(hex::encode(digest))
    }

    /// Cached bytes for a URL, if present.
    pub async fn get(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.path_for(url);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(url, bytes = bytes.len(), "cache hit");
                Some(bytes)
            }
            Err(_) => None,
        }
    }

    /// Stores bytes for a URL.
    pub async fn put(&self, url: &str, bytes: &[u8]) -> Result<()> {
        tokio::fs::write(self.path_for(url), bytes)
            .await
            .map_err(|e| Error::Internal(anyhow::anyhow!("cache write: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::open(dir.path()).await.unwrap();
        assert!(cache.get("https://example.test/a").await.is_none());
        cache.put("https://example.test/a", b"body").await.unwrap();
        assert_eq!(cache.get("https://example.test/a").await.unwrap(), b"body");
        assert!(cache.get("https://example.test/b").await.is_none());
    }
}
