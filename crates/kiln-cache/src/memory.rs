//! In-memory content cache using moka
//!
//! Blobs are held as shared byte buffers keyed by cache key, with bounded
//! capacity and optional time-based expiration.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use kiln_asset::{ByteStream, Cache, CacheError};
use moka::future::Cache as MokaCache;
use std::sync::Arc;
use std::time::Duration;

/// Chunk size used when serving blobs back out as streams
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
    /// Total bytes held (weighted size)
    pub weighted_size: u64,
}

/// Bounded, concurrent in-memory blob cache
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: MokaCache<String, Arc<[u8]>>,
}

impl MemoryCache {
    /// Create cache holding at most `max_capacity` blobs
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: MokaCache::new(max_capacity),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: MokaCache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Create cache bounded by total bytes rather than entry count
    #[must_use]
    pub fn with_byte_capacity(max_bytes: u64) -> Self {
        Self {
            inner: MokaCache::builder()
                .weigher(|_key: &String, blob: &Arc<[u8]>| {
                    u32::try_from(blob.len()).unwrap_or(u32::MAX)
                })
                .max_capacity(max_bytes)
                .build(),
        }
    }

    /// Check if cache contains key
    #[inline]
    #[must_use]
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.get(key).await.is_some()
    }

    /// Invalidate cache entry
    #[inline]
    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Get cache statistics
    ///
    /// Counts are eventually consistent; call after pending tasks settle for
    /// exact numbers.
    #[must_use]
    pub async fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks().await;
        CacheStats {
            entry_count: self.inner.entry_count(),
            weighted_size: self.inner.weighted_size(),
        }
    }
}

impl Default for MemoryCache {
    /// Create cache with default capacity (10,000 entries)
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set_stream(&self, key: &str, stream: ByteStream) -> Result<String, CacheError> {
        let chunks: Vec<Vec<u8>> = stream.try_collect().await.map_err(CacheError::Stream)?;
        let blob: Arc<[u8]> = chunks.concat().into();
        tracing::trace!(key, bytes = blob.len(), "memory cache write");
        self.inner.insert(key.to_string(), blob).await;
        Ok(key.to_string())
    }

    async fn get_stream(&self, key: &str) -> Result<ByteStream, CacheError> {
        let blob = self
            .inner
            .get(key)
            .await
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        let chunks: Vec<std::io::Result<Vec<u8>>> = blob
            .chunks(READ_CHUNK_SIZE)
            .map(|chunk| Ok(chunk.to_vec()))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_stream(chunks: &[&[u8]]) -> ByteStream {
        let owned: Vec<std::io::Result<Vec<u8>>> =
            chunks.iter().map(|c| Ok(c.to_vec())).collect();
        stream::iter(owned).boxed()
    }

    async fn read_all(stream: ByteStream) -> Vec<u8> {
        let chunks: Vec<Vec<u8>> = stream.try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn set_and_get_round_trip() {
        let cache = MemoryCache::new(100);
        let key = cache
            .set_stream("k1", byte_stream(&[b"hello ", b"world"]))
            .await
            .unwrap();
        assert_eq!(key, "k1");

        let stream = cache.get_stream("k1").await.unwrap();
        assert_eq!(read_all(stream).await, b"hello world");
    }

    #[tokio::test]
    async fn each_get_is_a_fresh_stream() {
        let cache = MemoryCache::new(100);
        cache.set_stream("k", byte_stream(&[b"abc"])).await.unwrap();
        assert_eq!(read_all(cache.get_stream("k").await.unwrap()).await, b"abc");
        assert_eq!(read_all(cache.get_stream("k").await.unwrap()).await, b"abc");
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let cache = MemoryCache::default();
        let err = cache.get_stream("missing").await.err().unwrap();
        assert!(matches!(err, CacheError::NotFound(k) if k == "missing"));
    }

    #[tokio::test]
    async fn failing_source_stream_is_reported() {
        let cache = MemoryCache::new(10);
        let source: Vec<std::io::Result<Vec<u8>>> = vec![
            Ok(b"partial".to_vec()),
            Err(std::io::Error::other("broken pipe")),
        ];
        let err = cache
            .set_stream("k", stream::iter(source).boxed())
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Stream(_)));
        assert!(!cache.contains("k").await);
    }

    #[tokio::test]
    async fn invalidation() {
        let cache = MemoryCache::new(100);
        cache.set_stream("k", byte_stream(&[b"x"])).await.unwrap();
        assert!(cache.contains("k").await);

        cache.invalidate("k").await;
        assert!(!cache.contains("k").await);
    }

    #[tokio::test]
    async fn stats_track_entries_and_bytes() {
        let cache = MemoryCache::with_byte_capacity(1024 * 1024);
        for i in 0..5 {
            let body = format!("content {i}");
            cache
                .set_stream(&format!("k{i}"), byte_stream(&[body.as_bytes()]))
                .await
                .unwrap();
        }

        let stats = cache.stats().await;
        assert_eq!(stats.entry_count, 5);
        assert_eq!(stats.weighted_size, 5 * 9);
    }
}
