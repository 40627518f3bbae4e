//! Testing utilities for kiln workspace
//!
//! Shared fakes, fixtures and setup for asset tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kiln_asset::{
    AssetContext, ByteStream, Cache, CacheError, ConfigError, ConfigLoader, ConfigOptions,
    ContentStream, Environment, File, FileHasher, LoadedConfig,
};
use kiln_cache::MemoryCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Install a fmt subscriber honoring `RUST_LOG`; safe to call from every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One `load` call observed by [`StaticConfigLoader`]
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigCall {
    pub asset_path: PathBuf,
    pub filenames: Vec<String>,
    pub options: ConfigOptions,
}

/// Config loader answering from a `filename -> (path, value)` table
///
/// The first requested filename present in the table wins. Every call is
/// recorded so tests can assert what was searched for.
#[derive(Debug, Default)]
pub struct StaticConfigLoader {
    entries: HashMap<String, (PathBuf, Value)>,
    calls: Mutex<Vec<ConfigCall>>,
}

impl StaticConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(
        mut self,
        filename: impl Into<String>,
        path: impl Into<PathBuf>,
        config: Value,
    ) -> Self {
        self.entries.insert(filename.into(), (path.into(), config));
        self
    }

    pub fn calls(&self) -> Vec<ConfigCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ConfigLoader for StaticConfigLoader {
    async fn load(
        &self,
        asset_path: &Path,
        filenames: &[String],
        options: &ConfigOptions,
    ) -> Result<Option<LoadedConfig>, ConfigError> {
        self.calls.lock().push(ConfigCall {
            asset_path: asset_path.to_path_buf(),
            filenames: filenames.to_vec(),
            options: options.clone(),
        });
        Ok(filenames.iter().find_map(|name| {
            self.entries.get(name).map(|(path, config)| LoadedConfig {
                config: config.clone(),
                files: vec![File::new(path.clone())],
            })
        }))
    }
}

/// File hasher returning a fixed hash and counting calls
#[derive(Debug)]
pub struct FixedFileHasher {
    hash: String,
    calls: AtomicUsize,
}

impl FixedFileHasher {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FileHasher for FixedFileHasher {
    async fn hash_file(&self, _path: &Path) -> io::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hash.clone())
    }
}

/// Cache that drains whatever it is given and then rejects it
#[derive(Debug, Default)]
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn set_stream(&self, _key: &str, mut stream: ByteStream) -> Result<String, CacheError> {
        while stream.next().await.is_some() {}
        Err(CacheError::Backend("cache unavailable".to_string()))
    }

    async fn get_stream(&self, key: &str) -> Result<ByteStream, CacheError> {
        Err(CacheError::NotFound(key.to_string()))
    }
}

/// Stream yielding `data` in `chunk_size` pieces
pub fn chunked_stream(data: &[u8], chunk_size: usize) -> ContentStream {
    ContentStream::from_chunks(data.chunks(chunk_size.max(1)).map(<[u8]>::to_vec).collect())
}

/// Stream that yields `ok` chunks and then fails
pub fn failing_stream(ok: Vec<Vec<u8>>) -> ContentStream {
    let items = ok
        .into_iter()
        .map(Ok)
        .chain(std::iter::once(Err(io::Error::other("source failed"))));
    ContentStream::from_stream(stream::iter(items))
}

/// Deterministic non-repeating payload of `len` bytes
pub fn large_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) % 251) as u8).collect()
}

pub fn sample_env() -> Environment {
    Environment::new()
        .with("context", "browser")
        .with("engines", serde_json::json!({"browsers": ["> 0.25%"]}))
}

/// Shared collaborators of [`test_context_with`]
pub struct TestHarness {
    pub cache: Arc<MemoryCache>,
    pub config_loader: Arc<StaticConfigLoader>,
    pub file_hasher: Arc<FixedFileHasher>,
    pub ctx: Arc<AssetContext>,
}

/// Context over an in-memory cache with the given config loader
pub fn test_context_with(config_loader: StaticConfigLoader) -> TestHarness {
    let cache = Arc::new(MemoryCache::new(1_000));
    let config_loader = Arc::new(config_loader);
    let file_hasher = Arc::new(FixedFileHasher::new("d41d8cd98f00b204e9800998ecf8427e"));
    let ctx = Arc::new(AssetContext::new(
        Arc::clone(&cache) as Arc<dyn Cache>,
        Arc::clone(&config_loader) as Arc<dyn ConfigLoader>,
        Arc::clone(&file_hasher) as Arc<dyn FileHasher>,
    ));
    TestHarness {
        cache,
        config_loader,
        file_hasher,
        ctx,
    }
}

pub fn test_context() -> Arc<AssetContext> {
    test_context_with(StaticConfigLoader::new()).ctx
}
