//! In-crate fakes for unit tests

use crate::content::ByteStream;
use crate::context::{
    AssetContext, Cache, ConfigLoader, ConfigOptions, FileHasher, LoadedConfig, MockFileHasher,
};
use crate::error::{CacheError, ConfigError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct MapCache {
    pub(crate) blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub(crate) fail_writes: bool,
}

#[async_trait]
impl Cache for MapCache {
    async fn set_stream(&self, key: &str, stream: ByteStream) -> Result<String, CacheError> {
        let chunks: Vec<Vec<u8>> = stream.try_collect().await.map_err(CacheError::Stream)?;
        if self.fail_writes {
            return Err(CacheError::Backend("write rejected".to_string()));
        }
        self.blobs.lock().insert(key.to_string(), chunks.concat());
        Ok(key.to_string())
    }

    async fn get_stream(&self, key: &str) -> Result<ByteStream, CacheError> {
        let blob = self
            .blobs
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        Ok(stream::iter([Ok(blob)]).boxed())
    }
}

/// Config loader answering from a fixed `filename -> (path, value)` table
#[derive(Debug, Default)]
pub(crate) struct TableConfigLoader {
    pub(crate) table: HashMap<String, (PathBuf, serde_json::Value)>,
}

#[async_trait]
impl ConfigLoader for TableConfigLoader {
    async fn load(
        &self,
        _asset_path: &Path,
        filenames: &[String],
        _options: &ConfigOptions,
    ) -> Result<Option<LoadedConfig>, ConfigError> {
        Ok(filenames.iter().find_map(|name| {
            self.table.get(name).map(|(path, config)| LoadedConfig {
                config: config.clone(),
                files: vec![crate::File::new(path.clone())],
            })
        }))
    }
}

pub(crate) fn hasher_returning(hash: &'static str) -> MockFileHasher {
    let mut hasher = MockFileHasher::new();
    hasher.expect_hash_file().returning(move |_| Ok(hash.to_string()));
    hasher
}

pub(crate) fn context_with(
    cache: Arc<MapCache>,
    loader: TableConfigLoader,
    hasher: impl FileHasher + 'static,
) -> Arc<AssetContext> {
    Arc::new(AssetContext::new(cache, Arc::new(loader), Arc::new(hasher)))
}

pub(crate) fn context() -> Arc<AssetContext> {
    context_with(
        Arc::new(MapCache::default()),
        TableConfigLoader::default(),
        hasher_returning("filehash"),
    )
}
