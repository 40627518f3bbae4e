//! Collaborators injected into assets
//!
//! The cache, the config loader and the file hasher are external to the
//! asset. They are bundled into an [`AssetContext`] that every asset holds by
//! `Arc`, so tests can swap any of them without a real backend.

use crate::config::AssetConfig;
use crate::content::ByteStream;
use crate::error::{CacheError, ConfigError};
use crate::file::File;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Key -> blob storage for committed content
///
/// Keys are opaque. Writing the same key twice is expected to store the same
/// bytes, so backends need no locking around a key.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Persist a stream under `key`, returning the key it is addressable by
    async fn set_stream(&self, key: &str, stream: ByteStream) -> Result<String, CacheError>;

    /// Open a fresh single-read stream over the blob stored at `key`
    async fn get_stream(&self, key: &str) -> Result<ByteStream, CacheError>;
}

/// Options for config lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOptions {
    /// Key inside the package manifest checked before any config file
    #[serde(default)]
    pub package_key: Option<String>,
    /// Parse the file contents (otherwise the raw text is returned)
    #[serde(default = "default_parse")]
    pub parse: bool,
}

fn default_parse() -> bool {
    true
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            package_key: None,
            parse: true,
        }
    }
}

impl ConfigOptions {
    /// Create default options
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With package manifest key
    #[inline]
    #[must_use]
    pub fn with_package_key(mut self, key: impl Into<String>) -> Self {
        self.package_key = Some(key.into());
        self
    }

    /// Return raw file text instead of parsed values
    #[inline]
    #[must_use]
    pub fn raw(mut self) -> Self {
        self.parse = false;
        self
    }
}

/// Result of a successful config lookup
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    /// Resolved config value
    pub config: serde_json::Value,
    /// Every file consulted to produce it
    pub files: Vec<File>,
}

/// Locates and parses config files for an asset
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// Search upwards from `asset_path` for any of `filenames`
    ///
    /// Returns `Ok(None)` when nothing matches; malformed files are errors.
    async fn load(
        &self,
        asset_path: &Path,
        filenames: &[String],
        options: &ConfigOptions,
    ) -> Result<Option<LoadedConfig>, ConfigError>;
}

/// Computes content hashes of files on disk
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileHasher: Send + Sync {
    /// MD5 hex of the file contents
    async fn hash_file(&self, path: &Path) -> std::io::Result<String>;
}

/// Collaborators and configuration shared by assets
#[derive(Clone)]
pub struct AssetContext {
    cache: Arc<dyn Cache>,
    config_loader: Arc<dyn ConfigLoader>,
    file_hasher: Arc<dyn FileHasher>,
    config: AssetConfig,
}

impl AssetContext {
    /// Create context with default configuration
    #[must_use]
    pub fn new(
        cache: Arc<dyn Cache>,
        config_loader: Arc<dyn ConfigLoader>,
        file_hasher: Arc<dyn FileHasher>,
    ) -> Self {
        Self {
            cache,
            config_loader,
            file_hasher,
            config: AssetConfig::default(),
        }
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: AssetConfig) -> Self {
        self.config = config;
        self
    }

    /// Cache collaborator
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    /// Config loader collaborator
    #[inline]
    #[must_use]
    pub fn config_loader(&self) -> &dyn ConfigLoader {
        self.config_loader.as_ref()
    }

    /// File hasher collaborator
    #[inline]
    #[must_use]
    pub fn file_hasher(&self) -> &dyn FileHasher {
        self.file_hasher.as_ref()
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }
}

impl fmt::Debug for AssetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_options_defaults_to_parse() {
        let opts = ConfigOptions::new();
        assert!(opts.parse);
        assert!(opts.package_key.is_none());

        let opts: ConfigOptions = serde_json::from_str(r#"{"packageKey":"babel"}"#).unwrap();
        assert!(opts.parse);
        assert_eq!(opts.package_key.as_deref(), Some("babel"));
        assert!(!ConfigOptions::new().raw().parse);
    }
}
