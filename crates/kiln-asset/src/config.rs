//! Asset configuration

use serde::{Deserialize, Serialize};

/// Default chunk size when in-memory content is turned into a stream
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Default package manifest filename
pub const DEFAULT_MANIFEST_FILENAME: &str = "package.json";

/// Tunables shared by every asset built from one [`AssetContext`](crate::AssetContext)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AssetConfig {
    /// Chunk size used when text or bytes are streamed to the cache
    pub stream_chunk_size: usize,
    /// Manifest consulted by `package_key` config lookups
    pub manifest_filename: String,
}

impl AssetConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With stream chunk size
    #[inline]
    #[must_use]
    pub fn with_stream_chunk_size(mut self, size: usize) -> Self {
        self.stream_chunk_size = size.max(1);
        self
    }

    /// With manifest filename
    #[inline]
    #[must_use]
    pub fn with_manifest_filename(mut self, filename: impl Into<String>) -> Self {
        self.manifest_filename = filename.into();
        self
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            stream_chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
            manifest_filename: DEFAULT_MANIFEST_FILENAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AssetConfig::new();
        assert_eq!(config.stream_chunk_size, 65_536);
        assert_eq!(config.manifest_filename, "package.json");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AssetConfig = serde_json::from_str(r#"{"stream_chunk_size": 16}"#).unwrap();
        assert_eq!(config.stream_chunk_size, 16);
        assert_eq!(config.manifest_filename, "package.json");
    }

    #[test]
    fn chunk_size_never_zero() {
        assert_eq!(AssetConfig::new().with_stream_chunk_size(0).stream_chunk_size, 1);
    }
}
