//! Error types for kiln assets
//!
//! Covers the failure modes of the asset lifecycle:
//! - Commit of a stream that was already read from
//! - Cache reads and writes
//! - Config lookup and connected-file hashing
//! - Record (de)serialization

use std::path::PathBuf;

/// Main asset error type
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// Stream-backed content was partially or fully read before commit
    #[error("content stream for asset {asset_id} was already consumed")]
    AlreadyConsumed { asset_id: String },

    /// Cache collaborator failed while persisting content
    #[error("cache write failed: {0}")]
    CacheWrite(#[source] CacheError),

    /// Cache collaborator failed while fetching content
    #[error("cache read failed: {0}")]
    CacheRead(#[source] CacheError),

    /// Draining a content stream failed
    #[error("content read failed: {0}")]
    ContentRead(#[source] std::io::Error),

    /// Config loader collaborator failed (a missing config is not an error)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Hashing a connected file failed
    #[error("failed to hash connected file {path}: {source}")]
    FileHash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record or environment serialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AssetError {
    /// Create already-consumed error for an asset
    pub fn already_consumed(asset_id: impl Into<String>) -> Self {
        Self::AlreadyConsumed {
            asset_id: asset_id.into(),
        }
    }

    /// Create file hash error for path
    pub fn file_hash(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileHash {
            path: path.into(),
            source,
        }
    }

    /// Whether this error comes from the cache collaborator
    #[inline]
    #[must_use]
    pub fn is_cache_error(&self) -> bool {
        matches!(self, Self::CacheWrite(_) | Self::CacheRead(_))
    }
}

/// Errors raised by cache backends
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No blob stored under key
    #[error("cache key not found: {0}")]
    NotFound(String),

    /// Backend storage I/O failure
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    /// The incoming byte stream failed mid-transfer
    #[error("source stream failed: {0}")]
    Stream(#[source] std::io::Error),

    /// Backend-specific failure
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Errors raised by config loaders
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading a config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file exists but is malformed
    #[error("malformed config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// No parser for the config file's extension
    #[error("unsupported config format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create parse error for path
    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result alias for asset operations
pub type AssetResult<T> = Result<T, AssetError>;
