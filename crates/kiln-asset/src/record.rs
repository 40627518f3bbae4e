//! Persisted asset record
//!
//! The cache-stable shape of an asset. Content and AST are never part of it:
//! content is reachable through `content_key`, the AST is regenerated.

use crate::dependency::Dependency;
use crate::env::{Environment, Meta};
use crate::file::File;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Build statistics of an asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Transform time in milliseconds, owned by the orchestrator
    #[serde(default)]
    pub time: u64,
    /// Content size in bytes; `None` while unknown (stream not yet committed)
    #[serde(default)]
    pub size: Option<u64>,
}

impl Stats {
    /// Create stats
    #[inline]
    #[must_use]
    pub const fn new(time: u64, size: Option<u64>) -> Self {
        Self { time, size }
    }
}

/// Serialized form of an [`Asset`](crate::Asset)
///
/// Registries are stored as ordered `(key, value)` pairs. Every field beyond
/// the identity core defaults on read, so records written by older builds
/// stay loadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: String,
    #[serde(default)]
    pub hash: Option<String>,
    pub file_path: PathBuf,
    #[serde(rename = "type")]
    pub asset_type: String,
    #[serde(default)]
    pub content_key: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<(String, Dependency)>,
    #[serde(default)]
    pub connected_files: Vec<(PathBuf, File)>,
    #[serde(default)]
    pub is_isolated: bool,
    #[serde(default)]
    pub output_hash: Option<String>,
    pub env: Environment,
    #[serde(default)]
    pub meta: Meta,
    pub stats: Stats,
}

impl AssetRecord {
    /// Encode as JSON
    ///
    /// # Errors
    /// Returns error if a metadata value cannot be serialized
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from JSON
    ///
    /// # Errors
    /// Returns error if the input is not a valid record
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
