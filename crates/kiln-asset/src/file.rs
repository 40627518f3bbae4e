//! Connected-file records

use crate::env::Meta;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file whose mutation invalidates an asset, without being a content
/// dependency of it (resolved config files, manifests)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    pub file_path: PathBuf,
    /// MD5 hex of the file contents; filled in lazily when attached
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl File {
    /// File record without a hash
    #[inline]
    #[must_use]
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            hash: None,
            meta: None,
        }
    }

    /// With a precomputed hash
    #[inline]
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// With metadata
    #[inline]
    #[must_use]
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }
}
