//! Dependency records
//!
//! A [`Dependency`] is an edge descriptor owned by exactly one asset. It is
//! only ever created through [`Asset::add_dependency`](crate::Asset::add_dependency),
//! which stamps the source path and merges environments.

use crate::env::{Environment, Meta};
use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the dependency is loaded at runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Static import / require
    #[default]
    Sync,
    /// Dynamic import, loaded lazily
    Async,
    /// Referenced by URL (stylesheets, images, workers)
    Url,
}

impl DependencyKind {
    /// Stable label used in id derivation
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
            Self::Url => "url",
        }
    }
}

/// Input for [`Asset::add_dependency`](crate::Asset::add_dependency)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyOptions {
    /// Module specifier as written in the source
    pub specifier: String,
    /// Load kind
    #[serde(default)]
    pub kind: DependencyKind,
    /// Whether resolution failure is tolerated
    #[serde(default)]
    pub is_optional: bool,
    /// Partial environment layered over the asset's environment
    #[serde(default)]
    pub env: Option<Environment>,
    /// Opaque plugin metadata
    #[serde(default)]
    pub meta: Meta,
}

impl DependencyOptions {
    /// Create options for a specifier
    #[inline]
    #[must_use]
    pub fn new(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            ..Self::default()
        }
    }

    /// With load kind
    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark optional
    #[inline]
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    /// With partial environment
    #[inline]
    #[must_use]
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// With a metadata entry
    #[must_use]
    pub fn with_meta(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Dependency edge owned by an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    /// Derived identity
    pub id: String,
    /// Module specifier
    pub specifier: String,
    /// Load kind
    #[serde(default)]
    pub kind: DependencyKind,
    /// Whether resolution failure is tolerated
    #[serde(default)]
    pub is_optional: bool,
    /// Path of the asset that declared this dependency
    pub source_path: PathBuf,
    /// Environment merged from the source asset
    pub env: Environment,
    /// Opaque plugin metadata
    #[serde(default)]
    pub meta: Meta,
}

impl Dependency {
    /// Build a dependency for `source_path` with an already merged environment
    ///
    /// # Errors
    /// Returns error if the environment cannot be serialized
    pub fn new(
        options: DependencyOptions,
        source_path: &Path,
        env: Environment,
    ) -> Result<Self, serde_json::Error> {
        let id = Self::derive_id(source_path, &options.specifier, options.kind, &env)?;
        Ok(Self {
            id,
            specifier: options.specifier,
            kind: options.kind,
            is_optional: options.is_optional,
            source_path: source_path.to_path_buf(),
            env,
            meta: options.meta,
        })
    }

    /// Stable id over (source path, specifier, kind, environment)
    ///
    /// # Errors
    /// Returns error if the environment cannot be serialized
    pub fn derive_id(
        source_path: &Path,
        specifier: &str,
        kind: DependencyKind,
        env: &Environment,
    ) -> Result<String, serde_json::Error> {
        let env_json = env.to_canonical_json()?;
        let source = source_path.to_string_lossy();
        Ok(ContentHash::compute_parts([
            source.as_bytes(),
            specifier.as_bytes(),
            kind.as_str().as_bytes(),
            env_json.as_bytes(),
        ])
        .to_string())
    }
}
