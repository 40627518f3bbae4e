//! Transform plugin output consumed by child-asset derivation

use crate::content::Content;
use crate::dependency::DependencyOptions;
use crate::env::{Environment, Meta};
use crate::file::File;

/// Parsed syntax tree attached to an asset
///
/// Never persisted: it is plugin- and version-specific.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// Parser family, e.g. `"babel"`
    pub kind: String,
    /// Parser version the tree is valid for
    pub version: String,
    pub program: serde_json::Value,
}

impl Ast {
    /// Create AST
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        version: impl Into<String>,
        program: serde_json::Value,
    ) -> Self {
        Self {
            kind: kind.into(),
            version: version.into(),
            program,
        }
    }
}

/// What a transform plugin hands back for the next pipeline stage
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    /// Asset type of the produced content (`"js"`, `"css"`, ...)
    pub asset_type: String,
    pub content: Content,
    pub ast: Option<Ast>,
    /// Falls back to the parent's flag when `None`
    pub is_isolated: Option<bool>,
    /// Partial environment layered over the parent's
    pub env: Option<Environment>,
    pub dependencies: Vec<DependencyOptions>,
    pub connected_files: Vec<File>,
    pub meta: Meta,
}

impl TransformResult {
    /// Create result with type and content
    #[must_use]
    pub fn new(asset_type: impl Into<String>, content: impl Into<Content>) -> Self {
        Self {
            asset_type: asset_type.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// With AST
    #[inline]
    #[must_use]
    pub fn with_ast(mut self, ast: Ast) -> Self {
        self.ast = Some(ast);
        self
    }

    /// With isolation flag
    #[inline]
    #[must_use]
    pub fn isolated(mut self, is_isolated: bool) -> Self {
        self.is_isolated = Some(is_isolated);
        self
    }

    /// With partial environment
    #[inline]
    #[must_use]
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// With an added dependency
    #[inline]
    #[must_use]
    pub fn with_dependency(mut self, dependency: DependencyOptions) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// With an added connected file
    #[inline]
    #[must_use]
    pub fn with_connected_file(mut self, file: File) -> Self {
        self.connected_files.push(file);
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
