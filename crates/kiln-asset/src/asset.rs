//! The pipeline asset
//!
//! An [`Asset`] is one unit of content moving through the transform pipeline.
//! Its content can be text, bytes, or a single-read stream, and once
//! committed it is backed by the cache through `content_key`. Read accessors
//! normalize between these forms; [`Asset::commit`] streams content into the
//! cache while hashing and counting it in the same pass.

use crate::content::{Content, ContentStream};
use crate::context::{AssetContext, ConfigOptions};
use crate::dependency::{Dependency, DependencyOptions};
use crate::env::{merge_meta, Environment, Meta};
use crate::error::{AssetError, AssetResult};
use crate::file::File;
use crate::hash::{ContentHash, OutputDigest};
use crate::record::{AssetRecord, Stats};
use crate::registry::Registry;
use crate::transform::{Ast, TransformResult};
use futures::stream::{StreamExt, TryStreamExt};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Cache-key label for committed content
const CONTENT_KEY_LABEL: &str = "content";

/// Construction options for [`Asset::new`]
#[derive(Debug, Clone)]
pub struct AssetOptions {
    /// Explicit id; derived from `(file_path, asset_type, env)` when `None`
    pub id: Option<String>,
    pub hash: Option<String>,
    pub file_path: PathBuf,
    pub asset_type: String,
    pub content: Content,
    pub content_key: Option<String>,
    pub ast: Option<Ast>,
    pub dependencies: Vec<(String, Dependency)>,
    pub connected_files: Vec<(PathBuf, File)>,
    pub is_isolated: bool,
    pub output_hash: Option<String>,
    pub env: Environment,
    pub meta: Meta,
    pub stats: Stats,
}

impl AssetOptions {
    /// Options for a source file; `stats` are orchestrator-owned and required
    #[must_use]
    pub fn new(
        file_path: impl Into<PathBuf>,
        asset_type: impl Into<String>,
        env: Environment,
        stats: Stats,
    ) -> Self {
        Self {
            id: None,
            hash: None,
            file_path: file_path.into(),
            asset_type: asset_type.into(),
            content: Content::default(),
            content_key: None,
            ast: None,
            dependencies: Vec::new(),
            connected_files: Vec::new(),
            is_isolated: false,
            output_hash: None,
            env,
            meta: Meta::new(),
            stats,
        }
    }

    /// With explicit id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// With known content hash
    #[inline]
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    /// With initial content
    #[inline]
    #[must_use]
    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        self.content = content.into();
        self
    }

    /// With committed content key
    #[inline]
    #[must_use]
    pub fn with_content_key(mut self, key: impl Into<String>) -> Self {
        self.content_key = Some(key.into());
        self
    }

    /// With AST
    #[inline]
    #[must_use]
    pub fn with_ast(mut self, ast: Ast) -> Self {
        self.ast = Some(ast);
        self
    }

    /// With dependencies (copied into the asset's own registry)
    #[must_use]
    pub fn with_dependencies(
        mut self,
        dependencies: impl IntoIterator<Item = (String, Dependency)>,
    ) -> Self {
        self.dependencies = dependencies.into_iter().collect();
        self
    }

    /// With connected files (copied into the asset's own registry)
    #[must_use]
    pub fn with_connected_files(
        mut self,
        files: impl IntoIterator<Item = (PathBuf, File)>,
    ) -> Self {
        self.connected_files = files.into_iter().collect();
        self
    }

    /// With isolation flag
    #[inline]
    #[must_use]
    pub fn isolated(mut self, is_isolated: bool) -> Self {
        self.is_isolated = is_isolated;
        self
    }

    /// With metadata
    #[inline]
    #[must_use]
    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }
}

/// A build-pipeline asset
///
/// # Invariants
/// - Exactly one content representation is active at a time
/// - When `content_key` is set, the cache is authoritative for content
/// - Dependency ids are unique keys of `dependencies`
/// - `env` is never mutated in place
///
/// Not synchronized: one transform stage at a time may read or mutate an asset.
#[derive(Debug)]
pub struct Asset {
    id: String,
    hash: Option<String>,
    file_path: PathBuf,
    asset_type: String,
    content: Content,
    content_key: Option<String>,
    ast: Option<Ast>,
    dependencies: Registry<String, Dependency>,
    connected_files: Registry<PathBuf, File>,
    is_isolated: bool,
    output_hash: Option<String>,
    env: Environment,
    meta: Meta,
    stats: Stats,
    ctx: Arc<AssetContext>,
}

impl Asset {
    /// Build an asset from options
    ///
    /// # Errors
    /// Returns error if the id has to be derived and the environment cannot
    /// be serialized
    pub fn new(options: AssetOptions, ctx: Arc<AssetContext>) -> AssetResult<Self> {
        let id = match options.id {
            Some(id) => id,
            None => Self::derive_id(&options.file_path, &options.asset_type, &options.env)?,
        };
        Ok(Self {
            id,
            hash: options.hash,
            file_path: options.file_path,
            asset_type: options.asset_type,
            content: options.content,
            content_key: options.content_key,
            ast: options.ast,
            dependencies: options.dependencies.into_iter().collect(),
            connected_files: options.connected_files.into_iter().collect(),
            is_isolated: options.is_isolated,
            output_hash: options.output_hash,
            env: options.env,
            meta: options.meta,
            stats: options.stats,
            ctx,
        })
    }

    /// Rebuild an asset from a persisted record
    ///
    /// Content starts empty; the record's `content_key` makes the cache the
    /// source of content for every accessor.
    #[must_use]
    pub fn from_record(record: AssetRecord, ctx: Arc<AssetContext>) -> Self {
        Self {
            id: record.id,
            hash: record.hash,
            file_path: record.file_path,
            asset_type: record.asset_type,
            content: Content::default(),
            content_key: record.content_key,
            ast: None,
            dependencies: record.dependencies.into_iter().collect(),
            connected_files: record.connected_files.into_iter().collect(),
            is_isolated: record.is_isolated,
            output_hash: record.output_hash,
            env: record.env,
            meta: record.meta,
            stats: record.stats,
            ctx,
        }
    }

    /// Stable identity over `(file_path, asset_type, env)`
    ///
    /// # Errors
    /// Returns error if the environment cannot be serialized
    pub fn derive_id(
        file_path: &Path,
        asset_type: &str,
        env: &Environment,
    ) -> Result<String, serde_json::Error> {
        let env_json = env.to_canonical_json()?;
        let path = file_path.to_string_lossy();
        Ok(ContentHash::compute_parts([
            path.as_bytes(),
            asset_type.as_bytes(),
            env_json.as_bytes(),
        ])
        .to_string())
    }

    /// Cache key for `label`, derived from `(label, id, env)`
    ///
    /// # Errors
    /// Returns error if the environment cannot be serialized
    pub fn generate_cache_key(&self, label: &str) -> AssetResult<String> {
        let env_json = self.env.to_canonical_json()?;
        Ok(ContentHash::compute_parts([
            label.as_bytes(),
            self.id.as_bytes(),
            env_json.as_bytes(),
        ])
        .to_string())
    }

    /// Persisted record (content and AST excluded)
    #[must_use]
    pub fn serialize(&self) -> AssetRecord {
        AssetRecord {
            id: self.id.clone(),
            hash: self.hash.clone(),
            file_path: self.file_path.clone(),
            asset_type: self.asset_type.clone(),
            content_key: self.content_key.clone(),
            dependencies: self.dependencies.to_pairs(),
            connected_files: self.connected_files.to_pairs(),
            is_isolated: self.is_isolated,
            output_hash: self.output_hash.clone(),
            env: self.env.clone(),
            meta: self.meta.clone(),
            stats: self.stats,
        }
    }

    // ------------------------------------------------------------------
    // Commit
    // ------------------------------------------------------------------

    /// Persist content to the cache, recording key, size and output hash
    ///
    /// Content is streamed once: every chunk goes to the cache unmodified
    /// while an MD5 digest and a byte count are accumulated from it.
    ///
    /// # Errors
    /// - [`AssetError::AlreadyConsumed`] if the content stream was read from
    /// - [`AssetError::CacheRead`] if cache-backed content cannot be opened
    /// - [`AssetError::CacheWrite`] if the cache rejects the write; the
    ///   content key is left as it was
    pub async fn commit(&mut self) -> AssetResult<()> {
        self.ast = None;

        let stream = self.get_stream().await?;
        if !stream.is_unread() {
            tracing::warn!(
                asset_id = %self.id,
                state = ?stream.state(),
                "refusing to commit a consumed content stream"
            );
            return Err(AssetError::already_consumed(&self.id));
        }

        let key = self.generate_cache_key(CONTENT_KEY_LABEL)?;
        tracing::debug!(asset_id = %self.id, key = %key, "committing content");

        let digest = Arc::new(Mutex::new(OutputDigest::new()));
        let tap = Arc::clone(&digest);
        let tee = stream
            .inspect_ok(move |chunk| tap.lock().update(chunk))
            .boxed();

        let content_key = self
            .ctx
            .cache()
            .set_stream(&key, tee)
            .await
            .map_err(AssetError::CacheWrite)?;

        let (output_hash, size) = std::mem::take(&mut *digest.lock()).finish();
        tracing::debug!(
            asset_id = %self.id,
            key = %content_key,
            size,
            output_hash = %output_hash,
            "committed content"
        );

        self.content_key = Some(content_key);
        self.stats.size = Some(size);
        self.output_hash = Some(output_hash);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Content accessors
    // ------------------------------------------------------------------

    /// Content as text
    ///
    /// Bytes are decoded as UTF-8, replacing invalid sequences. A stream is
    /// drained once and kept in memory for later calls.
    ///
    /// # Errors
    /// Returns error if cache-backed content cannot be fetched or the stream
    /// fails while draining
    pub async fn get_code(&mut self) -> AssetResult<Arc<str>> {
        self.reload_from_cache().await?;
        let stream = match &self.content {
            Content::Text(text) => return Ok(Arc::clone(text)),
            Content::Bytes(bytes) => {
                return Ok(Arc::from(String::from_utf8_lossy(bytes).as_ref()));
            }
            Content::Stream(stream) => stream.clone(),
        };
        let bytes = self.materialize(stream).await?;
        Ok(Arc::from(String::from_utf8_lossy(&bytes).as_ref()))
    }

    /// Content as bytes
    ///
    /// # Errors
    /// Returns error if cache-backed content cannot be fetched or the stream
    /// fails while draining
    pub async fn get_buffer(&mut self) -> AssetResult<Arc<[u8]>> {
        self.reload_from_cache().await?;
        let stream = match &self.content {
            Content::Text(text) => return Ok(Arc::from(text.as_bytes())),
            Content::Bytes(bytes) => return Ok(Arc::clone(bytes)),
            Content::Stream(stream) => stream.clone(),
        };
        self.materialize(stream).await
    }

    /// Content as a single-read stream
    ///
    /// An existing stream is handed out as-is; the caller is then responsible
    /// for reading it only once.
    ///
    /// # Errors
    /// Returns error if cache-backed content cannot be fetched
    pub async fn get_stream(&mut self) -> AssetResult<ContentStream> {
        self.reload_from_cache().await?;
        Ok(self.content.to_stream(self.ctx.config().stream_chunk_size))
    }

    /// Replace content with text (does not clear `content_key`)
    pub fn set_code(&mut self, code: impl Into<Arc<str>>) {
        self.content = Content::Text(code.into());
    }

    /// Replace content with bytes (does not clear `content_key`)
    pub fn set_buffer(&mut self, buffer: impl Into<Arc<[u8]>>) {
        self.content = Content::Bytes(buffer.into());
    }

    /// Replace content with a stream (does not clear `content_key`)
    pub fn set_stream(&mut self, stream: ContentStream) {
        self.content = Content::Stream(stream);
    }

    /// Replace content with any representation (does not clear `content_key`)
    pub fn set_content(&mut self, content: Content) {
        self.content = content;
    }

    async fn reload_from_cache(&mut self) -> AssetResult<()> {
        if let Some(key) = &self.content_key {
            let source = self
                .ctx
                .cache()
                .get_stream(key)
                .await
                .map_err(AssetError::CacheRead)?;
            tracing::trace!(asset_id = %self.id, key = %key, "reloaded content from cache");
            self.content = Content::Stream(ContentStream::new(source));
        }
        Ok(())
    }

    async fn materialize(&mut self, stream: ContentStream) -> AssetResult<Arc<[u8]>> {
        let bytes: Arc<[u8]> = stream
            .read_to_end()
            .await
            .map_err(AssetError::ContentRead)?
            .into();
        self.content = Content::Bytes(Arc::clone(&bytes));
        Ok(bytes)
    }

    // ------------------------------------------------------------------
    // Dependencies and connected files
    // ------------------------------------------------------------------

    /// Register a dependency, returning its derived id
    ///
    /// The dependency's environment is this asset's environment merged with
    /// the options' partial environment. Re-adding an equal dependency
    /// replaces the existing entry.
    ///
    /// # Errors
    /// Returns error if the merged environment cannot be serialized
    pub fn add_dependency(&mut self, options: DependencyOptions) -> AssetResult<String> {
        let env = self.env.merge(options.env.as_ref());
        let dependency = Dependency::new(options, &self.file_path, env)?;
        let id = dependency.id.clone();
        self.dependencies.insert(id.clone(), dependency);
        Ok(id)
    }

    /// Register a connected file, hashing it first if it has no hash
    ///
    /// # Errors
    /// Returns error if the file hasher fails
    pub async fn add_connected_file(&mut self, mut file: File) -> AssetResult<()> {
        if file.hash.is_none() {
            let hash = self
                .ctx
                .file_hasher()
                .hash_file(&file.file_path)
                .await
                .map_err(|e| AssetError::file_hash(&file.file_path, e))?;
            file.hash = Some(hash);
        }
        self.connected_files.insert(file.file_path.clone(), file);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Child derivation
    // ------------------------------------------------------------------

    /// Derive the next pipeline stage from a transform result
    ///
    /// The child starts with shared handles onto this asset's dependency and
    /// connected-file registries; whatever the result adds detaches the
    /// child's copy and never shows up on this asset.
    ///
    /// # Errors
    /// Returns error if a new connected file cannot be hashed or an
    /// environment cannot be serialized
    pub async fn create_child_asset(&self, result: TransformResult) -> AssetResult<Asset> {
        let TransformResult {
            asset_type,
            content,
            ast,
            is_isolated,
            env,
            dependencies,
            connected_files,
            meta,
        } = result;

        let (hash, size) = if content.same_source(&self.content) {
            (self.hash.clone(), self.stats.size)
        } else {
            match content.digest() {
                Some((hash, size)) => (Some(hash), Some(size)),
                None => (None, None),
            }
        };

        let env = self.env.merge(env.as_ref());
        let id = Self::derive_id(&self.file_path, &asset_type, &env)?;

        let mut child = Asset {
            id,
            hash,
            file_path: self.file_path.clone(),
            asset_type,
            content,
            content_key: None,
            ast,
            dependencies: self.dependencies.share(),
            connected_files: self.connected_files.share(),
            is_isolated: is_isolated.unwrap_or(self.is_isolated),
            output_hash: None,
            env,
            meta: merge_meta(&self.meta, &meta),
            stats: Stats::new(0, size),
            ctx: Arc::clone(&self.ctx),
        };

        for dependency in dependencies {
            child.add_dependency(dependency)?;
        }
        for file in connected_files {
            child.add_connected_file(file).await?;
        }

        tracing::debug!(
            parent = %self.id,
            child = %child.id,
            asset_type = %child.asset_type,
            "derived child asset"
        );
        Ok(child)
    }

    // ------------------------------------------------------------------
    // Config lookup
    // ------------------------------------------------------------------

    /// Look up config for this asset
    ///
    /// With a `package_key`, the package manifest is checked first. Every
    /// file the loader consulted becomes a connected file. `Ok(None)` means
    /// no config exists anywhere in the search path.
    ///
    /// # Errors
    /// Returns error if a config file is malformed or a consulted file
    /// cannot be hashed
    pub async fn get_config(
        &mut self,
        filenames: &[String],
        options: &ConfigOptions,
    ) -> AssetResult<Option<serde_json::Value>> {
        if let Some(package_key) = &options.package_key {
            if let Some(package) = self.get_package().await? {
                if let Some(value) = package.get(package_key).filter(|v| !v.is_null()) {
                    return Ok(Some(value.clone()));
                }
            }
        }
        self.load_config(filenames, options).await
    }

    /// Nearest package manifest for this asset, parsed
    ///
    /// # Errors
    /// Returns error if the manifest is malformed or cannot be hashed
    pub async fn get_package(&mut self) -> AssetResult<Option<serde_json::Value>> {
        let manifest = [self.ctx.config().manifest_filename.clone()];
        self.load_config(&manifest, &ConfigOptions::default()).await
    }

    async fn load_config(
        &mut self,
        filenames: &[String],
        options: &ConfigOptions,
    ) -> AssetResult<Option<serde_json::Value>> {
        let loaded = self
            .ctx
            .config_loader()
            .load(&self.file_path, filenames, options)
            .await?;
        let Some(loaded) = loaded else {
            return Ok(None);
        };
        for file in loaded.files {
            self.add_connected_file(file).await?;
        }
        Ok(Some(loaded.config))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Known content hash of this instance, if any
    #[inline]
    #[must_use]
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    #[inline]
    #[must_use]
    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    /// Active in-memory representation (may be stale while `content_key` is set)
    #[inline]
    #[must_use]
    pub fn content(&self) -> &Content {
        &self.content
    }

    #[inline]
    #[must_use]
    pub fn content_key(&self) -> Option<&str> {
        self.content_key.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn ast(&self) -> Option<&Ast> {
        self.ast.as_ref()
    }

    pub fn set_ast(&mut self, ast: Ast) {
        self.ast = Some(ast);
    }

    pub fn clear_ast(&mut self) {
        self.ast = None;
    }

    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &Registry<String, Dependency> {
        &self.dependencies
    }

    #[inline]
    #[must_use]
    pub fn connected_files(&self) -> &Registry<PathBuf, File> {
        &self.connected_files
    }

    #[inline]
    #[must_use]
    pub fn is_isolated(&self) -> bool {
        self.is_isolated
    }

    pub fn set_isolated(&mut self, is_isolated: bool) {
        self.is_isolated = is_isolated;
    }

    /// MD5 hex of the committed bytes
    #[inline]
    #[must_use]
    pub fn output_hash(&self) -> Option<&str> {
        self.output_hash.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn env(&self) -> &Environment {
        &self.env
    }

    #[inline]
    #[must_use]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Set a metadata entry
    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.meta.insert(key.into(), value.into());
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Record transform time (orchestrator-owned)
    pub fn set_time(&mut self, time_ms: u64) {
        self.stats.time = time_ms;
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Arc<AssetContext> {
        &self.ctx
    }
}
