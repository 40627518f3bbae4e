//! Kiln Asset
//!
//! The unit of content flowing through a multi-stage build pipeline.
//!
//! # Core Concepts
//!
//! - [`Asset`]: identity, content, dependencies and connected files of one
//!   pipeline stage
//! - [`Content`]: text, bytes, or a single-read [`ContentStream`]
//! - [`Registry`]: copy-on-write map shared between parent and child assets
//! - [`AssetContext`]: injected cache, config loader and file hasher
//! - [`AssetRecord`]: the cache-stable serialized form
//!
//! # Example
//!
//! ```rust,ignore
//! use kiln_asset::{Asset, AssetOptions, Environment, Stats, TransformResult};
//!
//! let mut asset = Asset::new(
//!     AssetOptions::new("src/index.js", "js", Environment::new(), Stats::default())
//!         .with_content("import './app';"),
//!     ctx,
//! )?;
//!
//! let code = asset.get_code().await?;
//! let mut child = asset
//!     .create_child_asset(TransformResult::new("js", transpile(&code)))
//!     .await?;
//! child.commit().await?;
//! println!("{:?}", child.output_hash());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod asset;
mod config;
mod content;
mod context;
mod dependency;
mod env;
mod error;
mod file;
pub mod hash;
mod record;
mod registry;
mod transform;

#[cfg(test)]
mod testing;

// Re-exports
pub use asset::{Asset, AssetOptions};
pub use config::{AssetConfig, DEFAULT_MANIFEST_FILENAME, DEFAULT_STREAM_CHUNK_SIZE};
pub use content::{ByteStream, Content, ContentStream, StreamState};
pub use context::{AssetContext, Cache, ConfigLoader, ConfigOptions, FileHasher, LoadedConfig};
pub use dependency::{Dependency, DependencyKind, DependencyOptions};
pub use env::{merge_meta, Environment, Meta};
pub use error::{AssetError, AssetResult, CacheError, ConfigError};
pub use file::File;
pub use hash::{md5_hex, ContentHash, OutputDigest};
pub use record::{AssetRecord, Stats};
pub use registry::{Ownership, Registry};
pub use transform::{Ast, TransformResult};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with assets
    pub use crate::{
        Asset, AssetContext, AssetError, AssetOptions, Cache, Content, ContentStream,
        DependencyOptions, Environment, File, Stats, TransformResult,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
