//! Kiln Fs
//!
//! Filesystem-backed collaborators for assets:
//!
//! - [`FsFileHasher`]: MD5 of a file's bytes, streamed from disk
//! - [`FsConfigLoader`]: nearest-first config discovery (JSON, YAML, TOML)

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config_loader;
mod hasher;

pub use config_loader::{ConfigFormat, FsConfigLoader};
pub use hasher::FsFileHasher;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
