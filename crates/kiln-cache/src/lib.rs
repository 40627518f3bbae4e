//! Kiln Cache
//!
//! Backends for the [`kiln_asset::Cache`] collaborator:
//!
//! - [`MemoryCache`]: bounded in-process cache (moka)
//! - [`FsCache`]: one file per key on disk, atomic writes
//!
//! Both return the key they were given from `set_stream` and hand out a fresh
//! single-read stream on every `get_stream`.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod fs;
mod memory;

pub use fs::FsCache;
pub use memory::{CacheStats, MemoryCache};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
