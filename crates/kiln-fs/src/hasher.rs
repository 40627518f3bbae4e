//! File content hashing

use async_trait::async_trait;
use kiln_asset::{FileHasher, OutputDigest};
use std::path::Path;
use tokio::io::AsyncReadExt;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Hashes files by streaming them from disk through MD5
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileHasher;

impl FsFileHasher {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileHasher for FsFileHasher {
    async fn hash_file(&self, path: &Path) -> std::io::Result<String> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut digest = OutputDigest::new();
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            digest.update(&buf[..n]);
        }
        let (hash, size) = digest.finish();
        tracing::trace!(path = %path.display(), size, "hashed file");
        Ok(hash)
    }
}
