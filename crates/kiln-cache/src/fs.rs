//! Filesystem content cache
//!
//! One file per key under a root directory. Writes stream chunk by chunk into
//! a uniquely named temporary file that is persisted into place only once the
//! source stream completes. A failed write never leaves a readable partial
//! blob, and the temporary file is removed on every error path.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kiln_asset::{ByteStream, Cache, CacheError, ContentHash};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Blob cache rooted at a directory
#[derive(Debug)]
pub struct FsCache {
    root: PathBuf,
}

impl FsCache {
    /// Create cache rooted at `root`, creating the directory if needed
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a key is stored in
    ///
    /// Keys are opaque, so they are hashed into a filesystem-safe name.
    #[must_use]
    pub fn blob_path(&self, key: &str) -> PathBuf {
        let name = ContentHash::compute(key.as_bytes()).to_string();
        self.root.join(&name[..2]).join(&name[2..])
    }

    async fn write_blob(&self, path: &Path, mut stream: ByteStream) -> Result<u64, CacheError> {
        let dir = path.parent().unwrap_or(&self.root).to_path_buf();
        fs::create_dir_all(&dir).await?;

        let tmp = blocking(move || NamedTempFile::new_in(dir)).await?;
        let (std_file, tmp_path) = tmp.into_parts();
        let mut file = fs::File::from_std(std_file);

        // `tmp_path` deletes the temporary file when dropped on any early return
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(CacheError::Stream)?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        persist(tmp_path, path.to_path_buf()).await?;
        Ok(written)
    }
}

async fn blocking<T, F>(f: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(io::Error::other)?
}

async fn persist(tmp_path: TempPath, path: PathBuf) -> io::Result<()> {
    blocking(move || tmp_path.persist(path).map_err(|e| e.error)).await
}

#[async_trait]
impl Cache for FsCache {
    async fn set_stream(&self, key: &str, stream: ByteStream) -> Result<String, CacheError> {
        let path = self.blob_path(key);
        let written = self.write_blob(&path, stream).await?;
        tracing::trace!(key, path = %path.display(), bytes = written, "fs cache write");
        Ok(key.to_string())
    }

    async fn get_stream(&self, key: &str) -> Result<ByteStream, CacheError> {
        let path = self.blob_path(key);
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound(key.to_string()))
            }
            Err(e) => return Err(CacheError::Io(e)),
        };

        let chunks = stream::try_unfold(file, |mut file| async move {
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            buf.truncate(n);
            Ok::<_, io::Error>(Some((buf, file)))
        });
        Ok(chunks.boxed())
    }
}
