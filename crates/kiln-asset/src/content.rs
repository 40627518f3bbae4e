//! Asset content representations
//!
//! Content lives in exactly one of three forms: text, a byte buffer, or a
//! single-read byte stream. Streams carry an explicit [`StreamState`] so a
//! consumed stream can be detected before it is committed.

use crate::hash::md5_hex;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Boxed byte stream exchanged with cache backends
pub type ByteStream = BoxStream<'static, io::Result<Vec<u8>>>;

/// Read progress of a [`ContentStream`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    /// No bytes have been handed out yet
    Unread,
    /// At least one chunk has been handed out
    Reading,
    /// End-of-stream was reached after bytes were handed out
    ///
    /// A stream that ends without yielding any bytes stays [`Unread`](Self::Unread).
    Exhausted,
}

struct StreamInner {
    source: ByteStream,
    state: StreamState,
    ended: bool,
}

/// Shared in-memory buffer a stream is sliced from
enum SharedBuf {
    Text(Arc<str>),
    Bytes(Arc<[u8]>),
}

impl SharedBuf {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }
}

/// Single-read byte stream with shared read-progress
///
/// Cloning yields another handle onto the *same* stream: bytes read through
/// one handle are gone for every other handle, and all handles observe the
/// same [`StreamState`].
#[derive(Clone)]
pub struct ContentStream {
    inner: Arc<Mutex<StreamInner>>,
}

impl ContentStream {
    /// Wrap a boxed byte stream
    #[must_use]
    pub fn new(source: ByteStream) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StreamInner {
                source,
                state: StreamState::Unread,
                ended: false,
            })),
        }
    }

    /// Wrap any `Send` byte stream
    #[must_use]
    pub fn from_stream<S>(source: S) -> Self
    where
        S: Stream<Item = io::Result<Vec<u8>>> + Send + 'static,
    {
        Self::new(source.boxed())
    }

    /// Stream that yields the given chunks in order
    #[must_use]
    pub fn from_chunks(chunks: Vec<Vec<u8>>) -> Self {
        Self::from_stream(stream::iter(chunks.into_iter().map(Ok)))
    }

    /// Stream over a shared buffer, sliced lazily into `chunk_size` pieces
    #[must_use]
    pub fn from_shared(data: Arc<[u8]>, chunk_size: usize) -> Self {
        Self::sliced(SharedBuf::Bytes(data), chunk_size)
    }

    /// Stream over shared text, sliced lazily into `chunk_size` byte pieces
    ///
    /// Chunks are cut from the text's own allocation; chunk boundaries may
    /// split a multi-byte character.
    #[must_use]
    pub fn from_shared_text(text: Arc<str>, chunk_size: usize) -> Self {
        Self::sliced(SharedBuf::Text(text), chunk_size)
    }

    fn sliced(data: SharedBuf, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self::from_stream(stream::unfold((data, 0usize), move |(data, offset)| async move {
            let bytes = data.as_bytes();
            if offset >= bytes.len() {
                return None;
            }
            let end = (offset + chunk_size).min(bytes.len());
            let chunk = bytes[offset..end].to_vec();
            Some((Ok(chunk), (data, end)))
        }))
    }

    /// Current read progress
    #[inline]
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.inner.lock().state
    }

    /// Whether no bytes have been read yet
    #[inline]
    #[must_use]
    pub fn is_unread(&self) -> bool {
        self.state() == StreamState::Unread
    }

    /// Whether both handles refer to the same underlying stream
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Drain the remaining bytes into memory
    ///
    /// # Errors
    /// Returns the first error yielded by the underlying stream
    pub async fn read_to_end(&self) -> io::Result<Vec<u8>> {
        let mut handle = self.clone();
        let mut buf = Vec::new();
        while let Some(chunk) = handle.next().await {
            buf.extend_from_slice(&chunk?);
        }
        tracing::trace!(bytes = buf.len(), "drained content stream");
        Ok(buf)
    }
}

impl Stream for ContentStream {
    type Item = io::Result<Vec<u8>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut inner = self.inner.lock();
        if inner.ended {
            return Poll::Ready(None);
        }
        match inner.source.as_mut().poll_next(cx) {
            Poll::Ready(Some(item)) => {
                if item.as_ref().map_or(true, |chunk| !chunk.is_empty()) {
                    inner.state = StreamState::Reading;
                }
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                inner.ended = true;
                if inner.state == StreamState::Reading {
                    inner.state = StreamState::Exhausted;
                }
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Active content representation of an asset
#[derive(Debug, Clone)]
pub enum Content {
    /// UTF-8 text
    Text(Arc<str>),
    /// Raw bytes
    Bytes(Arc<[u8]>),
    /// Live single-read stream
    Stream(ContentStream),
}

impl Content {
    /// Text content
    #[inline]
    #[must_use]
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        Self::Text(text.into())
    }

    /// Byte content
    #[inline]
    #[must_use]
    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Whether this is a live stream
    #[inline]
    #[must_use]
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Reference identity: both values point at the same allocation or stream
    #[must_use]
    pub fn same_source(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Arc::ptr_eq(a, b),
            (Self::Bytes(a), Self::Bytes(b)) => Arc::ptr_eq(a, b),
            (Self::Stream(a), Self::Stream(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// MD5 hex and byte length of in-memory content; `None` for streams
    #[must_use]
    pub fn digest(&self) -> Option<(String, u64)> {
        let bytes: &[u8] = match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
            Self::Stream(_) => return None,
        };
        Some((md5_hex(bytes), bytes.len() as u64))
    }

    /// A single-read stream over this content
    ///
    /// Existing streams are returned as another handle onto the same stream.
    #[must_use]
    pub fn to_stream(&self, chunk_size: usize) -> ContentStream {
        match self {
            Self::Text(text) => ContentStream::from_shared_text(Arc::clone(text), chunk_size),
            Self::Bytes(bytes) => ContentStream::from_shared(Arc::clone(bytes), chunk_size),
            Self::Stream(stream) => stream.clone(),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(Arc::from(""))
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text.into())
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.into())
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes.into())
    }
}

impl From<ContentStream> for Content {
    fn from(stream: ContentStream) -> Self {
        Self::Stream(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_state_transitions() {
        let stream = ContentStream::from_chunks(vec![b"ab".to_vec(), b"cd".to_vec()]);
        assert_eq!(stream.state(), StreamState::Unread);

        let mut handle = stream.clone();
        let first = handle.next().await.unwrap().unwrap();
        assert_eq!(first, b"ab");
        assert_eq!(stream.state(), StreamState::Reading);

        let rest = stream.read_to_end().await.unwrap();
        assert_eq!(rest, b"cd");
        assert_eq!(stream.state(), StreamState::Exhausted);
        assert!(handle.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_chunks_do_not_count_as_reads() {
        let stream = ContentStream::from_chunks(vec![Vec::new(), b"x".to_vec()]);
        let mut handle = stream.clone();
        assert_eq!(handle.next().await.unwrap().unwrap(), b"");
        assert!(stream.is_unread());
    }

    #[tokio::test]
    async fn shared_buffer_is_chunked() {
        let data: Arc<[u8]> = Arc::from(&b"0123456789"[..]);
        let chunks: Vec<Vec<u8>> = ContentStream::from_shared(data, 4)
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert_eq!(chunks, vec![b"0123".to_vec(), b"4567".to_vec(), b"89".to_vec()]);
    }

    #[tokio::test]
    async fn text_stream_slices_the_shared_allocation() {
        let text: Arc<str> = Arc::from("héllo wörld");
        let content = Content::Text(Arc::clone(&text));
        let stream = content.to_stream(3);
        assert_eq!(Arc::strong_count(&text), 3);

        let out = stream.read_to_end().await.unwrap();
        assert_eq!(out, "héllo wörld".as_bytes());
    }

    #[tokio::test]
    async fn empty_stream_stays_unread_after_end() {
        let stream = ContentStream::from_chunks(vec![]);
        let mut handle = stream.clone();
        assert!(handle.next().await.is_none());
        assert!(stream.is_unread());
        assert!(handle.next().await.is_none());
    }

    #[tokio::test]
    async fn zero_chunk_size_still_progresses() {
        let data: Arc<[u8]> = Arc::from(&b"abc"[..]);
        let out = ContentStream::from_shared(data, 0).read_to_end().await.unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn same_source_is_pointer_identity() {
        let a = Content::text("hello");
        let b = a.clone();
        let c = Content::text("hello");
        assert!(a.same_source(&b));
        assert!(!a.same_source(&c));

        let s = ContentStream::from_chunks(vec![]);
        assert!(Content::from(s.clone()).same_source(&Content::from(s)));
    }

    #[test]
    fn digest_only_for_in_memory_content() {
        let (hash, size) = Content::text("abc").digest().unwrap();
        assert_eq!(hash, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(size, 3);
        assert!(Content::from(ContentStream::from_chunks(vec![])).digest().is_none());
    }

    #[test]
    fn default_is_empty_text() {
        match Content::default() {
            Content::Text(text) => assert!(text.is_empty()),
            other => panic!("unexpected default content: {other:?}"),
        }
    }
}
