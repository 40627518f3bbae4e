//! Hashing primitives
//!
//! Two hash families are used by assets:
//! - [`ContentHash`]: 32-byte Blake3 hash used for identities and cache keys
//! - [`OutputDigest`]: incremental MD5 used for content hashes (`hash`,
//!   `output_hash`, connected-file hashes), rendered as lowercase hex

use md5::{Digest, Md5};
use std::fmt::{self, Display, Formatter};

/// Blake3 hash over length-delimited parts, used for ids and cache keys
///
/// Rendered as 64 lowercase hex chars through `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Raw digest bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash of a single buffer
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash of an ordered list of parts
    ///
    /// Each part is length-prefixed, so `["ab", "c"]` and `["a", "bc"]`
    /// produce different hashes.
    #[must_use]
    pub fn compute_parts<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            let part = part.as_ref();
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        Self(*hasher.finalize().as_bytes())
    }

    /// First 16 hex chars, for log lines
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Incremental MD5 accumulator with a running byte count
///
/// Fed chunk by chunk while content flows to the cache; `finish` yields the
/// hex digest and the total number of bytes seen.
#[derive(Debug, Clone, Default)]
pub struct OutputDigest {
    hasher: Md5,
    size: u64,
}

impl OutputDigest {
    /// Create an empty accumulator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk
    #[inline]
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.size += chunk.len() as u64;
    }

    /// Bytes seen so far
    #[inline]
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Consume the accumulator, returning `(hex digest, size)`
    #[must_use]
    pub fn finish(self) -> (String, u64) {
        (hex::encode(self.hasher.finalize()), self.size)
    }
}

/// MD5 of an in-memory buffer as lowercase hex
#[inline]
#[must_use]
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_compute_deterministic() {
        let h1 = ContentHash::compute(b"hello world");
        let h2 = ContentHash::compute(b"hello world");
        assert_eq!(h1, h2);
        assert_ne!(h1, ContentHash::compute(b"hello worlds"));
    }

    #[test]
    fn compute_parts_is_length_delimited() {
        let a = ContentHash::compute_parts(["ab", "c"]);
        let b = ContentHash::compute_parts(["a", "bc"]);
        assert_ne!(a, b);
        assert_eq!(a, ContentHash::compute_parts(["ab", "c"]));
    }

    #[test]
    fn display_is_full_hex() {
        let hash = ContentHash::compute(b"test");
        let rendered = hash.to_string();
        assert_eq!(rendered.len(), 64);
        assert!(rendered.starts_with(&hash.short()));
        assert_eq!(hex::decode(&rendered).unwrap(), hash.as_bytes());
    }

    #[test]
    fn md5_known_vectors() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            md5_hex(b"The quick brown fox jumps over the lazy dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
    }

    #[test]
    fn output_digest_matches_one_shot() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let mut digest = OutputDigest::new();
        for chunk in data.chunks(7) {
            digest.update(chunk);
        }
        assert_eq!(digest.size(), data.len() as u64);
        let (hex, size) = digest.finish();
        assert_eq!(hex, md5_hex(data));
        assert_eq!(size, data.len() as u64);
    }
}
