//! Content hashing for destination naming.
//!
//! Files are streamed once through SHA-256 in fixed-size chunks; only the
//! first six hex characters of the digest end up in destination names.

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};

/// Number of hex characters of the digest used in destination names.
pub const SHORT_HASH_LEN: usize = 6;

const CHUNK_SIZE: usize = 64 * 1024;

/// Lowercase hex digest of a file's full content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    /// The full hex digest.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// The truncated prefix used in destination names.
    ///
    /// # Examples
    ///
    /// ```
    /// use timeline::hasher::hash_reader;
    ///
    /// let hash = hash_reader(&b"abc"[..]).unwrap();
    /// assert_eq!(hash.short(), "ba7816");
    /// ```
    pub fn short(&self) -> &str {
        &self.0[..SHORT_HASH_LEN]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads `reader` to the end and returns the digest of everything read.
///
/// Interrupted reads are retried; any other read failure is returned as-is.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentHash> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(ContentHash(format!("{:x}", hasher.finalize())))
}
