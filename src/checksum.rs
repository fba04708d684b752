//! SHA-256 digest computation utilities.
//!
//! Every hashing step of a run (one per entry header, one per entry content
//! stream, one for the final fold) uses its own [`HashSink`]. Nothing is
//! reset and reused, so no state can leak between computations.
//!
//! # Example
//!
//! ```rust
//! use tardigest::checksum::{HashSink, HexDigest};
//! use tardigest::error::Phase;
//!
//! let mut sink = HashSink::new(Phase::ContentHashing);
//! sink.update(b"Hello, ").unwrap();
//! sink.update(b"World!").unwrap();
//! let digest = sink.finalize();
//!
//! assert_eq!(digest, HexDigest::of(b"Hello, World!"));
//! assert_eq!(digest.as_str().len(), 64);
//! ```

use std::io::{self, Read, Write};

use sha2::{Digest, Sha256};

use crate::READ_BUFFER_SIZE;
use crate::error::{Error, Phase, Result};

/// Length of a SHA-256 digest rendered as hex.
pub const HEX_DIGEST_LEN: usize = 64;

/// A SHA-256 digest rendered as a lowercase hexadecimal string.
///
/// Ordering is the byte order of the hex text, which is what the aggregation
/// sorts by.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexDigest(String);

impl HexDigest {
    /// Renders raw digest bytes as lowercase hex.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Computes the digest of a single slice in one call.
    pub fn of(data: &[u8]) -> Self {
        Self::from_bytes(&Sha256::digest(data))
    }

    /// Parses a 64-character lowercase hex digest.
    pub fn parse(s: &str) -> Option<Self> {
        let valid = s.len() == HEX_DIGEST_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(s.to_string()))
    }

    /// Returns the hex text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the hex text as bytes, which is what gets folded.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for HexDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for HexDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HexDigest({})", self.0)
    }
}

/// A single-use SHA-256 accumulator.
///
/// Writes are checked for full consumption; a hasher that accepts fewer bytes
/// than offered is reported as [`Error::WriteFailure`] rather than assumed
/// impossible.
#[derive(Clone)]
pub struct HashSink {
    hasher: Sha256,
    phase: Phase,
    written: u64,
}

impl HashSink {
    /// Creates a fresh accumulator for one hashing step.
    pub fn new(phase: Phase) -> Self {
        Self {
            hasher: Sha256::new(),
            phase,
            written: 0,
        }
    }

    /// Feeds `data` into the hash.
    pub fn update(&mut self, data: &[u8]) -> Result<()> {
        let written = self.write(data).map_err(|_| Error::WriteFailure {
            phase: self.phase,
            written: 0,
            expected: data.len(),
        })?;
        if written != data.len() {
            return Err(Error::WriteFailure {
                phase: self.phase,
                written,
                expected: data.len(),
            });
        }
        Ok(())
    }

    /// Streams every byte of `reader` into the hash.
    ///
    /// Read errors are returned as [`Error::Stream`] tagged with this sink's
    /// phase; the caller decides whether a budget cut-off explains them.
    pub fn copy_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<u64> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::stream(self.phase, e)),
            };
            self.update(&buffer[..n])?;
            total += n as u64;
        }
        Ok(total)
    }

    /// Returns the number of bytes hashed so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Finishes the computation and returns the hex digest.
    pub fn finalize(self) -> HexDigest {
        HexDigest::from_bytes(&self.hasher.finalize())
    }
}

impl Write for HashSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hasher.update(buf);
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for HashSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashSink")
            .field("phase", &self.phase)
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}
