//! Options for a digest run.

use crate::canonical::CanonicalEncoding;
use crate::codec::Codec;
use crate::safety::DEFAULT_MAX_DECOMPRESSED_BYTES;

/// Configuration for [`ArchiveDigester`](crate::ArchiveDigester).
///
/// # Example
///
/// ```rust
/// use tardigest::{CanonicalEncoding, Codec, DigestOptions};
///
/// let options = DigestOptions::new()
///     .max_decompressed_bytes(1 << 30)
///     .encoding(CanonicalEncoding::LengthPrefixed)
///     .codec(Codec::Auto);
/// assert_eq!(options.max_decompressed_bytes, 1 << 30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestOptions {
    /// Maximum decompressed bytes read from the input.
    pub max_decompressed_bytes: u64,
    /// Canonical header encoding.
    pub encoding: CanonicalEncoding,
    /// Input decompression.
    pub codec: Codec,
}

impl Default for DigestOptions {
    /// Creates options with the following default values:
    ///
    /// | Option | Default Value |
    /// |--------|---------------|
    /// | `max_decompressed_bytes` | 10,000,000,000 |
    /// | `encoding` | [`CanonicalEncoding::Legacy`] |
    /// | `codec` | [`Codec::Gzip`] |
    fn default() -> Self {
        Self {
            max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED_BYTES,
            encoding: CanonicalEncoding::default(),
            codec: Codec::default(),
        }
    }
}

impl DigestOptions {
    /// Creates options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the decompressed byte budget.
    pub fn max_decompressed_bytes(mut self, max: u64) -> Self {
        self.max_decompressed_bytes = max;
        self
    }

    /// Sets the canonical header encoding.
    pub fn encoding(mut self, encoding: CanonicalEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the input codec.
    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }
}
