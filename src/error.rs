//! Error types for archive digest operations.
//!
//! This module provides the [`Error`] enum which represents every way a
//! digest run can fail, along with a convenient [`Result<T>`] type alias.
//!
//! Every error is fatal for the run that produced it: there is no partial
//! digest and no resumption. The [`Phase`] attached to stream and write
//! failures tells the caller which step of the pipeline gave up.
//!
//! # Example
//!
//! ```rust,no_run
//! use tardigest::{ArchiveDigester, DigestOptions, Error};
//!
//! fn digest_stdin() -> tardigest::Result<String> {
//!     let digester = ArchiveDigester::new(DigestOptions::default());
//!     match digester.digest_reader(std::io::stdin().lock()) {
//!         Ok(report) => Ok(report.digest.to_string()),
//!         Err(e @ Error::ResourceLimitExceeded { .. }) => {
//!             eprintln!("archive expands beyond the configured budget");
//!             Err(e)
//!         }
//!         Err(e) => Err(e),
//!     }
//! }
//! ```

use std::io;

use crate::checksum::HexDigest;

/// The pipeline step in which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Phase {
    /// Setting up or draining the decompressor.
    Decompression,
    /// Reading the next entry header from the container.
    HeaderRead,
    /// Turning entry metadata into its canonical encoding.
    HeaderCanonicalization,
    /// Streaming entry content into the hasher.
    ContentHashing,
    /// Inserting the entry digest into the digest set.
    DuplicateCheck,
    /// Folding the digest set into the final digest.
    Aggregation,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Decompression => "decompression",
            Self::HeaderRead => "header read",
            Self::HeaderCanonicalization => "header canonicalization",
            Self::ContentHashing => "content hashing",
            Self::DuplicateCheck => "duplicate check",
            Self::Aggregation => "aggregation",
        };
        f.write_str(name)
    }
}

/// Helper struct for formatting DuplicateHeaderDigest error messages.
struct DuplicateDisplay<'a> {
    digest: &'a HexDigest,
    entry_index: usize,
    entry_name: &'a str,
}

impl std::fmt::Display for DuplicateDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Duplicate header digest {} at entry {}",
            self.digest, self.entry_index
        )?;
        if !self.entry_name.is_empty() {
            write!(f, " ({})", self.entry_name)?;
        }
        Ok(())
    }
}

/// The main error type for digest operations.
///
/// | Category | Variants | Typical Cause |
/// |----------|----------|---------------|
/// | Stream | [`Stream`][Self::Stream] | Malformed or truncated compressed/tar data |
/// | Resources | [`ResourceLimitExceeded`][Self::ResourceLimitExceeded] | Decompression bomb, budget too small |
/// | Identity | [`DuplicateHeaderDigest`][Self::DuplicateHeaderDigest] | Two entries with identical canonical headers |
/// | Internal | [`WriteFailure`][Self::WriteFailure] | Hasher refused bytes |
/// | I/O | [`Io`][Self::Io] | Writing results, opening inputs |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The compressed stream or the tar container is malformed or truncated.
    ///
    /// This is never returned when the decompression budget ran out while
    /// the failing read was in progress; see
    /// [`ResourceLimitExceeded`][Self::ResourceLimitExceeded].
    #[error("Stream error during {phase}: {source}")]
    Stream {
        /// The phase that observed the failure.
        phase: Phase,
        /// The underlying read error.
        #[source]
        source: io::Error,
    },

    /// The decompressed byte budget was exhausted.
    ///
    /// Takes precedence over any stream error observed in the same run, since
    /// a read cut short by the budget looks like a truncated archive to the
    /// tar parser.
    #[error("Resource limit exceeded: decompressed data exceeds {limit} bytes")]
    ResourceLimitExceeded {
        /// The configured budget in bytes.
        limit: u64,
    },

    /// Two entries canonicalized to the same header digest.
    #[error("{}", DuplicateDisplay { digest, entry_index: *entry_index, entry_name })]
    DuplicateHeaderDigest {
        /// The repeated header digest.
        digest: HexDigest,
        /// Zero-based index of the second occurrence.
        entry_index: usize,
        /// Lossy UTF-8 rendering of the entry name.
        entry_name: String,
    },

    /// A write into a hasher did not consume every byte offered.
    #[error("Write failure during {phase}: wrote {written} of {expected} bytes")]
    WriteFailure {
        /// The phase that was hashing.
        phase: Phase,
        /// Bytes accepted by the hasher.
        written: usize,
        /// Bytes offered.
        expected: usize,
    },

    /// The requested codec is not compiled into this build.
    #[error("Unsupported codec: {name} (enable the `{name}` feature)")]
    UnsupportedCodec {
        /// Codec name.
        name: &'static str,
    },

    /// An I/O error outside of archive reading.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Wraps a read error observed in `phase`.
    pub fn stream(phase: Phase, source: io::Error) -> Self {
        Error::Stream { phase, source }
    }

    /// Returns `true` if the decompression budget was exhausted.
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, Error::ResourceLimitExceeded { .. })
    }

    /// Returns `true` if the archive data itself is malformed.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Stream { .. })
    }

    /// Returns the phase associated with this error, if any.
    ///
    /// Resource limit errors are always reported from decompression and
    /// duplicates from the duplicate check.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::Stream { phase, .. } => Some(*phase),
            Error::WriteFailure { phase, .. } => Some(*phase),
            Error::ResourceLimitExceeded { .. } => Some(Phase::Decompression),
            Error::DuplicateHeaderDigest { .. } => Some(Phase::DuplicateCheck),
            _ => None,
        }
    }

    /// Returns the entry name associated with this error, if any.
    pub fn entry_name(&self) -> Option<&str> {
        match self {
            Error::DuplicateHeaderDigest { entry_name, .. } => Some(entry_name.as_str()),
            _ => None,
        }
    }
}

/// A specialized Result type for digest operations.
pub type Result<T> = std::result::Result<T, Error>;
