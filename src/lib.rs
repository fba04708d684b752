//! # tardigest
//!
//! Order-independent content digests of compressed tar archives.
//!
//! Two archives holding the same set of entries (same metadata, same
//! content) produce the same digest, regardless of the order the entries
//! were written in. Any change to an entry's name, type, ownership,
//! permissions, timestamps, extended attributes or content changes the
//! digest.
//!
//! The archive is processed as a single forward pass over the stream. Each
//! entry gets two SHA-256 digests: one over a canonical encoding of its
//! header and one over its content. The header digests act as keys of a
//! sorted set; folding that set in key order yields the archive digest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tardigest::{ArchiveDigester, DigestOptions, Result};
//!
//! fn main() -> Result<()> {
//!     let file = std::fs::File::open("release.tar.gz")?;
//!     let report = ArchiveDigester::new(DigestOptions::default()).digest_reader(file)?;
//!     println!("{}  -", report.digest);
//!     Ok(())
//! }
//! ```
//!
//! ## Canonical Encodings
//!
//! The header encoding is versioned by [`CanonicalEncoding`]. The default,
//! [`CanonicalEncoding::Legacy`], reproduces digests computed by existing
//! tooling byte for byte. [`CanonicalEncoding::LengthPrefixed`] closes the
//! field-boundary collisions the legacy layout allows.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `gzip` | Yes | gzip input (multi-member streams accepted) |
//! | `zstd` | No | Zstandard input |
//! | `bzip2` | No | bzip2 input |
//! | `cli` | No | The `tardigest` command-line tool |
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`]. Every [`Error`] is fatal for the run:
//! no partial digest is ever produced.
//!
//! ```rust,no_run
//! use tardigest::{ArchiveDigester, DigestOptions, Error};
//!
//! let digester = ArchiveDigester::new(DigestOptions::new().max_decompressed_bytes(1 << 20));
//! match digester.digest_reader(std::io::stdin().lock()) {
//!     Ok(report) => println!("{}", report.digest),
//!     Err(Error::ResourceLimitExceeded { limit }) => eprintln!("larger than {limit} bytes"),
//!     Err(e) if e.is_corruption() => eprintln!("not a valid archive: {e}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```
//!
//! ## Safety and Resource Limits
//!
//! Decompression is capped by a byte budget (10 GB by default, see
//! [`DigestOptions::max_decompressed_bytes`]). Running out of budget is
//! always reported as [`Error::ResourceLimitExceeded`], never as a corrupt
//! archive, even though the tar parser sees the cut-off as a truncated
//! stream.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Default buffer size for read operations (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod aggregate;
pub mod canonical;
pub mod checksum;
pub mod codec;
pub mod digest_set;
pub mod digester;
pub mod entry;
pub mod error;
pub mod options;
pub mod safety;
pub mod source;
pub mod timestamp;

pub use canonical::CanonicalEncoding;
pub use checksum::{HashSink, HexDigest};
pub use codec::Codec;
pub use digest_set::{DigestSet, EntryDigest};
pub use digester::{ArchiveDigester, DigestReport};
pub use entry::{EntryMetadata, ExtendedAttribute};
pub use error::{Error, Phase, Result};
pub use options::DigestOptions;
pub use timestamp::Timestamp;

// Re-export safety utilities
pub use safety::{BudgetTracker, DEFAULT_MAX_DECOMPRESSED_BYTES, DecompressionGuard};

// Re-export entry sources
pub use source::{EntrySource, MemorySource, TarSource};
