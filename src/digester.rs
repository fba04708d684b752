//! The digest pipeline.
//!
//! [`ArchiveDigester`] wires the stages together:
//!
//! ```text
//! input -> codec -> DecompressionGuard -> TarSource -> per-entry digests
//!       -> DigestSet -> aggregate -> DigestReport
//! ```
//!
//! Entries are processed strictly one at a time in stream order. For each
//! entry the header digest is computed first and checked for duplicates;
//! only then is the content streamed into its own hasher. Nothing beyond the
//! digest set is kept in memory.
//!
//! After the last entry the second end-of-archive block is checked and the
//! remainder of the decompressed stream is read through the guard, so the
//! budget applies to the whole stream and the codec gets to verify its
//! trailer.

use std::io::{self, Read};

use crate::aggregate::aggregate;
use crate::canonical::CanonicalEncoding;
use crate::checksum::{HashSink, HexDigest};
use crate::digest_set::{DigestSet, EntryDigest};
use crate::error::{Error, Phase, Result};
use crate::options::DigestOptions;
use crate::safety::{BudgetTracker, DecompressionGuard};
use crate::source::{EntrySource, TarSource};

/// Size of a tar block.
const BLOCK_SIZE: usize = 512;

/// Result of a successful digest run.
#[derive(Debug, Clone)]
pub struct DigestReport {
    /// The order-independent archive digest.
    pub digest: HexDigest,
    /// Number of entries folded into the digest.
    pub entries: usize,
    /// Total content bytes hashed across all entries.
    pub content_bytes: u64,
    /// Decompressed bytes read from the input, or `None` when the entries did
    /// not come from a byte stream.
    pub decompressed_bytes: Option<u64>,
    /// Canonical header encoding used.
    pub encoding: CanonicalEncoding,
    set: DigestSet,
}

impl DigestReport {
    /// Returns the per-entry digests in the order they were folded.
    pub fn entry_digests(&self) -> Vec<EntryDigest> {
        self.set.entry_digests()
    }
}

/// Computes order-independent digests of tar archives.
///
/// # Example
///
/// ```rust
/// use tardigest::source::MemorySource;
/// use tardigest::{ArchiveDigester, DigestOptions, EntryMetadata};
///
/// let digester = ArchiveDigester::new(DigestOptions::default());
///
/// let mut forward = MemorySource::new()
///     .with_entry(EntryMetadata::file("a.txt", 5), b"hello".to_vec())
///     .with_entry(EntryMetadata::file("b.txt", 5), b"world".to_vec());
/// let mut backward = MemorySource::new()
///     .with_entry(EntryMetadata::file("b.txt", 5), b"world".to_vec())
///     .with_entry(EntryMetadata::file("a.txt", 5), b"hello".to_vec());
///
/// let a = digester.digest_source(&mut forward).unwrap();
/// let b = digester.digest_source(&mut backward).unwrap();
/// assert_eq!(a.digest, b.digest);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArchiveDigester {
    options: DigestOptions,
}

struct Scan {
    set: DigestSet,
    entries: usize,
    content_bytes: u64,
}

impl ArchiveDigester {
    /// Creates a digester with the given options.
    pub fn new(options: DigestOptions) -> Self {
        Self { options }
    }

    /// Returns the options in use.
    pub fn options(&self) -> &DigestOptions {
        &self.options
    }

    /// Digests a compressed tar stream.
    ///
    /// # Errors
    ///
    /// - [`Error::ResourceLimitExceeded`] if the stream decompresses to more
    ///   than the configured budget. This takes precedence over any stream
    ///   error seen in the same run.
    /// - [`Error::Stream`] for malformed or truncated input.
    /// - [`Error::DuplicateHeaderDigest`] if two entries share a canonical
    ///   header.
    pub fn digest_reader<R: Read>(&self, reader: R) -> Result<DigestReport> {
        let tracker = BudgetTracker::new(self.options.max_decompressed_bytes);
        let decoded = self.options.codec.open(reader)?;
        let guard = DecompressionGuard::with_tracker(decoded, tracker.clone());

        let mut source = TarSource::new(guard);
        let outcome = self.scan(&mut source).and_then(|scan| {
            finish_stream(source.into_inner())?;
            Ok(scan)
        });

        let scan = match outcome {
            Ok(_) | Err(Error::Stream { .. }) if tracker.is_exhausted() => {
                return Err(Error::ResourceLimitExceeded {
                    limit: tracker.limit(),
                });
            }
            other => other?,
        };

        self.finish(scan, Some(tracker.consumed()))
    }

    /// Digests entries from an arbitrary source.
    ///
    /// No decompression budget applies; the source is trusted to bound its
    /// own input.
    pub fn digest_source<S: EntrySource>(&self, source: &mut S) -> Result<DigestReport> {
        let scan = self.scan(source)?;
        self.finish(scan, None)
    }

    fn scan<S: EntrySource>(&self, source: &mut S) -> Result<Scan> {
        let encoding = self.options.encoding;
        let mut set = DigestSet::new();
        let mut content_bytes = 0u64;

        let entries = source.for_each_entry(|index, metadata, content| {
            let header = encoding.header_digest(&metadata)?;
            let name = metadata.name_lossy();
            log::debug!("Entry {index} {name}: header {header}");

            set.insert_with(header, index, &name, || {
                let mut sink = HashSink::new(Phase::ContentHashing);
                sink.copy_from(content)?;
                content_bytes += sink.bytes_written();
                Ok(sink.finalize())
            })
        })?;

        Ok(Scan {
            set,
            entries,
            content_bytes,
        })
    }

    fn finish(&self, scan: Scan, decompressed_bytes: Option<u64>) -> Result<DigestReport> {
        let digest = aggregate(&scan.set)?;
        log::info!(
            "Digested {} entries ({} content bytes, {} decompressed bytes)",
            scan.entries,
            scan.content_bytes,
            decompressed_bytes.map_or_else(|| "n/a".to_string(), |n| n.to_string())
        );
        Ok(DigestReport {
            digest,
            entries: scan.entries,
            content_bytes: scan.content_bytes,
            decompressed_bytes,
            encoding: self.options.encoding,
            set: scan.set,
        })
    }
}

/// Checks the end-of-archive marker, then reads the stream to its end.
///
/// The tar reader stops at the first zero block. The block after it must be
/// zero too, or the stream must end right there.
fn finish_stream<R: Read>(mut reader: R) -> Result<()> {
    let mut block = [0u8; BLOCK_SIZE];
    let filled =
        read_block(&mut reader, &mut block).map_err(|e| Error::stream(Phase::HeaderRead, e))?;
    if filled != 0 && filled < BLOCK_SIZE {
        return Err(Error::stream(
            Phase::HeaderRead,
            io::Error::new(io::ErrorKind::UnexpectedEof, "truncated end-of-archive marker"),
        ));
    }
    if block.iter().any(|&b| b != 0) {
        return Err(Error::stream(
            Phase::HeaderRead,
            io::Error::new(io::ErrorKind::InvalidData, "data block after end-of-archive marker"),
        ));
    }

    let trailing = drain(reader)?;
    if trailing > 0 {
        log::debug!("Skipped {trailing} bytes after the end-of-archive marker");
    }
    Ok(())
}

/// Fills `block` as far as the stream allows and returns the byte count.
fn read_block<R: Read>(reader: &mut R, block: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < block.len() {
        match reader.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads the decompressed stream to its end.
fn drain<R: Read>(mut reader: R) -> Result<u64> {
    io::copy(&mut reader, &mut io::sink()).map_err(|e| Error::stream(Phase::Decompression, e))
}
