//! Stream decompression.
//!
//! A [`Codec`] turns the raw input stream into the decompressed tar stream.
//! Gzip is always the default; zstd and bzip2 are available behind the
//! features of the same name. [`Codec::Auto`] picks a codec from the leading
//! magic bytes without seeking, so it works on pipes.

#[cfg(feature = "gzip")]
use std::io::BufRead;
use std::io::{self, Cursor, Read};
use std::str::FromStr;

#[cfg(feature = "gzip")]
use flate2::bufread::GzDecoder;

#[cfg(feature = "gzip")]
use crate::READ_BUFFER_SIZE;
use crate::error::{Error, Phase, Result};

/// Magic bytes of a gzip member.
pub const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
/// Magic bytes of a zstd frame.
pub const ZSTD_MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];
/// Magic bytes of a bzip2 stream.
pub const BZIP2_MAGIC: &[u8] = b"BZh";

const SNIFF_LEN: usize = 4;

/// Decompression applied to the input before tar parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum Codec {
    /// Detect from the leading magic bytes; unrecognized input is read as
    /// plain tar.
    Auto,
    /// gzip, including concatenated multi-member streams. Data after the
    /// last member that does not start another member is ignored.
    #[default]
    Gzip,
    /// Zstandard (requires the `zstd` feature).
    Zstd,
    /// bzip2, including concatenated streams (requires the `bzip2` feature).
    Bzip2,
    /// No compression.
    Identity,
}

impl Codec {
    /// Returns the name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Auto => "auto",
            Codec::Gzip => "gzip",
            Codec::Zstd => "zstd",
            Codec::Bzip2 => "bzip2",
            Codec::Identity => "none",
        }
    }

    /// Returns whether this build can decode the codec.
    pub fn is_supported(&self) -> bool {
        match self {
            Codec::Auto | Codec::Identity => true,
            Codec::Gzip => cfg!(feature = "gzip"),
            Codec::Zstd => cfg!(feature = "zstd"),
            Codec::Bzip2 => cfg!(feature = "bzip2"),
        }
    }

    /// Identifies the codec from the first bytes of a stream.
    ///
    /// Returns [`Codec::Identity`] when no known signature matches.
    pub fn detect(prefix: &[u8]) -> Codec {
        if prefix.starts_with(GZIP_MAGIC) {
            Codec::Gzip
        } else if prefix.starts_with(ZSTD_MAGIC) {
            Codec::Zstd
        } else if prefix.starts_with(BZIP2_MAGIC) {
            Codec::Bzip2
        } else {
            Codec::Identity
        }
    }

    /// Wraps `reader` in the matching decoder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCodec`] if the codec is not compiled in,
    /// or [`Error::Stream`] if the decoder cannot be initialized.
    pub fn open<'a, R: Read + 'a>(self, reader: R) -> Result<Box<dyn Read + 'a>> {
        let mut reader: Box<dyn Read + 'a> = Box::new(reader);
        let codec = match self {
            Codec::Auto => {
                let prefix = read_prefix(&mut reader, SNIFF_LEN)
                    .map_err(|e| Error::stream(Phase::Decompression, e))?;
                let detected = Codec::detect(&prefix);
                log::debug!("Detected codec: {}", detected.name());
                reader = Box::new(Cursor::new(prefix).chain(reader));
                detected
            }
            other => other,
        };
        match codec {
            Codec::Auto | Codec::Identity => Ok(reader),
            Codec::Gzip => open_gzip(reader),
            Codec::Zstd => open_zstd(reader),
            Codec::Bzip2 => open_bzip2(reader),
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Codec::Auto),
            "gzip" | "gz" => Ok(Codec::Gzip),
            "zstd" | "zst" => Ok(Codec::Zstd),
            "bzip2" | "bz2" => Ok(Codec::Bzip2),
            "none" | "identity" | "tar" => Ok(Codec::Identity),
            other => Err(format!("unknown codec: {other}")),
        }
    }
}

/// Reads up to `len` bytes, stopping early only at end of stream.
fn read_prefix<R: Read>(reader: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut prefix = Vec::with_capacity(len);
    reader.by_ref().take(len as u64).read_to_end(&mut prefix)?;
    Ok(prefix)
}

#[cfg(feature = "gzip")]
fn open_gzip<'a>(reader: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
    let reader = io::BufReader::with_capacity(READ_BUFFER_SIZE, reader);
    Ok(Box::new(GzipMembers {
        decoder: Some(GzDecoder::new(reader)),
    }))
}

/// Decoder for concatenated gzip members.
///
/// After each member the next byte decides: the gzip magic starts another
/// member, anything else ends the stream. Zero padding after the last member,
/// as written by block-oriented tools, is skipped instead of being parsed as
/// a member header. Every member that is started has its trailer checked.
#[cfg(feature = "gzip")]
struct GzipMembers<R> {
    decoder: Option<GzDecoder<R>>,
}

#[cfg(feature = "gzip")]
impl<R: BufRead> Read for GzipMembers<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let Some(decoder) = self.decoder.as_mut() else {
                return Ok(0);
            };
            let n = decoder.read(buf)?;
            if n > 0 || buf.is_empty() {
                return Ok(n);
            }

            let mut inner = match self.decoder.take() {
                Some(decoder) => decoder.into_inner(),
                None => return Ok(0),
            };
            let next = inner.fill_buf()?;
            if next.first() == GZIP_MAGIC.first() {
                self.decoder = Some(GzDecoder::new(inner));
            } else if !next.is_empty() {
                log::debug!("Ignoring data after the last gzip member");
            }
        }
    }
}

#[cfg(not(feature = "gzip"))]
fn open_gzip<'a>(_reader: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
    Err(Error::UnsupportedCodec { name: "gzip" })
}

#[cfg(feature = "zstd")]
fn open_zstd<'a>(reader: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
    let decoder = zstd::stream::read::Decoder::new(reader)
        .map_err(|e| Error::stream(Phase::Decompression, e))?;
    Ok(Box::new(decoder))
}

#[cfg(not(feature = "zstd"))]
fn open_zstd<'a>(_reader: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
    Err(Error::UnsupportedCodec { name: "zstd" })
}

#[cfg(feature = "bzip2")]
fn open_bzip2<'a>(reader: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
    Ok(Box::new(bzip2::read::MultiBzDecoder::new(reader)))
}

#[cfg(not(feature = "bzip2"))]
fn open_bzip2<'a>(_reader: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
    Err(Error::UnsupportedCodec { name: "bzip2" })
}
