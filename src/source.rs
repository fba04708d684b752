//! Entry sources.
//!
//! An [`EntrySource`] yields archive entries one at a time: resolved
//! metadata plus a reader over the entry content. [`TarSource`] reads a
//! decompressed tar stream; [`MemorySource`] serves prepared entries and is
//! mainly useful in tests.

use std::borrow::Cow;
use std::io::{self, Read};

use crate::entry::{EntryMetadata, ExtendedAttribute, normalize_type_flag, type_flag};
use crate::error::{Error, Phase, Result};
use crate::timestamp::Timestamp;

/// PAX record keys the resolver interprets.
pub mod pax_key {
    /// Owner id.
    pub const UID: &[u8] = b"uid";
    /// Group id.
    pub const GID: &[u8] = b"gid";
    /// Owner name.
    pub const UNAME: &[u8] = b"uname";
    /// Group name.
    pub const GNAME: &[u8] = b"gname";
    /// Content size.
    pub const SIZE: &[u8] = b"size";
    /// Modification time.
    pub const MTIME: &[u8] = b"mtime";
    /// Access time.
    pub const ATIME: &[u8] = b"atime";
    /// Status change time.
    pub const CTIME: &[u8] = b"ctime";
    /// GNU sparse format 0.0 offset record.
    pub const GNU_SPARSE_OFFSET: &[u8] = b"GNU.sparse.offset";
    /// GNU sparse format 0.0 length record.
    pub const GNU_SPARSE_NUMBYTES: &[u8] = b"GNU.sparse.numbytes";
    /// GNU sparse format 0.1 map record.
    pub const GNU_SPARSE_MAP: &[u8] = b"GNU.sparse.map";
}

/// A sequence of archive entries.
///
/// Entries are visited strictly in stream order. The content reader handed
/// to the callback is only valid for the duration of the call; whatever the
/// callback leaves unread is skipped before the next entry.
pub trait EntrySource {
    /// Calls `f` with `(index, metadata, content)` for each entry and returns
    /// the number of entries visited.
    ///
    /// Stops at the first error, whether it comes from the source or from
    /// `f`.
    fn for_each_entry<F>(&mut self, f: F) -> Result<usize>
    where
        F: FnMut(usize, EntryMetadata, &mut dyn Read) -> Result<()>;
}

/// Entries of a decompressed tar stream.
pub struct TarSource<R: Read> {
    archive: tar::Archive<R>,
}

impl<R: Read> TarSource<R> {
    /// Wraps a reader positioned at the first tar header.
    pub fn new(reader: R) -> Self {
        Self {
            archive: tar::Archive::new(reader),
        }
    }

    /// Returns the underlying reader, positioned after the last entry read.
    pub fn into_inner(self) -> R {
        self.archive.into_inner()
    }
}

impl<R: Read> EntrySource for TarSource<R> {
    fn for_each_entry<F>(&mut self, mut f: F) -> Result<usize>
    where
        F: FnMut(usize, EntryMetadata, &mut dyn Read) -> Result<()>,
    {
        let entries = self
            .archive
            .entries()
            .map_err(|e| Error::stream(Phase::HeaderRead, e))?;

        let mut count = 0;
        for (index, entry) in entries.enumerate() {
            let mut entry = entry.map_err(|e| Error::stream(Phase::HeaderRead, e))?;
            let metadata =
                resolve_metadata(&mut entry).map_err(|e| Error::stream(Phase::HeaderRead, e))?;
            f(index, metadata, &mut entry)?;
            count += 1;
        }
        Ok(count)
    }
}

impl<R: Read> std::fmt::Debug for TarSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarSource").finish_non_exhaustive()
    }
}

/// Resolves the effective metadata of a tar entry.
///
/// Long names and PAX `path`/`linkpath` are taken from the tar reader;
/// the remaining PAX overrides (`uid`, `gid`, `uname`, `gname`, `size`,
/// `mtime`, `atime`, `ctime`) are applied here. A global extended header
/// (`g`) keeps only its raw name, its type flag and its records.
///
/// For a global header the record block is consumed here, so the entry's
/// content reads as empty afterwards.
///
/// # Errors
///
/// Returns `InvalidData` when a numeric header field or PAX override does
/// not fit the canonical signed 64-bit range or fails to parse.
pub fn resolve_metadata<R: Read>(entry: &mut tar::Entry<'_, R>) -> io::Result<EntryMetadata> {
    // The raw byte, since `EntryType` folds the legacy `\0` flag into `'0'`.
    let raw_flag = entry.header().as_old().linkflag[0];

    if raw_flag == type_flag::PAX_GLOBAL {
        let name = entry.header().path_bytes().into_owned();
        let mut metadata = EntryMetadata::new(raw_flag, name);
        metadata.set_attributes(read_pax_records(entry)?);
        return Ok(metadata);
    }

    let name = entry.path_bytes().into_owned();
    let link_name = entry
        .link_name_bytes()
        .map(Cow::into_owned)
        .unwrap_or_default();
    let records = read_pax_records(entry)?;

    let header = entry.header();
    let fields = header.as_old();
    let mut metadata = EntryMetadata::new(normalize_type_flag(raw_flag, &name), name);
    metadata.link_name = link_name;
    metadata.size = to_i64("size", entry.size())?;
    metadata.mode = parse_numeric("mode", &fields.mode)?;
    metadata.uid = parse_numeric("uid", &fields.uid)?;
    metadata.gid = parse_numeric("gid", &fields.gid)?;
    metadata.user_name = header.username_bytes().unwrap_or_default().to_vec();
    metadata.group_name = header.groupname_bytes().unwrap_or_default().to_vec();
    metadata.modified = Some(Timestamp::from_unix_secs(parse_numeric("mtime", &fields.mtime)?));

    if let Some(gnu) = header.as_gnu() {
        if gnu.atime[0] != 0 {
            let secs = parse_numeric("atime", &gnu.atime)?;
            metadata.accessed = Some(Timestamp::from_unix_secs(secs));
        }
        if gnu.ctime[0] != 0 {
            let secs = parse_numeric("ctime", &gnu.ctime)?;
            metadata.changed = Some(Timestamp::from_unix_secs(secs));
        }
    }

    metadata.set_attributes(records);
    apply_pax_overrides(&mut metadata)?;
    Ok(metadata)
}

/// Collects the entry's PAX records in stream order.
///
/// GNU sparse 0.0 offset/length pairs are folded into a single
/// `GNU.sparse.map` record, comma separated.
fn read_pax_records<R: Read>(entry: &mut tar::Entry<'_, R>) -> io::Result<Vec<ExtendedAttribute>> {
    let Some(extensions) = entry.pax_extensions()? else {
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    let mut sparse_map: Vec<&[u8]> = Vec::new();
    for extension in extensions {
        let extension = extension?;
        let key = extension.key_bytes();
        if key == pax_key::GNU_SPARSE_OFFSET || key == pax_key::GNU_SPARSE_NUMBYTES {
            sparse_map.push(extension.value_bytes());
            continue;
        }
        records.push(ExtendedAttribute::new(key, extension.value_bytes()));
    }
    if !sparse_map.is_empty() {
        records.push(ExtendedAttribute::new(
            pax_key::GNU_SPARSE_MAP,
            sparse_map.join(&b","[..]),
        ));
    }
    Ok(records)
}

fn apply_pax_overrides(metadata: &mut EntryMetadata) -> io::Result<()> {
    if let Some(uid) = pax_int(metadata, pax_key::UID)? {
        metadata.uid = uid;
    }
    if let Some(gid) = pax_int(metadata, pax_key::GID)? {
        metadata.gid = gid;
    }
    if let Some(size) = pax_int(metadata, pax_key::SIZE)? {
        if size < 0 {
            return Err(invalid_data("negative PAX size"));
        }
        metadata.size = size;
    }
    if let Some(name) = metadata.attribute(pax_key::UNAME).map(<[u8]>::to_vec) {
        metadata.user_name = name;
    }
    if let Some(name) = metadata.attribute(pax_key::GNAME).map(<[u8]>::to_vec) {
        metadata.group_name = name;
    }
    if let Some(ts) = pax_time(metadata, pax_key::MTIME)? {
        metadata.modified = Some(ts);
    }
    if let Some(ts) = pax_time(metadata, pax_key::ATIME)? {
        metadata.accessed = Some(ts);
    }
    if let Some(ts) = pax_time(metadata, pax_key::CTIME)? {
        metadata.changed = Some(ts);
    }
    Ok(())
}

fn pax_int(metadata: &EntryMetadata, key: &[u8]) -> io::Result<Option<i64>> {
    let Some(value) = metadata.attribute(key) else {
        return Ok(None);
    };
    std::str::from_utf8(value)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .map(Some)
        .ok_or_else(|| invalid_data(format!("invalid PAX {} record", String::from_utf8_lossy(key))))
}

fn pax_time(metadata: &EntryMetadata, key: &[u8]) -> io::Result<Option<Timestamp>> {
    let Some(value) = metadata.attribute(key) else {
        return Ok(None);
    };
    Timestamp::parse_pax(value)
        .map(Some)
        .ok_or_else(|| invalid_data(format!("invalid PAX {} record", String::from_utf8_lossy(key))))
}

/// Parses a numeric header field.
///
/// A field with the high bit of its first byte set holds a big-endian
/// two's complement number (GNU base-256). Otherwise it is octal text;
/// surrounding spaces and NULs are ignored and a blank field reads as 0.
fn parse_numeric(field: &str, raw: &[u8]) -> io::Result<i64> {
    if raw.first().is_some_and(|b| b & 0x80 != 0) {
        let invert = if raw[0] & 0x40 != 0 { 0xFF } else { 0x00 };
        let mut value: u64 = 0;
        for (i, byte) in raw.iter().enumerate() {
            let mut byte = byte ^ invert;
            if i == 0 {
                byte &= 0x7F;
            }
            if value >> 56 != 0 {
                return Err(invalid_data(format!("header {field} out of range")));
            }
            value = value << 8 | u64::from(byte);
        }
        if value >> 63 != 0 {
            return Err(invalid_data(format!("header {field} out of range")));
        }
        let value = value as i64;
        return Ok(if invert == 0xFF { !value } else { value });
    }

    let is_padding = |b: &u8| *b == b' ' || *b == 0;
    let start = raw.iter().position(|b| !is_padding(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !is_padding(b)).map_or(start, |i| i + 1);
    let text = &raw[start..end];
    if text.is_empty() {
        return Ok(0);
    }
    std::str::from_utf8(text)
        .ok()
        .and_then(|text| i64::from_str_radix(text, 8).ok())
        .ok_or_else(|| {
            invalid_data(format!(
                "header {field} is not an octal number: {}",
                String::from_utf8_lossy(text)
            ))
        })
}

fn to_i64(field: &str, value: u64) -> io::Result<i64> {
    i64::try_from(value).map_err(|_| invalid_data(format!("header {field} out of range: {value}")))
}

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Entries held in memory.
///
/// Useful for exercising the digest pipeline without building a tar stream.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: Vec<(EntryMetadata, Vec<u8>)>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, metadata: EntryMetadata, content: impl Into<Vec<u8>>) {
        self.entries.push((metadata, content.into()));
    }

    /// Builder-style variant of [`push`](Self::push).
    pub fn with_entry(mut self, metadata: EntryMetadata, content: impl Into<Vec<u8>>) -> Self {
        self.push(metadata, content);
        self
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the source holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(EntryMetadata, Vec<u8>)> for MemorySource {
    fn from_iter<I: IntoIterator<Item = (EntryMetadata, Vec<u8>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl EntrySource for MemorySource {
    fn for_each_entry<F>(&mut self, mut f: F) -> Result<usize>
    where
        F: FnMut(usize, EntryMetadata, &mut dyn Read) -> Result<()>,
    {
        for (index, (metadata, content)) in self.entries.iter().enumerate() {
            let mut reader: &[u8] = content;
            f(index, metadata.clone(), &mut reader)?;
        }
        Ok(self.entries.len())
    }
}
