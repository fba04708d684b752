//! Archive entry metadata.
//!
//! [`EntryMetadata`] is the resolved view of one tar member: header fields
//! after PAX and GNU long-name overrides have been applied, plus the entry's
//! extended-attribute records. It is what the canonical header encoding is
//! computed from.

use std::borrow::Cow;

use crate::Timestamp;

/// Tar type flags the resolver treats specially.
pub mod type_flag {
    /// Regular file.
    pub const REGULAR: u8 = b'0';
    /// Legacy regular file (pre-POSIX).
    pub const REGULAR_LEGACY: u8 = b'\0';
    /// Hard link.
    pub const LINK: u8 = b'1';
    /// Symbolic link.
    pub const SYMLINK: u8 = b'2';
    /// Directory.
    pub const DIRECTORY: u8 = b'5';
    /// Global PAX extended header.
    pub const PAX_GLOBAL: u8 = b'g';
}

/// Maps the legacy regular-file flag onto its modern equivalent.
///
/// Old archivers wrote `\0` for both files and directories, relying on a
/// trailing slash in the name to mark directories.
pub fn normalize_type_flag(flag: u8, name: &[u8]) -> u8 {
    if flag != type_flag::REGULAR_LEGACY {
        return flag;
    }
    if name.ends_with(b"/") {
        type_flag::DIRECTORY
    } else {
        type_flag::REGULAR
    }
}

/// One extended-attribute (PAX) record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtendedAttribute {
    /// Record key, e.g. `SCHILY.xattr.user.comment`.
    pub key: Vec<u8>,
    /// Record value.
    pub value: Vec<u8>,
}

impl ExtendedAttribute {
    /// Creates a record.
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Resolved metadata of one archive entry.
///
/// Extended attributes are kept sorted by key with unique keys; use
/// [`set_attribute`](Self::set_attribute) or
/// [`set_attributes`](Self::set_attributes) to modify them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Tar type flag byte.
    pub type_flag: u8,
    /// Entry path as raw bytes.
    pub name: Vec<u8>,
    /// Link target as raw bytes (empty for non-links).
    pub link_name: Vec<u8>,
    /// Declared content size.
    pub size: i64,
    /// Permission bits as stored in the header.
    pub mode: i64,
    /// Numeric owner id.
    pub uid: i64,
    /// Numeric group id.
    pub gid: i64,
    /// Owner name.
    pub user_name: Vec<u8>,
    /// Group name.
    pub group_name: Vec<u8>,
    /// Modification time.
    pub modified: Option<Timestamp>,
    /// Access time.
    pub accessed: Option<Timestamp>,
    /// Status change time.
    pub changed: Option<Timestamp>,
    attributes: Vec<ExtendedAttribute>,
}

impl EntryMetadata {
    /// Creates metadata with the given type and name and every other field
    /// zero, empty or unset.
    pub fn new(type_flag: u8, name: impl Into<Vec<u8>>) -> Self {
        Self {
            type_flag,
            name: name.into(),
            link_name: Vec::new(),
            size: 0,
            mode: 0,
            uid: 0,
            gid: 0,
            user_name: Vec::new(),
            group_name: Vec::new(),
            modified: None,
            accessed: None,
            changed: None,
            attributes: Vec::new(),
        }
    }

    /// Creates metadata for a regular file of `size` bytes.
    pub fn file(name: impl Into<Vec<u8>>, size: i64) -> Self {
        Self {
            size,
            mode: 0o644,
            ..Self::new(type_flag::REGULAR, name)
        }
    }

    /// Returns the name as UTF-8, replacing invalid sequences.
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Returns the extended attributes in ascending key order.
    pub fn attributes(&self) -> &[ExtendedAttribute] {
        &self.attributes
    }

    /// Returns the value recorded for `key`.
    pub fn attribute(&self, key: &[u8]) -> Option<&[u8]> {
        self.attributes
            .binary_search_by(|a| a.key.as_slice().cmp(key))
            .ok()
            .map(|i| self.attributes[i].value.as_slice())
    }

    /// Sets one attribute, replacing any previous value for the same key.
    pub fn set_attribute(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        let attr = ExtendedAttribute::new(key, value);
        match self
            .attributes
            .binary_search_by(|a| a.key.as_slice().cmp(attr.key.as_slice()))
        {
            Ok(i) => self.attributes[i] = attr,
            Err(i) => self.attributes.insert(i, attr),
        }
    }

    /// Replaces all attributes. Later records win over earlier ones with the
    /// same key.
    pub fn set_attributes<I>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = ExtendedAttribute>,
    {
        self.attributes.clear();
        for attr in attributes {
            self.set_attribute(attr.key, attr.value);
        }
    }

    /// Builder-style variant of [`set_attribute`](Self::set_attribute).
    pub fn with_attribute(mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.set_attribute(key, value);
        self
    }
}
