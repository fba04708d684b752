//! Per-entry digests and duplicate detection.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::checksum::HexDigest;
use crate::error::{Error, Result};

/// The digest pair computed for one archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryDigest {
    /// Digest of the canonical header encoding.
    pub header: HexDigest,
    /// Digest of the entry content.
    pub content: HexDigest,
}

/// Header digest to content digest mapping, one insertion per entry.
///
/// Header digests are unique keys. A repeated header digest is an error and
/// is never merged; two entries with the same canonical header are treated as
/// the same entry identity regardless of their content.
#[derive(Debug, Clone, Default)]
pub struct DigestSet {
    entries: BTreeMap<HexDigest, HexDigest>,
}

impl DigestSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries were inserted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts a computed entry digest.
    pub fn insert(&mut self, digest: EntryDigest, entry_index: usize, entry_name: &str) -> Result<()> {
        let EntryDigest { header, content } = digest;
        self.insert_with(header, entry_index, entry_name, || Ok(content))
    }

    /// Inserts `header`, computing the content digest only if the header is
    /// new.
    ///
    /// The duplicate check runs before `content` is called, so a duplicate
    /// entry is rejected without streaming its data.
    pub fn insert_with<F>(
        &mut self,
        header: HexDigest,
        entry_index: usize,
        entry_name: &str,
        content: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Result<HexDigest>,
    {
        match self.entries.entry(header) {
            Entry::Occupied(slot) => Err(Error::DuplicateHeaderDigest {
                digest: slot.key().clone(),
                entry_index,
                entry_name: entry_name.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(content()?);
                Ok(())
            }
        }
    }

    /// Iterates entries in ascending header-digest order.
    pub fn iter(&self) -> impl Iterator<Item = (&HexDigest, &HexDigest)> {
        self.entries.iter()
    }

    /// Returns the entry digests in ascending header-digest order.
    pub fn entry_digests(&self) -> Vec<EntryDigest> {
        self.iter()
            .map(|(header, content)| EntryDigest {
                header: header.clone(),
                content: content.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(header: &[u8], content: &[u8]) -> EntryDigest {
        EntryDigest {
            header: HexDigest::of(header),
            content: HexDigest::of(content),
        }
    }

    #[test]
    fn test_insert_and_iterate_sorted() {
        let mut set = DigestSet::new();
        set.insert(pair(b"h1", b"c1"), 0, "a").unwrap();
        set.insert(pair(b"h2", b"c2"), 1, "b").unwrap();
        set.insert(pair(b"h3", b"c3"), 2, "c").unwrap();

        assert_eq!(set.len(), 3);
        let keys: Vec<&HexDigest> = set.iter().map(|(k, _)| k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut set = DigestSet::new();
        set.insert(pair(b"h", b"one"), 0, "a.txt").unwrap();
        let err = set.insert(pair(b"h", b"two"), 1, "a.txt").unwrap_err();

        match err {
            Error::DuplicateHeaderDigest {
                digest,
                entry_index,
                entry_name,
            } => {
                assert_eq!(digest, HexDigest::of(b"h"));
                assert_eq!(entry_index, 1);
                assert_eq!(entry_name, "a.txt");
            }
            other => panic!("Expected DuplicateHeaderDigest, got: {other:?}"),
        }
        assert_eq!(set.len(), 1, "Failed insert must not modify the set");
        assert_eq!(set.entry_digests()[0].content, HexDigest::of(b"one"));
    }

    #[test]
    fn test_duplicate_skips_content() {
        let mut set = DigestSet::new();
        set.insert(pair(b"h", b"c"), 0, "").unwrap();

        let mut called = false;
        let result = set.insert_with(HexDigest::of(b"h"), 1, "", || {
            called = true;
            Ok(HexDigest::of(b"c"))
        });
        assert!(result.is_err());
        assert!(!called);
    }

    #[test]
    fn test_content_error_leaves_set_unchanged() {
        let mut set = DigestSet::new();
        let result = set.insert_with(HexDigest::of(b"h"), 0, "", || {
            Err(Error::ResourceLimitExceeded { limit: 1 })
        });
        assert!(result.is_err());
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }
}
