//! Order-independent aggregation of entry digests.
//!
//! The final digest is a SHA-256 over every entry's digest pair, visited in
//! ascending order of the header digest's hex text. For each pair the header
//! digest text is fed first, then the content digest text. Folding both
//! halves keeps two archives apart when their content digests agree but
//! belong to different headers.
//!
//! Because the visit order depends only on the keys, the result depends only
//! on the set of pairs, never on the order entries were read.

use crate::checksum::{HashSink, HexDigest};
use crate::digest_set::DigestSet;
use crate::error::{Phase, Result};

/// Folds a completed digest set into the final archive digest.
///
/// An empty set yields the digest of the empty string.
pub fn aggregate(set: &DigestSet) -> Result<HexDigest> {
    let mut sink = HashSink::new(Phase::Aggregation);
    for (header, content) in set.iter() {
        sink.update(header.as_bytes())?;
        sink.update(content.as_bytes())?;
    }
    Ok(sink.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest_set::EntryDigest;

    fn pair(header: &[u8], content: &[u8]) -> EntryDigest {
        EntryDigest {
            header: HexDigest::of(header),
            content: HexDigest::of(content),
        }
    }

    #[test]
    fn test_empty_set() {
        assert_eq!(aggregate(&DigestSet::new()).unwrap(), HexDigest::of(b""));
    }

    #[test]
    fn test_insertion_order_irrelevant() {
        let pairs = [pair(b"a", b"1"), pair(b"b", b"2"), pair(b"c", b"3")];

        let mut forward = DigestSet::new();
        for (i, p) in pairs.iter().enumerate() {
            forward.insert(p.clone(), i, "").unwrap();
        }
        let mut backward = DigestSet::new();
        for (i, p) in pairs.iter().rev().enumerate() {
            backward.insert(p.clone(), i, "").unwrap();
        }

        assert_eq!(aggregate(&forward).unwrap(), aggregate(&backward).unwrap());
    }

    #[test]
    fn test_fold_layout() {
        let p1 = pair(b"x", b"1");
        let p2 = pair(b"y", b"2");
        let mut set = DigestSet::new();
        set.insert(p1.clone(), 0, "").unwrap();
        set.insert(p2.clone(), 1, "").unwrap();

        let (first, second) = if p1.header < p2.header { (p1, p2) } else { (p2, p1) };
        let mut expected = Vec::new();
        for p in [&first, &second] {
            expected.extend_from_slice(p.header.as_bytes());
            expected.extend_from_slice(p.content.as_bytes());
        }
        assert_eq!(aggregate(&set).unwrap(), HexDigest::of(&expected));
    }

    #[test]
    fn test_header_digests_are_folded() {
        let mut a = DigestSet::new();
        a.insert(pair(b"h1", b"same"), 0, "").unwrap();
        let mut b = DigestSet::new();
        b.insert(pair(b"h2", b"same"), 0, "").unwrap();

        assert_ne!(aggregate(&a).unwrap(), aggregate(&b).unwrap());
    }
}
