//! Canonical header encoding.
//!
//! Each entry's metadata is turned into a byte sequence with a fixed field
//! order, which is then hashed into the entry's header digest:
//!
//! 1. type flag (one byte)
//! 2. name
//! 3. link target
//! 4. size, mode, uid, gid (signed varints)
//! 5. group name, user name
//! 6. modification, access and change time (microseconds, signed varints)
//! 7. extended attributes in ascending key order
//!
//! Two versions of the byte layout exist, see [`CanonicalEncoding`].

use std::str::FromStr;

use crate::checksum::{HashSink, HexDigest};
use crate::entry::{EntryMetadata, ExtendedAttribute};
use crate::error::{Phase, Result};
use crate::timestamp::Timestamp;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Byte layout of the canonical header encoding.
///
/// | Version | Strings | Integers | Attributes |
/// |---------|---------|----------|------------|
/// | 1 `Legacy` | raw bytes, no delimiter | 10-byte scratch buffer per value | values only |
/// | 2 `LengthPrefixed` | varint length + bytes | minimal varint | count, then key and value, each length-prefixed |
///
/// `Legacy` reproduces the digests computed by existing tooling and is the
/// default. Its unprefixed strings let different field splits collide
/// (`name="ab", link="c"` and `name="a", link="bc"`), and two attribute sets
/// with different keys but equal values are indistinguishable.
/// `LengthPrefixed` removes both collisions at the cost of producing
/// different digests for every archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CanonicalEncoding {
    /// Version 1: compatible with previously computed digests.
    #[default]
    Legacy,
    /// Version 2: every variable-length field is length-prefixed and
    /// attribute keys are encoded.
    LengthPrefixed,
}

impl CanonicalEncoding {
    /// Returns the numeric version of this layout.
    pub fn version(&self) -> u32 {
        match self {
            Self::Legacy => 1,
            Self::LengthPrefixed => 2,
        }
    }

    /// Returns the name used on the command line and in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::LengthPrefixed => "length-prefixed",
        }
    }

    /// Encodes `metadata` into its canonical bytes.
    pub fn encode(&self, metadata: &EntryMetadata) -> Vec<u8> {
        match self {
            Self::Legacy => {
                let mut sink = LegacySink::default();
                write_fields(metadata, &mut sink);
                sink.out
            }
            Self::LengthPrefixed => {
                let mut sink = PrefixedSink::default();
                write_fields(metadata, &mut sink);
                sink.out
            }
        }
    }

    /// Computes the header digest of `metadata`.
    pub fn header_digest(&self, metadata: &EntryMetadata) -> Result<HexDigest> {
        let bytes = self.encode(metadata);
        let mut sink = HashSink::new(Phase::HeaderCanonicalization);
        sink.update(&bytes)?;
        Ok(sink.finalize())
    }
}

impl std::fmt::Display for CanonicalEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CanonicalEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "legacy" | "v1" | "1" => Ok(Self::Legacy),
            "length-prefixed" | "v2" | "2" => Ok(Self::LengthPrefixed),
            other => Err(format!("unknown canonical encoding: {other}")),
        }
    }
}

/// Writes a zig-zag encoded signed varint into `buf`, returning its length.
pub fn put_varint(buf: &mut [u8; MAX_VARINT_LEN], value: i64) -> usize {
    let mut ux = (value as u64) << 1;
    if value < 0 {
        ux = !ux;
    }
    put_uvarint(buf, ux)
}

/// Writes an LEB128 unsigned varint into `buf`, returning its length.
pub fn put_uvarint(buf: &mut [u8; MAX_VARINT_LEN], mut value: u64) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        buf[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    buf[i] = value as u8;
    i + 1
}

trait FieldSink {
    fn byte(&mut self, b: u8);
    fn bytes(&mut self, data: &[u8]);
    fn int(&mut self, value: i64);
    fn attributes(&mut self, attrs: &[ExtendedAttribute]);
}

fn write_fields<S: FieldSink>(meta: &EntryMetadata, sink: &mut S) {
    sink.byte(meta.type_flag);
    sink.bytes(&meta.name);
    sink.bytes(&meta.link_name);

    sink.int(meta.size);
    sink.int(meta.mode);
    sink.int(meta.uid);
    sink.int(meta.gid);

    sink.bytes(&meta.group_name);
    sink.bytes(&meta.user_name);

    sink.int(Timestamp::micros_or_unset(meta.modified));
    sink.int(Timestamp::micros_or_unset(meta.accessed));
    sink.int(Timestamp::micros_or_unset(meta.changed));

    sink.attributes(meta.attributes());
}

/// Version 1 layout.
///
/// The scratch buffer lives for the whole header and is emitted in full for
/// every integer, so bytes left over from a longer earlier value trail a
/// shorter later one.
#[derive(Default)]
struct LegacySink {
    out: Vec<u8>,
    scratch: [u8; MAX_VARINT_LEN],
}

impl FieldSink for LegacySink {
    fn byte(&mut self, b: u8) {
        self.out.push(b);
    }

    fn bytes(&mut self, data: &[u8]) {
        self.out.extend_from_slice(data);
    }

    fn int(&mut self, value: i64) {
        put_varint(&mut self.scratch, value);
        self.out.extend_from_slice(&self.scratch);
    }

    fn attributes(&mut self, attrs: &[ExtendedAttribute]) {
        for attr in attrs {
            self.bytes(&attr.value);
        }
    }
}

/// Version 2 layout.
#[derive(Default)]
struct PrefixedSink {
    out: Vec<u8>,
}

impl PrefixedSink {
    fn uvarint(&mut self, value: u64) {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let n = put_uvarint(&mut buf, value);
        self.out.extend_from_slice(&buf[..n]);
    }
}

impl FieldSink for PrefixedSink {
    fn byte(&mut self, b: u8) {
        self.out.push(b);
    }

    fn bytes(&mut self, data: &[u8]) {
        self.uvarint(data.len() as u64);
        self.out.extend_from_slice(data);
    }

    fn int(&mut self, value: i64) {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let n = put_varint(&mut buf, value);
        self.out.extend_from_slice(&buf[..n]);
    }

    fn attributes(&mut self, attrs: &[ExtendedAttribute]) {
        self.uvarint(attrs.len() as u64);
        for attr in attrs {
            self.bytes(&attr.key);
            self.bytes(&attr.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::type_flag;
    use crate::timestamp::UNSET_MICROS;

    fn varint(value: i64) -> Vec<u8> {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let n = put_varint(&mut buf, value);
        buf[..n].to_vec()
    }

    #[test]
    fn test_varint_zigzag() {
        assert_eq!(varint(0), vec![0x00]);
        assert_eq!(varint(-1), vec![0x01]);
        assert_eq!(varint(1), vec![0x02]);
        assert_eq!(varint(-2), vec![0x03]);
        assert_eq!(varint(300), vec![0xD8, 0x04]);
        assert_eq!(varint(i64::MIN).len(), MAX_VARINT_LEN);
        assert_eq!(varint(i64::MAX).len(), MAX_VARINT_LEN);
    }

    #[test]
    fn test_legacy_layout() {
        let mut meta = EntryMetadata::new(type_flag::REGULAR, "a");
        meta.size = 300;
        meta.mode = 1;
        meta.group_name = b"g".to_vec();
        meta.user_name = b"u".to_vec();
        meta.modified = Some(Timestamp::from_unix_micros(0));

        let out = CanonicalEncoding::Legacy.encode(&meta);
        // flag + name + 7 ints of 10 bytes + "g" + "u"
        assert_eq!(out.len(), 1 + 1 + 7 * MAX_VARINT_LEN + 2);
        assert_eq!(&out[..2], b"0a");
        assert_eq!(&out[2..4], &[0xD8, 0x04]);
        // mode=1 overwrites only the first scratch byte; 0x04 from size remains
        assert_eq!(&out[12..14], &[0x02, 0x04]);
        assert_eq!(&out[42..44], b"gu");
    }

    #[test]
    fn test_legacy_unset_times_use_sentinel() {
        let meta = EntryMetadata::new(type_flag::REGULAR, "");
        let out = CanonicalEncoding::Legacy.encode(&meta);
        let sentinel = varint(UNSET_MICROS);
        let mtime_at = 1 + 4 * MAX_VARINT_LEN;
        assert_eq!(&out[mtime_at..mtime_at + sentinel.len()], sentinel.as_slice());
    }

    #[test]
    fn test_legacy_field_split_collides() {
        let mut a = EntryMetadata::file("ab", 0);
        a.link_name = b"c".to_vec();
        let mut b = EntryMetadata::file("a", 0);
        b.link_name = b"bc".to_vec();

        let enc = CanonicalEncoding::Legacy;
        assert_eq!(enc.encode(&a), enc.encode(&b));
        assert_eq!(enc.header_digest(&a).unwrap(), enc.header_digest(&b).unwrap());

        let enc = CanonicalEncoding::LengthPrefixed;
        assert_ne!(enc.header_digest(&a).unwrap(), enc.header_digest(&b).unwrap());
    }

    #[test]
    fn test_legacy_ignores_attribute_keys() {
        let a = EntryMetadata::file("f", 0).with_attribute("user.one", "v");
        let b = EntryMetadata::file("f", 0).with_attribute("user.two", "v");

        assert_eq!(
            CanonicalEncoding::Legacy.header_digest(&a).unwrap(),
            CanonicalEncoding::Legacy.header_digest(&b).unwrap()
        );
        assert_ne!(
            CanonicalEncoding::LengthPrefixed.header_digest(&a).unwrap(),
            CanonicalEncoding::LengthPrefixed.header_digest(&b).unwrap()
        );
    }

    #[test]
    fn test_attributes_encoded_in_key_order() {
        let meta = EntryMetadata::new(type_flag::REGULAR, "")
            .with_attribute("b", "second")
            .with_attribute("a", "first");
        let out = CanonicalEncoding::Legacy.encode(&meta);
        assert!(out.ends_with(b"firstsecond"));
    }

    #[test]
    fn test_prefixed_layout() {
        let meta = EntryMetadata::new(type_flag::DIRECTORY, "d/").with_attribute("k", "v");
        let out = CanonicalEncoding::LengthPrefixed.encode(&meta);

        let mut expected = vec![b'5', 2, b'd', b'/', 0];
        expected.extend_from_slice(&[0, 0, 0, 0]);
        expected.extend_from_slice(&[0, 0]);
        for _ in 0..3 {
            expected.extend(varint(UNSET_MICROS));
        }
        expected.extend_from_slice(&[1, 1, b'k', 1, b'v']);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_every_field_affects_digest() {
        let base = EntryMetadata::file("f", 1);
        let mut variants = Vec::new();

        let mut m = base.clone();
        m.type_flag = type_flag::SYMLINK;
        variants.push(m);
        let mut m = base.clone();
        m.mode = 0o755;
        variants.push(m);
        let mut m = base.clone();
        m.uid = 1;
        variants.push(m);
        let mut m = base.clone();
        m.gid = 1;
        variants.push(m);
        let mut m = base.clone();
        m.user_name = b"root".to_vec();
        variants.push(m);
        let mut m = base.clone();
        m.modified = Some(Timestamp::from_unix_micros(1));
        variants.push(m);
        let mut m = base.clone();
        m.accessed = Some(Timestamp::from_unix_micros(1));
        variants.push(m);
        let mut m = base.clone();
        m.changed = Some(Timestamp::from_unix_micros(1));
        variants.push(m);
        variants.push(base.clone().with_attribute("k", "v"));

        for encoding in [CanonicalEncoding::Legacy, CanonicalEncoding::LengthPrefixed] {
            let reference = encoding.header_digest(&base).unwrap();
            for variant in &variants {
                assert_ne!(
                    encoding.header_digest(variant).unwrap(),
                    reference,
                    "{encoding}: {variant:?}"
                );
            }
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "legacy".parse::<CanonicalEncoding>(),
            Ok(CanonicalEncoding::Legacy)
        );
        assert_eq!(
            "v2".parse::<CanonicalEncoding>(),
            Ok(CanonicalEncoding::LengthPrefixed)
        );
        assert!("v3".parse::<CanonicalEncoding>().is_err());
    }
}
