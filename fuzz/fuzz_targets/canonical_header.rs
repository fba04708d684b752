//! Fuzz target for header canonicalization.
//!
//! Splits the input into header fields and checks that both encodings
//! accept any metadata and that the length-prefixed encoding never maps two
//! different field splits to the same bytes.
//!
//! Run with: cargo +nightly fuzz run canonical_header

#![no_main]

use libfuzzer_sys::fuzz_target;
use tardigest::{CanonicalEncoding, EntryMetadata};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let split = usize::from(data[0]) % data.len();
    let rest = &data[1..];
    let split = split.min(rest.len());

    let mut a = EntryMetadata::new(b'0', &rest[..split]);
    a.link_name = rest[split..].to_vec();

    let mut b = EntryMetadata::new(b'0', rest);
    b.link_name = Vec::new();

    for encoding in [CanonicalEncoding::Legacy, CanonicalEncoding::LengthPrefixed] {
        let _ = encoding.header_digest(&a);
    }

    if split < rest.len() {
        assert_ne!(
            CanonicalEncoding::LengthPrefixed.encode(&a),
            CanonicalEncoding::LengthPrefixed.encode(&b)
        );
    }
});
