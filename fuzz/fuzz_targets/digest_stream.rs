//! Fuzz target for the full digest pipeline with arbitrary byte input.
//!
//! Feeds the input through codec detection, decompression, the budget guard
//! and the tar reader. The goal is to find panics or hangs on malformed or
//! adversarial streams.
//!
//! Run with: cargo +nightly fuzz run digest_stream

#![no_main]

use libfuzzer_sys::fuzz_target;
use tardigest::{ArchiveDigester, Codec, DigestOptions};

fuzz_target!(|data: &[u8]| {
    // A small budget keeps decompression bombs from stalling the fuzzer.
    let options = DigestOptions::new()
        .codec(Codec::Auto)
        .max_decompressed_bytes(1 << 20);

    // We don't care about the result - we're looking for panics or hangs
    let _ = ArchiveDigester::new(options).digest_reader(data);
});
