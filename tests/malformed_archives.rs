//! Tests for malformed and corrupted archive handling.
//!
//! Every failure here must surface as a stream error: no digest, and never
//! a panic.

mod common;

use common::{create_archive, create_tar, digest, digest_plain, gzip};
use tardigest::{Error, Phase};

/// Asserts that `result` failed with a stream error.
fn assert_stream_error(result: tardigest::Result<tardigest::DigestReport>) -> Error {
    match result {
        Ok(report) => panic!("Expected stream error, got digest {}", report.digest),
        Err(e) => {
            assert!(e.is_corruption(), "Expected stream error, got: {e:?}");
            e
        }
    }
}

// =============================================================================
// Compressed Stream Corruption
// =============================================================================

#[test]
fn test_not_gzip() {
    assert_stream_error(digest(b"this is certainly not a gzip stream"));
}

#[test]
fn test_plain_tar_with_gzip_codec() {
    let tar = create_tar(&[("a.txt", b"hello")]);
    assert_stream_error(digest(&tar));
}

#[test]
fn test_truncated_gzip() {
    let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let archive = create_archive(&[("a.bin", payload.as_slice())]);

    for cut in [10, archive.len() / 2, archive.len() - 4] {
        assert_stream_error(digest(&archive[..cut]));
    }
}

#[test]
fn test_corrupted_crc_trailer() {
    let mut archive = create_archive(&[("a.txt", b"hello")]);
    let crc_offset = archive.len() - 8;
    archive[crc_offset] ^= 0xFF;

    let err = assert_stream_error(digest(&archive));
    assert_eq!(err.phase(), Some(Phase::Decompression));
}

#[test]
fn test_data_after_gzip_stream_is_ignored() {
    let archive = create_archive(&[("a.txt", b"hello")]);
    let expected = digest(&archive).unwrap().digest;

    // Block-padded output, as left by `dd conv=sync`, and plain junk.
    for trailer in [&[0u8; 512][..], b"garbage"] {
        let mut padded = archive.clone();
        padded.extend_from_slice(trailer);
        assert_eq!(digest(&padded).unwrap().digest, expected);
    }
}

#[test]
fn test_broken_member_after_gzip_stream() {
    let mut archive = create_archive(&[("a.txt", b"hello")]);
    archive.extend_from_slice(&[0x1F, 0x8B, 0x08]);
    let err = assert_stream_error(digest(&archive));
    assert_eq!(err.phase(), Some(Phase::Decompression));
}

// =============================================================================
// Tar Container Corruption
// =============================================================================

#[test]
fn test_bad_header_checksum() {
    let mut tar = create_tar(&[("a.txt", b"hello")]);
    // Change the name without updating the header checksum.
    tar[0] = b'b';

    let err = assert_stream_error(digest(&gzip(&tar)));
    assert_eq!(err.phase(), Some(Phase::HeaderRead));
}

#[test]
fn test_truncated_tar_content() {
    let payload = vec![7u8; 2000];
    let tar = create_tar(&[("a.bin", payload.as_slice())]);
    assert_stream_error(digest_plain(&tar[..1000]));
}

#[test]
fn test_truncated_tar_header() {
    let tar = create_tar(&[("a.txt", b"hello")]);
    assert_stream_error(digest_plain(&tar[..300]));
}

#[test]
fn test_data_block_after_end_marker() {
    let mut tar = create_tar(&[("a.txt", b"hello")]);
    // Second of the two zero blocks closing the archive.
    let second_marker = tar.len() - 512;
    tar[second_marker + 100] = 0x42;

    let err = assert_stream_error(digest(&gzip(&tar)));
    assert_eq!(err.phase(), Some(Phase::HeaderRead));
}

#[test]
fn test_truncated_end_marker() {
    let tar = create_tar(&[("a.txt", b"hello")]);
    assert_stream_error(digest_plain(&tar[..tar.len() - 256]));
}

#[test]
fn test_invalid_pax_record() {
    let mut builder = tar::Builder::new(Vec::new());
    common::append_file_with_pax(&mut builder, "a.txt", b"hello", &[("mtime", b"yesterday")]);
    let archive = gzip(&builder.into_inner().unwrap());

    let err = assert_stream_error(digest(&archive));
    assert_eq!(err.phase(), Some(Phase::HeaderRead));
}

#[test]
fn test_random_bytes_never_panic() {
    let mut state = 0x2545_F491_4F6C_DD1Du64;
    for len in [0usize, 1, 2, 511, 512, 513, 1024, 4096] {
        let data: Vec<u8> = (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                state as u8
            })
            .collect();
        let _ = digest(&data);
        let _ = digest_plain(&data);
    }
}
