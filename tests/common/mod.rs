//! Shared test utilities for integration tests.
//!
//! This module builds tar archives in memory with `tar::Builder` and
//! compresses them with `flate2`, so tests never touch the filesystem.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use tardigest::{ArchiveDigester, Codec, DigestOptions, DigestReport};

/// Modification time stamped on every fixture entry.
pub const FIXTURE_MTIME: u64 = 1_700_000_000;

/// SHA-256 of the empty string, the digest of an archive with no entries.
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Creates a ustar header for a regular file with fixed ownership and times.
pub fn file_header(path: &str, size: u64) -> tar::Header {
    let mut header = tar::Header::new_ustar();
    header.set_path(path).expect("Failed to set path");
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(size);
    header.set_mode(0o644);
    header.set_uid(1000);
    header.set_gid(1000);
    header.set_mtime(FIXTURE_MTIME);
    header.set_username("user").expect("Failed to set username");
    header.set_groupname("group").expect("Failed to set groupname");
    header.set_cksum();
    header
}

/// Appends a regular file to `builder`.
pub fn append_file(builder: &mut tar::Builder<Vec<u8>>, path: &str, data: &[u8]) {
    builder
        .append(&file_header(path, data.len() as u64), data)
        .expect("Failed to append entry");
}

/// Appends a regular file preceded by a local PAX extended header.
pub fn append_file_with_pax(
    builder: &mut tar::Builder<Vec<u8>>,
    path: &str,
    data: &[u8],
    records: &[(&str, &[u8])],
) {
    builder
        .append_pax_extensions(records.iter().copied())
        .expect("Failed to append PAX header");
    append_file(builder, path, data);
}

/// Creates an uncompressed tar stream holding `entries` in the given order.
pub fn create_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, data) in entries {
        append_file(&mut builder, path, data);
    }
    builder.into_inner().expect("Failed to finish tar")
}

/// Compresses `data` as a single gzip member.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("Failed to compress");
    encoder.finish().expect("Failed to finish gzip member")
}

/// Creates a `.tar.gz` stream holding `entries` in the given order.
pub fn create_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    gzip(&create_tar(entries))
}

/// Digests a `.tar.gz` stream with default options.
pub fn digest(archive: &[u8]) -> tardigest::Result<DigestReport> {
    ArchiveDigester::new(DigestOptions::default()).digest_reader(archive)
}

/// Digests a `.tar.gz` stream with the given decompression budget.
pub fn digest_with_limit(archive: &[u8], limit: u64) -> tardigest::Result<DigestReport> {
    ArchiveDigester::new(DigestOptions::new().max_decompressed_bytes(limit)).digest_reader(archive)
}

/// Digests an uncompressed tar stream.
pub fn digest_plain(tar: &[u8]) -> tardigest::Result<DigestReport> {
    ArchiveDigester::new(DigestOptions::new().codec(Codec::Identity)).digest_reader(tar)
}
