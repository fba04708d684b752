//! Exit codes for the CLI tool.

use tardigest::Error;

/// Exit code constants
pub const SUCCESS: i32 = 0;
/// Fatal or internal error
pub const FATAL_ERROR: i32 = 2;
/// Malformed or truncated archive
pub const BAD_ARCHIVE: i32 = 3;
/// Decompressed data exceeded the budget
pub const RESOURCE_LIMIT: i32 = 4;
/// I/O error
pub const IO_ERROR: i32 = 5;
/// Two entries with the same canonical header
pub const DUPLICATE_ENTRY: i32 = 6;
/// Invalid command line arguments
pub const BAD_ARGS: i32 = 255;

/// Exit code enum for structured handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    FatalError,
    BadArchive,
    ResourceLimit,
    IoError,
    DuplicateEntry,
    BadArgs,
}

impl ExitCode {
    /// Returns the numeric exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => SUCCESS,
            Self::FatalError => FATAL_ERROR,
            Self::BadArchive => BAD_ARCHIVE,
            Self::ResourceLimit => RESOURCE_LIMIT,
            Self::IoError => IO_ERROR,
            Self::DuplicateEntry => DUPLICATE_ENTRY,
            Self::BadArgs => BAD_ARGS,
        }
    }
}

/// Converts a tardigest error to an exit code
pub fn error_to_exit_code(error: &Error) -> ExitCode {
    match error {
        Error::Stream { .. } => ExitCode::BadArchive,
        Error::ResourceLimitExceeded { .. } => ExitCode::ResourceLimit,
        Error::DuplicateHeaderDigest { .. } => ExitCode::DuplicateEntry,
        Error::Io(_) => ExitCode::IoError,
        Error::UnsupportedCodec { .. } => ExitCode::BadArgs,
        Error::WriteFailure { .. } => ExitCode::FatalError,
        // Future error variants - required by #[non_exhaustive]
        _ => ExitCode::FatalError,
    }
}
