//! CLI tool computing order-independent digests of compressed tar archives.
//!
//! Reads the archive from stdin and prints `<digest>  -` to stdout.

mod exit_codes;
mod output;

use std::io::{self, Write};

use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use tardigest::{
    ArchiveDigester, CanonicalEncoding, Codec, DEFAULT_MAX_DECOMPRESSED_BYTES, DigestOptions,
    Error,
};

use exit_codes::{ExitCode, error_to_exit_code};
use output::create_formatter;

/// Order-independent SHA-256 digest of a compressed tar archive read from stdin
#[derive(Parser)]
#[command(name = "tardigest")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Maximum number of decompressed bytes to read
    #[arg(
        long,
        value_name = "BYTES",
        env = "TARDIGEST_MAX_DECOMPRESS",
        default_value_t = DEFAULT_MAX_DECOMPRESSED_BYTES
    )]
    max_decompress: u64,

    /// Canonical header encoding (legacy, length-prefixed)
    #[arg(long, default_value = "legacy")]
    encoding: CanonicalEncoding,

    /// Input compression (auto, gzip, zstd, bzip2, none)
    #[arg(long, default_value = "gzip")]
    codec: Codec,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value = "human")]
    format: OutputFormat,

    /// Also print each entry's header and content digest
    #[arg(long, short = 'l')]
    list: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                e.exit();
            }
            let _ = e.print();
            std::process::exit(exit_codes::BAD_ARGS);
        }
    };

    init_logging(cli.verbose);

    let exit_code = run(&cli);
    std::process::exit(exit_code.code());
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> ExitCode {
    if !cli.codec.is_supported() {
        let e = Error::UnsupportedCodec {
            name: cli.codec.name(),
        };
        eprintln!("Error: {e}");
        return error_to_exit_code(&e);
    }

    let options = DigestOptions::new()
        .max_decompressed_bytes(cli.max_decompress)
        .encoding(cli.encoding)
        .codec(cli.codec);
    log::debug!("Options: {options:?}");

    let report = match ArchiveDigester::new(options).digest_reader(io::stdin().lock()) {
        Ok(report) => report,
        Err(e) => {
            if let Some(name) = e.entry_name() {
                log::debug!("Failed at entry {name}");
            }
            eprintln!("Error: {e}");
            return error_to_exit_code(&e);
        }
    };

    let formatter = create_formatter(cli.format);
    if cli.list {
        if let Some(listing) = formatter.format_entries(&report.entry_digests()) {
            eprint!("{listing}");
        }
    }

    let mut stdout = io::stdout().lock();
    let written = writeln!(stdout, "{}", formatter.format_report(&report, cli.list))
        .and_then(|()| stdout.flush());
    if let Err(e) = written {
        let e = Error::Io(e);
        eprintln!("Error: {e}");
        return error_to_exit_code(&e);
    }

    ExitCode::Success
}
