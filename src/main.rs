use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use chunk_scan::{scan_path, Method, CHUNK_SIZE};

/// Fold a file into a 64-bit XOR using one of several I/O strategies.
#[derive(Parser, Debug)]
#[command(name = "chunk-scan", version)]
struct Args {
    /// How to get the file into memory
    #[arg(value_enum, value_name = "METHOD")]
    method: Method,

    /// File to scan
    #[arg(value_name = "FILE_PATH")]
    path: PathBuf,

    /// Bytes per chunk; accepts a `k` or `m` suffix
    #[arg(long, value_name = "BYTES", default_value_t = CHUNK_SIZE, value_parser = parse_size)]
    chunk_size: usize,
}

fn parse_size(s: &str) -> Result<usize, String> {
    let (digits, shift) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 10),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 20),
        _ => (s, 0),
    };
    let n: usize = digits.parse().map_err(|e| format!("{s:?}: {e}"))?;
    n.checked_mul(1 << shift)
        .ok_or_else(|| format!("{s:?} is too large"))
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    #[cfg(feature = "timings")]
    let duration = std::time::Instant::now();

    let scan = match scan_path(args.method, &args.path, args.chunk_size) {
        Ok(scan) => scan,
        Err(e) => {
            if let Some(os) = e.os_error() {
                log::debug!(
                    "{} failed: kind={:?} errno={:?}",
                    args.method,
                    os.kind(),
                    os.raw_os_error()
                );
            }
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    #[cfg(feature = "timings")]
    eprintln!("{}: {:?}", args.method, duration.elapsed());

    println!("Result: {}", scan.result);
    ExitCode::SUCCESS
}
