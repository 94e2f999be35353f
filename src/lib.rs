//! How much does it matter *how* a big file gets into memory?
//!
//! Three ways of walking a file chunk by chunk are compared here: plain
//! blocking reads, a memory map, and a memory map with access-pattern hints.
//! Each chunk is folded into a 64-bit XOR so the work per byte is close to
//! nothing and the I/O strategy dominates the runtime. The fold also acts as
//! a checksum so the strategies can be checked against one another.

use std::{fmt::Display, path::Path};

pub mod advise;
pub mod error;
pub mod reduce;
pub mod supply;

pub use error::ScanError;
pub use reduce::{reduce_padded, reduce_words};
pub use supply::{BufferedChunks, ChunkSupply, MappedChunks};

/// Default chunk size, 1 MiB.
pub const CHUNK_SIZE: usize = 1 << 20;

/// 16 KiB is a less realistic chunk for bulk loading, but it fits in L1, so
/// it models algorithms that only look at a little data at a time (e.g.
/// counting lines).
pub const SMALL_CHUNK_SIZE: usize = 1 << 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Method {
    // Strategy:
    // - `read` into one reused buffer, with a single `posix_fadvise`
    //   (SEQUENTIAL) up front.
    //
    // Remarks: the hint does nothing for 1 MiB chunks, but with 16 KiB
    // chunks it brings the runtime down to roughly the 1 MiB figure.
    /// Blocking reads into a reused scratch buffer
    Read,

    // Strategy:
    // - Map the whole file once and walk it in windows.
    // - `madvise(FREE)` each window after it has been folded so the working
    //   set stays bounded.
    /// Memory-map the file and walk it in windows
    Mmap,

    // Strategy:
    // - The same as above, plus `madvise(SEQUENTIAL)` over the whole mapping
    //   before the walk so the kernel reads further ahead.
    /// Memory-map with a sequential-access hint
    #[value(name = "mmap_opt")]
    MmapOpt,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Read => "read",
            Method::Mmap => "mmap",
            Method::MmapOpt => "mmap_opt",
        }
    }

    pub const ALL: [Method; 3] = [Method::Read, Method::Mmap, Method::MmapOpt];
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The outcome of one pass over a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scan {
    /// XOR of every chunk's fold. The only number the binary prints.
    pub result: i64,

    /// Chunks handed out by the supply.
    pub chunks: u64,

    /// File bytes consumed.
    pub bytes: u64,

    /// Blocking `read` calls issued; zero for the mapped strategies.
    pub reads: u64,
}

/// Pulls every chunk out of `supply` and folds it into one accumulator.
pub fn traverse<S: ChunkSupply>(mut supply: S) -> Scan {
    let mut scan = Scan::default();
    while let Some(chunk) = supply.next_chunk() {
        scan.result ^= reduce_padded(chunk);
        scan.chunks += 1;
        supply.release_chunk();
    }
    scan.bytes = supply.bytes();
    scan.reads = supply.reads();
    scan
}

/// Scans `path` with `method` in windows of `chunk_size` bytes.
///
/// The file and its buffer or mapping are released before this returns,
/// on the error paths as well.
pub fn scan_path(method: Method, path: &Path, chunk_size: usize) -> Result<Scan, ScanError> {
    if chunk_size == 0 || chunk_size % std::mem::size_of::<i64>() != 0 {
        return Err(ScanError::ChunkSize(chunk_size));
    }
    log::debug!("{method}: {} in {chunk_size} byte chunks", path.display());

    let scan = match method {
        Method::Read => traverse(BufferedChunks::open(path, chunk_size)?),
        Method::Mmap => traverse(MappedChunks::open(path, chunk_size, false)?),
        Method::MmapOpt => traverse(MappedChunks::open(path, chunk_size, true)?),
    };

    log::debug!(
        "{method}: {} bytes, {} chunks, {} reads, result {}",
        scan.bytes,
        scan.chunks,
        scan.reads,
        scan.result
    );
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn file_with(data: &[u8]) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(data).unwrap();
        f.flush().unwrap();
        f
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    fn word(bytes: &[u8]) -> i64 {
        i64::from_ne_bytes(bytes.try_into().unwrap())
    }

    #[test]
    fn strategies_agree_on_whole_chunks() {
        let chunk = 4096;
        let data = pattern(chunk * 5);
        let f = file_with(&data);

        let expected = reduce_words(&data);
        for method in Method::ALL {
            let scan = scan_path(method, f.path(), chunk).unwrap();
            assert_eq!(scan.result, expected, "{method}");
            assert_eq!(scan.chunks, 5, "{method}");
            assert_eq!(scan.bytes, data.len() as u64, "{method}");
        }
    }

    #[test]
    fn zero_chunk_folds_to_zero() {
        let f = file_with(&vec![0; SMALL_CHUNK_SIZE]);
        for method in Method::ALL {
            assert_eq!(scan_path(method, f.path(), SMALL_CHUNK_SIZE).unwrap().result, 0);
        }
    }

    #[test]
    fn repeated_one_folds_by_word_count_parity() {
        // 4096 / 8 = 512 words, even.
        let even: Vec<u8> = (0..512).flat_map(|_| 1i64.to_ne_bytes()).collect();
        // 4104 / 8 = 513 words, odd.
        let odd: Vec<u8> = (0..513).flat_map(|_| 1i64.to_ne_bytes()).collect();

        let even_file = file_with(&even);
        let odd_file = file_with(&odd);
        for method in Method::ALL {
            assert_eq!(scan_path(method, even_file.path(), even.len()).unwrap().result, 0);
            assert_eq!(scan_path(method, odd_file.path(), odd.len()).unwrap().result, 1);
        }
    }

    #[test]
    fn empty_file_is_zero_everywhere() {
        let f = file_with(&[]);
        for method in Method::ALL {
            let scan = scan_path(method, f.path(), CHUNK_SIZE).unwrap();
            assert_eq!(scan.result, 0);
            assert_eq!(scan.chunks, 0);
        }
    }

    #[test]
    fn buffered_refolds_stale_tail() {
        let chunk = 64;
        let data = pattern(chunk + 8);
        let f = file_with(&data);

        // The second window is the last 8 bytes followed by bytes 8..64 of
        // the first read, so everything but the first word cancels.
        let scan = scan_path(Method::Read, f.path(), chunk).unwrap();
        assert_eq!(scan.result, word(&data[chunk..]) ^ word(&data[..8]));
        assert_eq!(scan.chunks, 2);
        assert_eq!(scan.reads, 3);

        // The mapped strategies fold each byte exactly once.
        let precise = reduce_words(&data);
        assert_ne!(scan.result, precise);
        for method in [Method::Mmap, Method::MmapOpt] {
            assert_eq!(scan_path(method, f.path(), chunk).unwrap().result, precise);
        }
    }

    #[test]
    fn mapped_zero_extends_partial_tail_word() {
        let data = pattern(12);
        let f = file_with(&data);

        let mut tail = [0u8; 8];
        tail[..4].copy_from_slice(&data[8..]);
        let expected = word(&data[..8]) ^ i64::from_ne_bytes(tail);

        for method in [Method::Mmap, Method::MmapOpt] {
            let scan = scan_path(method, f.path(), CHUNK_SIZE).unwrap();
            assert_eq!(scan.result, expected, "{method}");
            assert_eq!(scan.chunks, 1);
            assert_eq!(scan.reads, 0);
        }
    }

    #[test]
    fn repeated_scans_agree() {
        let data = pattern(3 * 1000 + 5);
        let f = file_with(&data);
        for method in Method::ALL {
            let first = scan_path(method, f.path(), 1000).unwrap();
            let second = scan_path(method, f.path(), 1000).unwrap();
            assert_eq!(first, second, "{method}");
        }
    }

    #[test]
    fn rejects_unaligned_chunk_size() {
        let f = file_with(&pattern(16));
        for size in [0, 7, 12] {
            assert!(matches!(
                scan_path(Method::Read, f.path(), size),
                Err(ScanError::ChunkSize(s)) if s == size
            ));
        }
    }

    #[test]
    fn missing_file_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.bin");
        for method in Method::ALL {
            let err = scan_path(method, &path, CHUNK_SIZE).unwrap_err();
            assert!(matches!(err, ScanError::Open { .. }), "{method}: {err}");
        }
    }

    #[test]
    fn method_names_round_trip_through_clap() {
        use clap::ValueEnum;

        for method in Method::ALL {
            assert_eq!(Method::from_str(method.name(), false), Ok(method));
        }
        assert!(Method::from_str("foo", false).is_err());
    }
}
