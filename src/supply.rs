//! Sources of fixed-size windows over a file.
//!
//! Both strategies hand the traversal a borrowed byte window per step, so
//! the supply is a lending iterator rather than an [`Iterator`].

use std::{fs::File, io::Read, path::Path};

use memmap2::{Mmap, MmapOptions};

use crate::advise::{advise_file_sequential, advise_map_sequential, release_map_range};
use crate::error::ScanError;

/// A finite, non-restartable stream of chunks.
pub trait ChunkSupply {
    /// The next window, or `None` once the source is exhausted.
    fn next_chunk(&mut self) -> Option<&[u8]>;

    /// Called once the window returned by the last [`next_chunk`] has been
    /// reduced.
    ///
    /// [`next_chunk`]: ChunkSupply::next_chunk
    fn release_chunk(&mut self) {}

    /// File bytes consumed so far.
    fn bytes(&self) -> u64;

    /// Blocking `read` calls issued so far.
    fn reads(&self) -> u64 {
        0
    }
}

fn open(path: &Path) -> Result<File, ScanError> {
    File::open(path).map_err(|source| ScanError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Blocking reads into a single reused scratch buffer.
///
/// Every successful read yields the *whole* buffer, not just the bytes the
/// read filled. A short final read therefore leaves bytes from the previous
/// chunk in the tail of the window, and they get reduced again. That skews
/// the result for files that are not a multiple of the chunk size; it is
/// kept so the numbers stay comparable with earlier runs of this benchmark.
pub struct BufferedChunks {
    file: File,
    buf: Box<[u8]>,
    reads: u64,
    bytes: u64,
    done: bool,
}

impl BufferedChunks {
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self, ScanError> {
        let file = open(path)?;
        advise_file_sequential(&file);

        Ok(BufferedChunks {
            file,
            buf: vec![0; chunk_size].into_boxed_slice(),
            reads: 0,
            bytes: 0,
            done: false,
        })
    }
}

impl ChunkSupply for BufferedChunks {
    fn next_chunk(&mut self) -> Option<&[u8]> {
        if self.done {
            return None;
        }

        self.reads += 1;
        match self.file.read(&mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => {
                self.bytes += n as u64;
                Some(&self.buf[..])
            }
            // A failed read ends the scan the same way end-of-file does.
            Err(e) => {
                log::debug!("read failed after {} bytes, stopping: {e}", self.bytes);
                self.done = true;
                None
            }
        }
    }

    fn bytes(&self) -> u64 {
        self.bytes
    }

    fn reads(&self) -> u64 {
        self.reads
    }
}

/// Fixed-size windows over a private, read-only mapping of the whole file.
///
/// The last window is clamped to the end of the file. Windows are released
/// back to the kernel with `MADV_FREE` as soon as they have been reduced.
pub struct MappedChunks {
    // Declared before `_file` so the mapping is torn down first.
    map: Option<Mmap>,
    _file: File,
    chunk_size: usize,
    offset: usize,
    current: Option<(usize, usize)>,
}

impl MappedChunks {
    /// Maps `path` and, if `sequential` is set, advises sequential access
    /// over the whole mapping before the first window is handed out.
    ///
    /// An empty file is never mapped (several platforms reject zero-length
    /// mappings); its supply is simply exhausted from the start.
    pub fn open(path: &Path, chunk_size: usize, sequential: bool) -> Result<Self, ScanError> {
        let file = open(path)?;

        let size = file
            .metadata()
            .map_err(|source| ScanError::Metadata {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        let len = usize::try_from(size).map_err(|_| ScanError::TooLarge {
            path: path.to_path_buf(),
            size,
        })?;
        log::debug!("mapping {} ({len} bytes)", path.display());

        let map = if len == 0 {
            None
        } else {
            // SAFETY: the file is opened read-only and mapped private; the
            // benchmark assumes nobody truncates it while the scan runs.
            let map = unsafe { MmapOptions::new().len(len).map_copy_read_only(&file) }
                .map_err(|source| ScanError::Map {
                    path: path.to_path_buf(),
                    source,
                })?;
            if sequential {
                advise_map_sequential(&map);
            }
            Some(map)
        };

        Ok(MappedChunks {
            map,
            _file: file,
            chunk_size,
            offset: 0,
            current: None,
        })
    }
}

impl ChunkSupply for MappedChunks {
    fn next_chunk(&mut self) -> Option<&[u8]> {
        let map = self.map.as_ref()?;
        if self.offset >= map.len() {
            return None;
        }

        let start = self.offset;
        let end = start.saturating_add(self.chunk_size).min(map.len());
        self.offset = end;
        self.current = Some((start, end - start));
        Some(&map[start..end])
    }

    fn release_chunk(&mut self) {
        if let (Some(map), Some((offset, len))) = (&self.map, self.current.take()) {
            release_map_range(map, offset, len);
        }
    }

    fn bytes(&self) -> u64 {
        self.offset as u64
    }
}
