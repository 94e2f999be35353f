//! Access-pattern hints for the kernel.
//!
//! Every hint here is advisory. The scan result must never depend on one of
//! them succeeding, so failures are logged and dropped. Targets that lack a
//! primitive get a no-op with the same signature.

use std::fs::File;

use memmap2::Mmap;

/// Tells the kernel the whole file will be read front to back.
///
/// Uses `posix_fadvise(SEQUENTIAL)`, which mostly matters for small chunks:
/// it widens the readahead window so 16 KiB reads keep pace with 1 MiB ones.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn advise_file_sequential(file: &File) {
    use std::os::fd::AsRawFd;

    // SAFETY: the descriptor is owned by `file` and stays open for the call.
    let rc = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, libc::POSIX_FADV_SEQUENTIAL) };
    if rc != 0 {
        log::trace!(
            "posix_fadvise(SEQUENTIAL) failed: {}",
            std::io::Error::from_raw_os_error(rc)
        );
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub fn advise_file_sequential(_file: &File) {}

/// Tells the kernel the whole mapping will be walked sequentially.
#[cfg(unix)]
pub fn advise_map_sequential(map: &Mmap) {
    if let Err(e) = map.advise(memmap2::Advice::Sequential) {
        log::trace!("madvise(SEQUENTIAL) over {} bytes failed: {e}", map.len());
    }
}

#[cfg(not(unix))]
pub fn advise_map_sequential(_map: &Mmap) {}

/// Lets the kernel drop the pages backing `map[offset..offset + len]`
/// without writeback.
///
/// `MADV_FREE` is only honoured for anonymous memory on some kernels; on a
/// private file mapping it may be rejected, which is fine.
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub fn release_map_range(map: &Mmap, offset: usize, len: usize) {
    debug_assert!(offset + len <= map.len());

    // SAFETY: the mapping is read-only and private, so discarding pages can
    // only cause them to be refaulted from the file. No slice into the
    // released range is held across this call.
    let res = unsafe { map.unchecked_advise_range(memmap2::UncheckedAdvice::Free, offset, len) };
    if let Err(e) = res {
        log::trace!("madvise(FREE) at {offset}+{len} failed: {e}");
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn release_map_range(_map: &Mmap, _offset: usize, _len: usize) {}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use memmap2::MmapOptions;

    use super::*;

    #[test]
    fn hints_leave_contents_untouched() {
        let mut f = tempfile::tempfile().unwrap();
        let data: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        f.write_all(&data).unwrap();

        advise_file_sequential(&f);

        let map = unsafe { MmapOptions::new().map_copy_read_only(&f).unwrap() };
        advise_map_sequential(&map);
        release_map_range(&map, 0, 4096);
        release_map_range(&map, 4096, map.len() - 4096);

        assert_eq!(&map[..], &data[..]);
    }
}
