use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use memmap2::Mmap;

/// Fallback when the platform cannot report its page size.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Mappings at least this large get MADV_HUGEPAGE.
const HUGEPAGE_THRESHOLD: usize = 2 * 1024 * 1024;

/// Open a file read-only with O_NOATIME on Linux to avoid atime inode writes.
/// O_NOATIME needs file ownership or CAP_FOWNER; on EPERM this retries
/// with a plain open.
#[cfg(target_os = "linux")]
pub fn open_noatime(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    match std::fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NOATIME)
        .open(path)
    {
        Ok(f) => Ok(f),
        Err(ref e) if e.raw_os_error() == Some(libc::EPERM) => File::open(path),
        Err(e) => Err(e),
    }
}

#[cfg(not(target_os = "linux"))]
pub fn open_noatime(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// OS page size, the alignment required for mapping offsets.
pub fn page_size() -> usize {
    #[cfg(unix)]
    {
        let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if n > 0 {
            return n as usize;
        }
    }
    DEFAULT_PAGE_SIZE
}

/// Hint the kernel that a chunk mapping is read once, front to back.
/// HUGEPAGE must come first: it only helps if set before any page faults.
pub fn advise_sequential(mmap: &Mmap) {
    #[cfg(target_os = "linux")]
    {
        if mmap.len() >= HUGEPAGE_THRESHOLD {
            let _ = mmap.advise(memmap2::Advice::HugePage);
        }
        let _ = mmap.advise(memmap2::Advice::Sequential);
        let _ = mmap.advise(memmap2::Advice::WillNeed);
    }
    #[cfg(not(target_os = "linux"))]
    let _ = (mmap, HUGEPAGE_THRESHOLD);
}

/// Read as many bytes as possible into buf, retrying on partial reads.
/// Returns less than `buf.len()` only at EOF.
/// Fast path: regular file reads usually return the full buffer on the first call.
#[inline]
pub fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let n = reader.read(buf)?;
    if n == buf.len() || n == 0 {
        return Ok(n);
    }
    // Slow path: partial read — retry to fill buffer (pipes, slow devices)
    let mut total = n;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
