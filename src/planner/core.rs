use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use memchr::memchr;

use crate::common::io::{open_noatime, read_full};
use crate::error::{BrcError, Stage};

/// Boundary scans read this much at a time past each proposed split point.
pub(crate) const SCAN_BUF_SIZE: usize = 4096;

/// Upper bound on chunk descriptors reserved up front.
const MAX_PREALLOC: u64 = 1 << 16;

/// A line-aligned byte range `[start, end)` of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: u64,
    pub end: u64,
}

impl Chunk {
    pub fn new(start: u64, end: u64) -> Self {
        Chunk { start, end }
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split the file at `path` into chunks of roughly `target_size` bytes,
/// each ending immediately after a `\n` (or at end of file).
pub fn plan_chunks(path: &Path, file_size: u64, target_size: u64) -> Result<Vec<Chunk>, BrcError> {
    let mut file = open_noatime(path).map_err(|e| BrcError::io(Stage::Plan, path, e))?;
    plan_with(&mut file, file_size, target_size).map_err(|e| BrcError::io(Stage::Plan, path, e))
}

/// Plan chunks over any seekable source of `file_size` bytes.
///
/// The result covers `[0, file_size)` with no gaps or overlaps; an empty
/// source yields no chunks. `target_size` must be non-zero.
pub fn plan_with<R: Read + Seek>(
    reader: &mut R,
    file_size: u64,
    target_size: u64,
) -> io::Result<Vec<Chunk>> {
    debug_assert!(target_size > 0);
    let target_size = target_size.max(1);
    let mut chunks = Vec::with_capacity((file_size / target_size + 1).min(MAX_PREALLOC) as usize);
    let mut buf = [0u8; SCAN_BUF_SIZE];
    let mut offset = 0u64;

    while offset < file_size {
        let next = offset.saturating_add(target_size).min(file_size);
        let end = if next < file_size {
            line_end_from(reader, &mut buf, next, file_size)?
        } else {
            file_size
        };
        chunks.push(Chunk::new(offset, end));
        offset = end;
    }
    Ok(chunks)
}

/// Position just past the first `\n` at or after `from`, or `file_size`
/// when the remainder of the file has no terminator.
fn line_end_from<R: Read + Seek>(
    reader: &mut R,
    buf: &mut [u8],
    from: u64,
    file_size: u64,
) -> io::Result<u64> {
    reader.seek(SeekFrom::Start(from))?;
    let mut pos = from;
    while pos < file_size {
        let want = buf.len().min((file_size - pos) as usize);
        let n = read_full(reader, &mut buf[..want])?;
        if n == 0 {
            // File shrank under us; treat what is left as one final record.
            break;
        }
        if let Some(i) = memchr(b'\n', &buf[..n]) {
            return Ok(pos + i as u64 + 1);
        }
        pos += n as u64;
    }
    Ok(file_size)
}
