use std::fs;
use std::io::{self, Seek, SeekFrom};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use crate::common::io::{self as fio, advise_sequential, open_noatime, read_full};
use crate::error::{BrcError, Stage};
use crate::planner::Chunk;

/// How chunk bytes are brought into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadStrategy {
    /// Map a page-aligned window over the chunk. Zero-copy.
    #[default]
    Mmap,
    /// Seek to the chunk start and read it into an owned buffer.
    Read,
}

/// The bytes of one chunk — either a mapped window or an owned Vec.
/// Dereferences to exactly the requested range; the page-alignment prefix
/// of a mapping is hidden behind `skip`.
pub enum ChunkData {
    Mmap { map: Mmap, skip: usize },
    Owned(Vec<u8>),
}

impl Deref for ChunkData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            ChunkData::Mmap { map, skip } => &map[*skip..],
            ChunkData::Owned(v) => v,
        }
    }
}

/// Hands out chunk slices of one input file.
///
/// Each `read` call opens its own handle, so workers never share a file
/// descriptor or a mapping. The handle is closed before `read` returns; a
/// mapping lives exactly as long as the returned `ChunkData`.
#[derive(Debug, Clone)]
pub struct ChunkReader {
    path: PathBuf,
    file_size: u64,
    strategy: ReadStrategy,
    page_size: u64,
}

impl ChunkReader {
    /// Size the regular file at `path` and prepare to read it with `strategy`.
    /// `page_size` must be a power of two; pass `None` for the OS page size.
    pub fn open(
        path: &Path,
        strategy: ReadStrategy,
        page_size: Option<usize>,
    ) -> Result<Self, BrcError> {
        // A pipe or device reports length 0; stat before open so a FIFO
        // without a writer is rejected instead of blocking.
        let metadata = fs::metadata(path).map_err(|e| BrcError::io(Stage::Read, path, e))?;
        if !metadata.file_type().is_file() {
            return Err(BrcError::io(
                Stage::Read,
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let file = open_noatime(path).map_err(|e| BrcError::io(Stage::Read, path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| BrcError::io(Stage::Read, path, e))?
            .len();
        let page_size = page_size.unwrap_or_else(fio::page_size);
        if !page_size.is_power_of_two() {
            return Err(BrcError::Config(format!(
                "page size {page_size} is not a power of two"
            )));
        }
        Ok(ChunkReader {
            path: path.to_path_buf(),
            file_size,
            strategy,
            page_size: page_size as u64,
        })
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn strategy(&self) -> ReadStrategy {
        self.strategy
    }

    /// Return exactly the bytes of `chunk`.
    pub fn read(&self, chunk: Chunk) -> Result<ChunkData, BrcError> {
        if chunk.start > chunk.end || chunk.end > self.file_size {
            return Err(BrcError::Range {
                start: chunk.start,
                end: chunk.end,
                file_size: self.file_size,
            });
        }
        if chunk.is_empty() {
            return Ok(ChunkData::Owned(Vec::new()));
        }
        match self.strategy {
            ReadStrategy::Mmap => self.map(chunk),
            ReadStrategy::Read => self.read_owned(chunk),
        }
    }

    /// Page-aligned start at or before `offset`.
    #[inline]
    fn align_down(&self, offset: u64) -> u64 {
        offset & !(self.page_size - 1)
    }

    fn map(&self, chunk: Chunk) -> Result<ChunkData, BrcError> {
        let file = open_noatime(&self.path).map_err(|e| self.io_err(e))?;
        let aligned = self.align_down(chunk.start);
        let skip = (chunk.start - aligned) as usize;
        let len = (chunk.end - aligned) as usize;
        // SAFETY: read-only mapping of a file this pipeline never writes.
        let map = unsafe { MmapOptions::new().offset(aligned).len(len).map(&file) }
            .map_err(|e| self.io_err(e))?;
        advise_sequential(&map);
        Ok(ChunkData::Mmap { map, skip })
    }

    fn read_owned(&self, chunk: Chunk) -> Result<ChunkData, BrcError> {
        let mut file = open_noatime(&self.path).map_err(|e| self.io_err(e))?;
        file.seek(SeekFrom::Start(chunk.start))
            .map_err(|e| self.io_err(e))?;
        let mut buf = vec![0u8; chunk.len() as usize];
        let n = read_full(&mut file, &mut buf).map_err(|e| self.io_err(e))?;
        if n < buf.len() {
            return Err(self.io_err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file ended at byte {} inside chunk", chunk.start + n as u64),
            )));
        }
        Ok(ChunkData::Owned(buf))
    }

    fn io_err(&self, e: io::Error) -> BrcError {
        BrcError::io(Stage::Read, &self.path, e)
    }
}
