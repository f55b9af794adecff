use crate::common::io::page_size;
use crate::error::BrcError;
use crate::reader::ReadStrategy;

/// Default chunk size ceiling for [`ReadStrategy::Read`]: 64 MiB.
pub const MAX_READ_CHUNK_SIZE: u64 = 64 * 1024 * 1024;

/// Everything the pipeline needs besides the input path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Worker threads in the aggregation pool.
    pub workers: usize,
    /// Target chunk size in bytes. `None` splits the file into one chunk per
    /// worker, at most [`MAX_READ_CHUNK_SIZE`] when reading into buffers.
    pub chunk_size: Option<u64>,
    pub strategy: ReadStrategy,
    /// Alignment for mapping offsets. Must be a power of two.
    pub page_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            chunk_size: None,
            strategy: ReadStrategy::default(),
            page_size: page_size(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), BrcError> {
        if self.workers == 0 {
            return Err(BrcError::Config("worker count must be at least 1".into()));
        }
        if self.chunk_size == Some(0) {
            return Err(BrcError::Config("chunk size must be at least 1 byte".into()));
        }
        if !self.page_size.is_power_of_two() {
            return Err(BrcError::Config(format!(
                "page size {} is not a power of two",
                self.page_size
            )));
        }
        Ok(())
    }

    /// Chunk size actually used for a file of `file_size` bytes.
    ///
    /// Without an explicit size the file is split into one chunk per worker.
    /// The read strategy holds every in-flight chunk on the heap, so its
    /// default is capped at [`MAX_READ_CHUNK_SIZE`].
    pub fn effective_chunk_size(&self, file_size: u64) -> u64 {
        match self.chunk_size {
            Some(n) => n,
            None => {
                let per_worker = file_size.div_ceil(self.workers.max(1) as u64).max(1);
                match self.strategy {
                    ReadStrategy::Mmap => per_worker,
                    ReadStrategy::Read => per_worker.min(MAX_READ_CHUNK_SIZE),
                }
            }
        }
    }
}

/// Number of CPUs available to this process.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
