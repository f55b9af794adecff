use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info};

use super::config::PipelineConfig;
use crate::aggregate::{StationMap, aggregate_chunk};
use crate::error::{BrcError, Stage};
use crate::format::format_results;
use crate::merge::merge_maps;
use crate::planner::{Chunk, plan_chunks, plan_with};
use crate::reader::ChunkReader;

/// Sizes and phase timings of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub file_size: u64,
    pub chunk_size: u64,
    pub chunks: usize,
    pub workers: usize,
    pub stations: usize,
    pub plan: Duration,
    pub aggregate: Duration,
    pub merge: Duration,
}

/// Final map of a run plus its statistics.
#[derive(Debug)]
pub struct Aggregation {
    pub stations: StationMap,
    pub stats: RunStats,
}

/// Plan, aggregate in parallel, merge.
///
/// The first failing chunk aborts the run; no partial result is returned.
pub fn aggregate_file(path: &Path, config: &PipelineConfig) -> Result<Aggregation, BrcError> {
    config.validate()?;

    let started = Instant::now();
    let reader = ChunkReader::open(path, config.strategy, Some(config.page_size))?;
    let file_size = reader.file_size();
    let chunk_size = config.effective_chunk_size(file_size);
    let chunks = plan_chunks(path, file_size, chunk_size)?;
    let plan = started.elapsed();
    info!(
        phase = "plan",
        file_size,
        chunk_size,
        chunks = chunks.len(),
        elapsed_ms = plan.as_millis() as u64,
        "planned chunks"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("fbrc-worker-{i}"))
        .build()?;
    let started = Instant::now();
    let locals = pool.install(|| {
        chunks
            .par_iter()
            .map(|&chunk| process_chunk(&reader, chunk))
            .collect::<Result<Vec<_>, _>>()
    })?;
    let aggregate = started.elapsed();
    info!(
        phase = "aggregate",
        workers = config.workers,
        strategy = ?config.strategy,
        elapsed_ms = aggregate.as_millis() as u64,
        "all chunks aggregated"
    );

    let started = Instant::now();
    let stations = merge_maps(locals);
    let merge = started.elapsed();
    info!(
        phase = "merge",
        stations = stations.len(),
        elapsed_ms = merge.as_millis() as u64,
        "merged local maps"
    );

    let stats = RunStats {
        file_size,
        chunk_size,
        chunks: chunks.len(),
        workers: config.workers,
        stations: stations.len(),
        plan,
        aggregate,
        merge,
    };
    Ok(Aggregation { stations, stats })
}

/// Read one chunk and aggregate it. The chunk bytes are released on return.
pub fn process_chunk(reader: &ChunkReader, chunk: Chunk) -> Result<StationMap, BrcError> {
    let data = reader.read(chunk)?;
    let map = aggregate_chunk(&data, chunk.start)?;
    debug!(
        start = chunk.start,
        end = chunk.end,
        strategy = ?reader.strategy(),
        keys = map.len(),
        "chunk aggregated"
    );
    Ok(map)
}

/// Run the whole pipeline and render its output line (without newline).
pub fn run(path: &Path, config: &PipelineConfig) -> Result<String, BrcError> {
    let result = aggregate_file(path, config)?;
    Ok(format_results(&result.stations))
}

/// Aggregate an in-memory buffer split into chunks of about `chunk_size`
/// bytes, on the global rayon pool.
pub fn aggregate_bytes(data: &[u8], chunk_size: u64) -> Result<StationMap, BrcError> {
    if chunk_size == 0 {
        return Err(BrcError::Config("chunk size must be at least 1 byte".into()));
    }
    let chunks = plan_with(&mut Cursor::new(data), data.len() as u64, chunk_size)
        .map_err(|e| BrcError::io(Stage::Plan, "<memory>", e))?;
    let locals = chunks
        .par_iter()
        .map(|c| aggregate_chunk(&data[c.start as usize..c.end as usize], c.start))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge_maps(locals))
}
