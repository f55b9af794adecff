/// Use mimalloc as the global allocator for all binaries.
/// Every first sighting of a key in a chunk allocates a small boxed slice,
/// and the worker threads do so concurrently; mimalloc's thread-local
/// caches keep those allocations off a shared lock.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod aggregate;
pub mod common;
pub mod decimal;
pub mod error;
pub mod format;
pub mod merge;
pub mod pipeline;
pub mod planner;
pub mod reader;

pub use error::{BrcError, Stage};
