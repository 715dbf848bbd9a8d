//! Parallel execution helpers: a Rayon pool wrapper for concurrent strategy
//! evaluation and batch-range splitting for chunked progress reporting.

pub mod batch;
pub mod pool;

pub use batch::batch_ranges;
pub use pool::WorkerPool;
