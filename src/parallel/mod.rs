pub mod batch;
pub mod pool;

pub use batch::{compare_builds, compare_builds_with_cancel, rank_reports};
pub use pool::WorkerPool;
