//! Shard merging and the end-of-run aggregation pipeline.

pub mod aggregator;
pub mod merger;

pub use aggregator::*;
pub use merger::*;
