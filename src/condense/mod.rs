//! Historical condensation of result values.
//!
//! - `accumulator` - per-key streaming statistics and retention
//! - `aggregator` - the shared, lock-guarded key space

mod accumulator;
mod aggregator;

pub use accumulator::{Accumulator, Moments, Partial, Retention};
pub use aggregator::Aggregator;
