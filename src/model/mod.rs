//! Result model: typed values, the grouping tree that owns them, and
//! condensed statistics attached to values after historical aggregation.
//!
//! - `value` - `ResultValue`, `RawValue`, `Condensed`, `MetricKey`
//! - `tree` - `ResultTree` arena of `TestGroup` nodes
//! - `detect` - `ContentDetected` column flags for renderers

mod detect;
mod tree;
mod value;

pub use detect::ContentDetected;
pub use tree::{GroupId, Node, ResultTree, TestGroup, ValueId};
pub use value::{
    Comparison, Condensed, MetricKey, MetricRow, NumericStats, PassPolicy, RawValue, ResultValue, ValueKind, ValueRole,
};

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;
