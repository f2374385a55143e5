pub(crate) mod bucketing;
pub(crate) mod builder;
mod functions;
mod row;
pub(crate) mod stats;

pub use bucketing::{aggregate, aggregate_with, Aggregator};
pub use builder::TimeSeriesQuery;
pub use functions::{Avg, Count, Max, Min, Sum};
pub use row::TimeSeriesRow;
pub use stats::SensorStats;

use crate::Value;

/// Running state of one sensor type inside one time bucket.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Bucket {
    /// Accumulated value
    pub value: Value,

    /// Number of readings folded into `value`
    pub len: u64,
}

/// How the values of one bucket are reduced to a single number.
///
/// A bucket is seeded with `init` on its first value, every further value
/// goes through `transform`, and `finish` produces the emitted value
/// (defaults: identity, addition, identity).
pub trait Aggregation {
    /// Seeds a bucket from its first value.
    fn init(value: Value) -> Value {
        value
    }

    /// Folds another value into the accumulator.
    fn transform(accu: Value, x: Value) -> Value {
        accu + x
    }

    /// Produces the bucket's final value.
    fn finish(bucket: &Bucket) -> Value {
        bucket.value
    }
}
