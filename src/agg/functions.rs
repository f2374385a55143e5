//! Per-bucket reductions.

use super::{Aggregation, Bucket};
use crate::Value;

/// Arithmetic mean of the values in a bucket.
///
/// This is what the dashboard charts.
#[derive(Clone, Copy, Debug, Default)]
pub struct Avg;

impl Aggregation for Avg {
    #[allow(clippy::cast_precision_loss)]
    fn finish(bucket: &Bucket) -> Value {
        bucket.value / bucket.len as Value
    }
}

/// Sum of the values in a bucket.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sum;

impl Aggregation for Sum {}

/// Number of readings in a bucket.
#[derive(Clone, Copy, Debug, Default)]
pub struct Count;

impl Aggregation for Count {
    #[allow(clippy::cast_precision_loss)]
    fn finish(bucket: &Bucket) -> Value {
        bucket.len as Value
    }
}

/// Smallest value in a bucket.
#[derive(Clone, Copy, Debug, Default)]
pub struct Min;

impl Aggregation for Min {
    fn transform(accu: Value, x: Value) -> Value {
        accu.min(x)
    }
}

/// Largest value in a bucket.
#[derive(Clone, Copy, Debug, Default)]
pub struct Max;

impl Aggregation for Max {
    fn transform(accu: Value, x: Value) -> Value {
        accu.max(x)
    }
}
