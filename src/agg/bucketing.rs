use super::{Aggregation, Avg, Bucket, TimeSeriesRow};
use crate::error::{ValidationError, ValidationErrorKind};
use crate::{reading::Reading, sensor::SensorType, time::truncate, Value};
use chrono::{DateTime, Utc};
use std::marker::PhantomData;

/// Per sensor type buckets of one time slot.
#[derive(Clone, Debug, Default)]
pub(crate) struct Accumulator {
    cells: [Option<Bucket>; SensorType::ALL.len()],
}

impl Accumulator {
    pub(crate) fn push<A: Aggregation>(&mut self, sensor_type: SensorType, value: Value) {
        // NOTE: Index is in bounds, there is one cell per sensor type
        #[allow(clippy::indexing_slicing)]
        let cell = &mut self.cells[sensor_type.index()];

        match cell {
            Some(bucket) => {
                bucket.len += 1;
                bucket.value = A::transform(bucket.value, value);
            }
            None => {
                *cell = Some(Bucket {
                    value: A::init(value),
                    len: 1,
                });
            }
        }
    }

    /// Final value per sensor type that received at least one reading.
    pub(crate) fn finish<A: Aggregation>(&self) -> impl Iterator<Item = (SensorType, Value)> + '_ {
        SensorType::ALL
            .into_iter()
            .zip(&self.cells)
            .filter_map(|(sensor_type, cell)| cell.as_ref().map(|b| (sensor_type, A::finish(b))))
    }
}

/// Groups readings into 15-minute buckets and reduces each
/// (bucket, sensor type) pair with `A`.
///
/// Readings may be pushed in any order. The aggregator does not
/// filter, every valid reading it is given is counted.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use streetpulse::{agg::Aggregator, Reading, SensorType};
///
/// let at = |m| Utc.with_ymd_and_hms(2024, 5, 1, 10, m, 0).unwrap();
///
/// let mut aggregator: Aggregator = Aggregator::default();
/// aggregator.push(&Reading::new("t-1", SensorType::Traffic, 10.0, at(2)))?;
/// aggregator.push(&Reading::new("t-1", SensorType::Traffic, 20.0, at(7)))?;
///
/// let rows = aggregator.finish();
/// assert_eq!(1, rows.len());
/// assert_eq!(Some(15.0), rows[0].get(SensorType::Traffic));
///
/// # Ok::<(), streetpulse::ValidationError>(())
/// ```
pub struct Aggregator<A: Aggregation = Avg> {
    buckets: crate::HashMap<DateTime<Utc>, Accumulator>,

    /// Number of readings seen so far, used to identify bad records
    seen: usize,

    phantom: PhantomData<A>,
}

impl<A: Aggregation> Default for Aggregator<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Aggregation> Aggregator<A> {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: crate::HashMap::default(),
            seen: 0,
            phantom: PhantomData,
        }
    }

    /// Number of distinct buckets seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if no bucket was opened yet.
    ///
    /// Rejected readings do not open a bucket.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Folds a reading into its bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not finite or the timestamp cannot be bucketed.
    /// No bucket is modified in that case.
    pub fn push(&mut self, reading: &Reading) -> Result<(), ValidationError> {
        let index = self.seen;
        self.seen += 1;

        if !reading.value.is_finite() {
            return Err(ValidationError::new(
                index,
                Some(&reading.sensor_id),
                ValidationErrorKind::NonFiniteValue(reading.value),
            ));
        }

        let Some(bucket_time) = truncate(&reading.timestamp) else {
            return Err(ValidationError::new(
                index,
                Some(&reading.sensor_id),
                ValidationErrorKind::InvalidTimestamp(reading.timestamp.to_string()),
            ));
        };

        self.buckets
            .entry(bucket_time)
            .or_insert_with(|| {
                log::trace!("opening bucket {bucket_time}");
                Accumulator::default()
            })
            .push::<A>(reading.sensor_type, reading.value);

        Ok(())
    }

    /// Finalizes all buckets, returning rows sorted by time.
    #[must_use]
    pub fn finish(self) -> Vec<TimeSeriesRow> {
        let mut rows = self
            .buckets
            .into_iter()
            .map(|(timestamp, accu)| TimeSeriesRow::new(timestamp, accu.finish::<A>()))
            .collect::<Vec<_>>();

        // NOTE: Bucket times are unique map keys, so the order is strict
        rows.sort_unstable_by_key(|row| row.timestamp);

        log::debug!("aggregated {} readings into {} rows", self.seen, rows.len());

        rows
    }
}

/// Averages readings per 15-minute bucket and sensor type.
///
/// # Errors
///
/// Returns an error naming the first invalid reading; no partial result is returned.
pub fn aggregate<'a, I>(readings: I) -> Result<Vec<TimeSeriesRow>, ValidationError>
where
    I: IntoIterator<Item = &'a Reading>,
{
    aggregate_with::<Avg, I>(readings)
}

/// Like [`aggregate`], but reduces each bucket with `A`.
///
/// # Errors
///
/// Returns an error naming the first invalid reading; no partial result is returned.
pub fn aggregate_with<'a, A, I>(readings: I) -> Result<Vec<TimeSeriesRow>, ValidationError>
where
    A: Aggregation,
    I: IntoIterator<Item = &'a Reading>,
{
    let mut aggregator = Aggregator::<A>::new();

    for reading in readings {
        aggregator.push(reading)?;
    }

    Ok(aggregator.finish())
}
