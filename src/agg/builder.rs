use super::{bucketing::aggregate_with, Aggregation, Avg, TimeSeriesRow};
use crate::{range::TimeRange, sensor::SensorType, source::ReadingSource, time::now};
use chrono::{DateTime, Utc};
use std::marker::PhantomData;

/// Builder for a time series query.
///
/// Resolves the time range, fetches readings from the source
/// and buckets them.
pub struct TimeSeriesQuery<'a, S: ReadingSource, A: Aggregation = Avg> {
    phantom: PhantomData<A>,

    /// Where readings come from
    source: &'a S,

    /// Sensor types to include, empty means all
    types: Vec<SensorType>,

    /// Lookback window
    range: TimeRange,

    /// Explicit start, overrides `range`
    start: Option<DateTime<Utc>>,

    /// Anchor of the lookback window, defaults to the current time
    now: Option<DateTime<Utc>>,
}

impl<'a, S: ReadingSource, A: Aggregation> Clone for TimeSeriesQuery<'a, S, A> {
    fn clone(&self) -> Self {
        Self {
            phantom: PhantomData,
            source: self.source,
            types: self.types.clone(),
            range: self.range,
            start: self.start,
            now: self.now,
        }
    }
}

impl<'a, S: ReadingSource> TimeSeriesQuery<'a, S> {
    pub(crate) fn new(source: &'a S) -> Self {
        Self {
            phantom: PhantomData,
            source,
            types: Vec::new(),
            range: TimeRange::default(),
            start: None,
            now: None,
        }
    }
}

impl<'a, S: ReadingSource, A: Aggregation> TimeSeriesQuery<'a, S, A> {
    /// Restricts the query to the given sensor types.
    ///
    /// An empty list (the default) includes all types.
    #[must_use]
    pub fn types(mut self, types: &[SensorType]) -> Self {
        types.clone_into(&mut self.types);
        self
    }

    /// Sets the lookback window from a token (`24h`, `7d`, `30d`, `1y`).
    ///
    /// Unknown tokens mean `24h`.
    #[must_use]
    pub fn range(mut self, token: &str) -> Self {
        self.range = TimeRange::lenient(token);
        self
    }

    /// Sets the lookback window.
    #[must_use]
    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }

    /// Sets an explicit start, ignoring the lookback window.
    #[must_use]
    pub fn start(mut self, ts: DateTime<Utc>) -> Self {
        self.start = Some(ts);
        self
    }

    /// Anchors the lookback window at `ts` instead of the current time.
    #[must_use]
    pub fn now(mut self, ts: DateTime<Utc>) -> Self {
        self.now = Some(ts);
        self
    }

    /// Reduces buckets with another aggregation (default: [`Avg`]).
    #[must_use]
    pub fn aggregation<B: Aggregation>(self) -> TimeSeriesQuery<'a, S, B> {
        TimeSeriesQuery {
            phantom: PhantomData,
            source: self.source,
            types: self.types,
            range: self.range,
            start: self.start,
            now: self.now,
        }
    }

    /// The instant readings are fetched from.
    #[must_use]
    pub fn resolved_start(&self) -> DateTime<Utc> {
        self.start
            .unwrap_or_else(|| self.range.start(self.now.unwrap_or_else(now)))
    }

    /// Runs the query.
    ///
    /// # Errors
    ///
    /// Returns error if the source failed, or a reading was invalid.
    pub fn collect(self) -> crate::Result<Vec<TimeSeriesRow>> {
        let start = self.resolved_start();

        log::debug!(
            "Querying time series [{start}..] for types {:?} ({})",
            self.types,
            self.range,
        );

        let readings = self.source.readings_since(start, &self.types)?;
        let rows = aggregate_with::<A, _>(&readings)?;

        Ok(rows)
    }
}
