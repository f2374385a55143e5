use crate::{agg::builder::TimeSeriesQuery, reading::Reading, sensor::SensorType};
use chrono::{DateTime, Utc};

/// Something that can hand out readings for aggregation.
pub trait ReadingSource {
    /// Returns all readings with `timestamp >= start`, ordered by timestamp ascending.
    ///
    /// If `types` is not empty, only readings of sensors of those types are returned.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying store failed.
    fn readings_since(
        &self,
        start: DateTime<Utc>,
        types: &[SensorType],
    ) -> crate::Result<Vec<Reading>>;

    /// Starts building a time series query over this source.
    fn timeseries(&self) -> TimeSeriesQuery<'_, Self>
    where
        Self: Sized,
    {
        TimeSeriesQuery::new(self)
    }
}

/// Readings that are already in memory.
///
/// ```
/// use chrono::{TimeDelta, Utc};
/// use streetpulse::{MemorySource, Reading, ReadingSource, SensorType};
///
/// let now = Utc::now();
///
/// let source = MemorySource::new(vec![
///     Reading::new("t-1", SensorType::Traffic, 10.0, now - TimeDelta::days(2)),
///     Reading::new("t-1", SensorType::Traffic, 20.0, now - TimeDelta::hours(1)),
/// ]);
///
/// let rows = source.timeseries().range("24h").now(now).collect()?;
/// assert_eq!(1, rows.len());
/// assert_eq!(Some(20.0), rows[0].get(SensorType::Traffic));
///
/// # Ok::<(), streetpulse::Error>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemorySource {
    readings: Vec<Reading>,
}

impl MemorySource {
    /// Wraps a list of readings, in any order.
    #[must_use]
    pub fn new(mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.timestamp);
        Self { readings }
    }

    /// Adds a reading.
    pub fn push(&mut self, reading: Reading) {
        let idx = self
            .readings
            .partition_point(|r| r.timestamp <= reading.timestamp);
        self.readings.insert(idx, reading);
    }

    /// Number of readings held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Returns `true` if no readings are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl FromIterator<Reading> for MemorySource {
    fn from_iter<I: IntoIterator<Item = Reading>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl ReadingSource for MemorySource {
    fn readings_since(
        &self,
        start: DateTime<Utc>,
        types: &[SensorType],
    ) -> crate::Result<Vec<Reading>> {
        let idx = self.readings.partition_point(|r| r.timestamp < start);

        Ok(self
            .readings
            .get(idx..)
            .unwrap_or_default()
            .iter()
            .filter(|r| types.is_empty() || types.contains(&r.sensor_type))
            .cloned()
            .collect())
    }
}
