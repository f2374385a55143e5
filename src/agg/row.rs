use crate::{sensor::SensorType, time::format_iso, Value};
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// One point of the aggregated time series.
///
/// Holds a value for each sensor type that had readings in the bucket,
/// types without readings are absent (not zero).
///
/// Serializes as a flat object:
///
/// ```json
/// { "timestamp": "2024-05-01T09:00:00.000Z", "TRAFFIC": 50.0, "PEDESTRIAN": 5.0 }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeriesRow {
    /// Start of the bucket
    pub timestamp: DateTime<Utc>,

    values: Vec<(SensorType, Value)>,
}

impl TimeSeriesRow {
    pub(crate) fn new<I: IntoIterator<Item = (SensorType, Value)>>(
        timestamp: DateTime<Utc>,
        values: I,
    ) -> Self {
        Self {
            timestamp,
            values: values.into_iter().collect(),
        }
    }

    /// Value of the given sensor type, if it had readings in this bucket.
    #[must_use]
    pub fn get(&self, sensor_type: SensorType) -> Option<Value> {
        self.values
            .iter()
            .find(|(t, _)| *t == sensor_type)
            .map(|(_, v)| *v)
    }

    /// Iterates over the sensor types present in this bucket.
    pub fn iter(&self) -> impl Iterator<Item = (SensorType, Value)> + '_ {
        self.values.iter().copied()
    }

    /// Number of sensor types present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no sensor type is present.
    ///
    /// Never the case for rows produced by the aggregator.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for TimeSeriesRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("timestamp", &format_iso(&self.timestamp))?;

        for (sensor_type, value) in &self.values {
            map.serialize_entry(sensor_type.as_str(), value)?;
        }

        map.end()
    }
}
