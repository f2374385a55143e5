use crate::error::{ValidationError, ValidationErrorKind};
use crate::sensor::{Sensor, SensorType};
use crate::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_UNIT: &str = "unit";

/// One timestamped observation, annotated with its sensor's type.
///
/// This is what the aggregator consumes.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    /// Sensor that produced the reading
    pub sensor_id: String,

    /// Type of that sensor
    pub sensor_type: SensorType,

    /// Observed value
    pub value: Value,

    /// Observation time
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Creates a reading.
    #[must_use]
    pub fn new<S: Into<String>>(
        sensor_id: S,
        sensor_type: SensorType,
        value: Value,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            sensor_type,
            value,
            timestamp,
        }
    }
}

/// A reading as it arrives over the wire, before validation.
///
/// ```
/// use streetpulse::{RawReading, SensorType};
///
/// let raw: RawReading = serde_json::from_str(r#"{
///     "sensorId": "s-1",
///     "sensorType": "TRAFFIC",
///     "value": 42.0,
///     "timestamp": "2024-05-01T10:02:00.000Z"
/// }"#)?;
///
/// let reading = raw.validate(0)?;
/// assert_eq!(SensorType::Traffic, reading.sensor_type);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReading {
    /// Sensor that produced the reading
    pub sensor_id: Option<String>,

    /// Upper-case sensor type name
    pub sensor_type: Option<String>,

    /// Observed value
    pub value: Option<Value>,

    /// RFC 3339 timestamp
    pub timestamp: Option<String>,
}

impl RawReading {
    /// Turns a wire record into a [`Reading`].
    ///
    /// `index` is the record's position in its input, used to identify it in errors.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is missing, the sensor type is unknown,
    /// the timestamp does not parse, or the value is not finite.
    pub fn validate(self, index: usize) -> Result<Reading, ValidationError> {
        let sensor_id = self.sensor_id.ok_or_else(|| {
            ValidationError::new(index, None, ValidationErrorKind::MissingField("sensorId"))
        })?;
        let fail = |kind: ValidationErrorKind| ValidationError::new(index, Some(&sensor_id), kind);

        let sensor_type = self
            .sensor_type
            .ok_or_else(|| fail(ValidationErrorKind::MissingField("sensorType")))?
            .parse::<SensorType>()
            .map_err(fail)?;

        let value = self
            .value
            .ok_or_else(|| fail(ValidationErrorKind::MissingField("value")))?;

        if !value.is_finite() {
            return Err(fail(ValidationErrorKind::NonFiniteValue(value)));
        }

        let timestamp = self
            .timestamp
            .ok_or_else(|| fail(ValidationErrorKind::MissingField("timestamp")))?;

        let timestamp = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|_| fail(ValidationErrorKind::InvalidTimestamp(timestamp.clone())))?
            .with_timezone(&Utc);

        Ok(Reading {
            sensor_id,
            sensor_type,
            value,
            timestamp,
        })
    }
}

/// Validates a batch of wire records, failing on the first bad one.
///
/// # Errors
///
/// Returns the first record's error; no partial result is returned.
pub fn validate_all<I: IntoIterator<Item = RawReading>>(
    raw: I,
) -> Result<Vec<Reading>, ValidationError> {
    raw.into_iter()
        .enumerate()
        .map(|(idx, r)| r.validate(idx))
        .collect()
}

/// Input for storing a reading.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
    /// Sensor that produced the reading
    pub sensor_id: String,

    /// Observed value
    pub value: Value,

    /// Observation time
    pub timestamp: DateTime<Utc>,

    /// Unit of the value, defaults to `unit`
    #[serde(default)]
    pub unit: Option<String>,
}

impl NewReading {
    /// Creates a reading without unit.
    #[must_use]
    pub fn new<S: Into<String>>(sensor_id: S, value: Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            value,
            timestamp,
            unit: None,
        }
    }

    /// Sets the unit.
    #[must_use]
    pub fn unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// A reading as kept by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReading {
    /// Sensor that produced the reading
    pub sensor_id: String,

    /// Observed value
    pub value: Value,

    /// Unit of the value
    pub unit: String,

    /// Observation time
    pub timestamp: DateTime<Utc>,
}

/// A stored reading together with its sensor.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingWithSensor {
    /// The reading
    #[serde(flatten)]
    pub reading: StoredReading,

    /// The sensor that produced it
    pub sensor: Sensor,
}
