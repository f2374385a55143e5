use crate::error::{ValidationError, ValidationErrorKind};
use crate::reading::StoredReading;
use serde::{Deserialize, Serialize};

/// Category of a sensor.
///
/// Renders as (and parses from) the upper-case name, e.g. `TRAFFIC`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, std::hash::Hash, Debug)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorType {
    /// Light level, in lux
    Streetlight,

    /// Pedestrian count
    Pedestrian,

    /// Vehicle count
    Traffic,

    /// Air quality (PM2.5)
    Environmental,
}

impl SensorType {
    /// All sensor types, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Streetlight,
        Self::Pedestrian,
        Self::Traffic,
        Self::Environmental,
    ];

    /// Upper-case name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Streetlight => "STREETLIGHT",
            Self::Pedestrian => "PEDESTRIAN",
            Self::Traffic => "TRAFFIC",
            Self::Environmental => "ENVIRONMENTAL",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SensorType {
    type Err = ValidationErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationErrorKind::UnknownSensorType(s.to_owned()))
    }
}

/// Parses a comma-separated list of sensor types, e.g. `TRAFFIC,PEDESTRIAN`.
///
/// Empty entries are skipped, so an empty string yields an empty list
/// (meaning "all types" to the fetchers).
///
/// # Errors
///
/// Returns an error naming the position of the first unknown type.
pub fn parse_sensor_types(s: &str) -> Result<Vec<SensorType>, ValidationError> {
    s.split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .enumerate()
        .map(|(idx, name)| {
            name.parse::<SensorType>()
                .map_err(|kind| ValidationError::new(idx, None, kind))
        })
        .collect()
}

/// A physical sensor placed somewhere in the city.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    /// Unique ID
    pub id: String,

    /// Human readable name
    pub name: String,

    /// Sensor category
    #[serde(rename = "type")]
    pub sensor_type: SensorType,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Free-form description
    pub description: Option<String>,

    /// Operational status (`active`, `inactive`, ...)
    pub status: String,
}

impl Sensor {
    /// Returns `true` if the sensor's status is `active`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == DEFAULT_STATUS
    }
}

pub(crate) const DEFAULT_STATUS: &str = "active";

/// Input for creating a sensor.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSensor {
    /// Human readable name
    pub name: String,

    /// Sensor category
    #[serde(rename = "type")]
    pub sensor_type: SensorType,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,

    /// Operational status, defaults to `active`
    #[serde(default)]
    pub status: Option<String>,
}

impl NewSensor {
    /// Creates a sensor description with default status and no description.
    #[must_use]
    pub fn new<S: Into<String>>(
        name: S,
        sensor_type: SensorType,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            name: name.into(),
            sensor_type,
            latitude,
            longitude,
            description: None,
            status: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |field, reason: &str| {
            ValidationError::new(
                0,
                None,
                ValidationErrorKind::InvalidField {
                    field,
                    reason: reason.to_owned(),
                },
            )
        };

        if self.name.trim().is_empty() {
            return Err(ValidationError::new(
                0,
                None,
                ValidationErrorKind::MissingField("name"),
            ));
        }

        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(invalid("latitude", "must be within [-90, 90]"));
        }

        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(invalid("longitude", "must be within [-180, 180]"));
        }

        Ok(())
    }

    pub(crate) fn into_sensor(self, id: String) -> Sensor {
        Sensor {
            id,
            name: self.name,
            sensor_type: self.sensor_type,
            latitude: self.latitude,
            longitude: self.longitude,
            description: self.description,
            status: self.status.unwrap_or_else(|| DEFAULT_STATUS.to_owned()),
        }
    }
}

/// A sensor together with its most recent reading.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorWithLatestReading {
    /// The sensor
    #[serde(flatten)]
    pub sensor: Sensor,

    /// Its newest reading, if it ever reported one
    pub latest_reading: Option<StoredReading>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn sensor_type_names() {
        for t in SensorType::ALL {
            assert_eq!(Ok(t), t.as_str().parse::<SensorType>());
            assert_eq!(
                format!("\"{t}\""),
                serde_json::to_string(&t).expect("should serialize"),
            );
        }
    }

    #[test_log::test]
    fn sensor_type_unknown() {
        assert_eq!(
            Err(ValidationErrorKind::UnknownSensorType("traffic".into())),
            "traffic".parse::<SensorType>(),
        );
    }

    #[test_log::test]
    fn parse_type_list() {
        assert_eq!(
            vec![SensorType::Traffic, SensorType::Pedestrian],
            parse_sensor_types("TRAFFIC,,PEDESTRIAN,").expect("should parse"),
        );
        assert!(parse_sensor_types("").expect("should parse").is_empty());
    }

    #[test_log::test]
    fn parse_type_list_unknown() {
        let err = parse_sensor_types("TRAFFIC,NOISE").expect_err("should fail");
        assert_eq!(1, err.index);
        assert_eq!(ValidationErrorKind::UnknownSensorType("NOISE".into()), err.kind);
    }

    #[test_log::test]
    fn new_sensor_validation() {
        assert!(NewSensor::new("a", SensorType::Traffic, 37.4, -122.1)
            .validate()
            .is_ok());

        assert!(NewSensor::new(" ", SensorType::Traffic, 37.4, -122.1)
            .validate()
            .is_err());

        assert!(NewSensor::new("a", SensorType::Traffic, 91.0, -122.1)
            .validate()
            .is_err());

        assert!(NewSensor::new("a", SensorType::Traffic, 37.4, f64::NAN)
            .validate()
            .is_err());
    }

    #[test_log::test]
    fn sensor_json_shape() {
        let sensor = NewSensor::new("Traffic Sensor 1", SensorType::Traffic, 1.0, 2.0)
            .into_sensor("s-1".into());

        let json = serde_json::to_value(&sensor).expect("should serialize");
        assert_eq!("TRAFFIC", json["type"]);
        assert_eq!("active", json["status"]);
        assert!(sensor.is_active());
    }
}
