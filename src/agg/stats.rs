use super::{bucketing::Accumulator, Avg};
use crate::error::{ValidationError, ValidationErrorKind};
use crate::{reading::Reading, sensor::Sensor, sensor::SensorType, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// Summary of a set of sensors and their readings in a period.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorStats {
    /// Number of sensors
    pub total_sensors: usize,

    /// Number of sensors with status `active`
    pub active_count: usize,

    /// Number of other sensors
    pub inactive_count: usize,

    /// Number of readings in the period
    pub readings_in_period: usize,

    /// Mean value per sensor type over the whole period
    pub averages: BTreeMap<SensorType, Value>,
}

impl SensorStats {
    /// Summarizes sensors and readings.
    ///
    /// Types without readings have no average.
    ///
    /// # Errors
    ///
    /// Returns an error if a reading's value is not finite.
    pub fn compute(sensors: &[Sensor], readings: &[Reading]) -> Result<Self, ValidationError> {
        let mut accu = Accumulator::default();

        for (idx, reading) in readings.iter().enumerate() {
            if !reading.value.is_finite() {
                return Err(ValidationError::new(
                    idx,
                    Some(&reading.sensor_id),
                    ValidationErrorKind::NonFiniteValue(reading.value),
                ));
            }

            accu.push::<Avg>(reading.sensor_type, reading.value);
        }

        let active_count = sensors.iter().filter(|s| s.is_active()).count();

        Ok(Self {
            total_sensors: sensors.len(),
            active_count,
            inactive_count: sensors.len() - active_count,
            readings_in_period: readings.len(),
            averages: accu.finish::<Avg>().collect(),
        })
    }
}
