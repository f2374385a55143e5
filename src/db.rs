use crate::agg::{SensorStats, TimeSeriesQuery};
use crate::db_builder::{Builder, Limits};
use crate::error::{ValidationError, ValidationErrorKind};
use crate::key::ReadingKey;
use crate::reading::{NewReading, Reading, ReadingWithSensor, StoredReading, DEFAULT_UNIT};
use crate::sensor::{NewSensor, Sensor, SensorType, SensorWithLatestReading};
use crate::{range::TimeRange, source::ReadingSource};
use chrono::{DateTime, Utc};
use fjall::{CompressionType, PartitionCreateOptions, TxKeyspace, TxPartition};
use std::path::Path;

const SENSORS_PARTITION: &str = "_streetpulse#v1#sensors";
const READINGS_PARTITION: &str = "_streetpulse#v1#readings";
const LATEST_PARTITION: &str = "_streetpulse#v1#latest";

/// An embedded store of sensors and their readings.
///
/// ```
/// # let dir = tempfile::tempdir()?;
/// use chrono::Utc;
/// use streetpulse::{Database, NewReading, NewSensor, SensorType};
///
/// let db = Database::new(&dir)?;
///
/// let sensor = db.create_sensor(NewSensor::new(
///     "Traffic Sensor 1",
///     SensorType::Traffic,
///     37.4419,
///     -122.1430,
/// ))?;
///
/// db.write(NewReading::new(&sensor.id, 42.0, Utc::now()).unit("vehicles"))?;
///
/// let series = db
///   .timeseries()
///   .types(&[SensorType::Traffic])
///   .range("24h")
///   .collect()?;
///
/// println!("{}", serde_json::to_string_pretty(&series)?);
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Database {
    keyspace: TxKeyspace,

    /// Sensor ID => sensor (JSON)
    sensors: TxPartition,

    /// [`ReadingKey`] => reading (JSON)
    readings: TxPartition,

    /// Sensor ID => [`ReadingKey`] of its newest reading
    latest: TxPartition,

    limits: Limits,
}

impl Database {
    /// Creates a new database builder to create or open a reading store at `path`.
    #[must_use]
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Creates or recovers a reading store with default settings.
    ///
    /// # Errors
    ///
    /// Returns error if an I/O error occurred.
    pub fn new<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        Self::builder().open(path)
    }

    pub(crate) fn from_keyspace(keyspace: TxKeyspace, limits: Limits) -> crate::Result<Self> {
        let sensors = keyspace.open_partition(
            SENSORS_PARTITION,
            PartitionCreateOptions::default()
                .block_size(4_096)
                .compression(CompressionType::Lz4)
                .max_memtable_size(8_000_000),
        )?;

        let readings = keyspace.open_partition(
            READINGS_PARTITION,
            PartitionCreateOptions::default()
                .block_size(64_000)
                .compression(CompressionType::Lz4),
        )?;

        let latest = keyspace.open_partition(
            LATEST_PARTITION,
            PartitionCreateOptions::default()
                .block_size(4_096)
                .max_memtable_size(8_000_000),
        )?;

        log::debug!("opened reading store, limits: {limits:?}");

        Ok(Self {
            keyspace,
            sensors,
            readings,
            latest,
            limits,
        })
    }

    fn new_sensor_id() -> String {
        format!("{:016x}", rand::random::<u64>())
    }

    /// Registers a new sensor.
    ///
    /// # Errors
    ///
    /// Returns error if the sensor is invalid, or an I/O error occurred.
    pub fn create_sensor(&self, sensor: NewSensor) -> crate::Result<Sensor> {
        sensor.validate()?;

        let mut id = Self::new_sensor_id();
        while self.sensors.contains_key(&id)? {
            id = Self::new_sensor_id();
        }

        let sensor = sensor.into_sensor(id);
        log::trace!("creating sensor {:?} ({})", sensor.id, sensor.sensor_type);

        let mut tx = self.keyspace.write_tx();
        tx.insert(&self.sensors, sensor.id.as_str(), serde_json::to_vec(&sensor)?);
        tx.commit()?;

        Ok(sensor)
    }

    /// Returns a sensor by ID.
    ///
    /// # Errors
    ///
    /// Returns error if an I/O error occurred.
    pub fn sensor(&self, id: &str) -> crate::Result<Option<Sensor>> {
        self.sensors
            .get(id)?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(Into::into))
            .transpose()
    }

    fn all_sensors(&self) -> crate::Result<crate::HashMap<String, Sensor>> {
        self.sensors
            .inner()
            .iter()
            .map(|kv| {
                let (_, v) = kv?;
                let sensor: Sensor = serde_json::from_slice(&v)?;
                Ok((sensor.id.clone(), sensor))
            })
            .collect()
    }

    /// Lists sensors sorted by name, each with its newest reading.
    ///
    /// If `types` is not empty, only sensors of those types are listed.
    ///
    /// # Errors
    ///
    /// Returns error if an I/O error occurred.
    pub fn sensors(&self, types: &[SensorType]) -> crate::Result<Vec<SensorWithLatestReading>> {
        let mut sensors = self
            .all_sensors()?
            .into_values()
            .filter(|s| types.is_empty() || types.contains(&s.sensor_type))
            .collect::<Vec<_>>();

        sensors.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));

        sensors
            .into_iter()
            .map(|sensor| {
                let latest_reading = self.latest_reading(&sensor.id)?;
                Ok(SensorWithLatestReading {
                    sensor,
                    latest_reading,
                })
            })
            .collect()
    }

    fn latest_reading(&self, sensor_id: &str) -> crate::Result<Option<StoredReading>> {
        let Some(key) = self.latest.get(sensor_id)? else {
            return Ok(None);
        };

        let Some(bytes) = self.readings.get(key)? else {
            log::warn!("newest reading of sensor {sensor_id:?} is missing");
            return Ok(None);
        };

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Stores a reading.
    ///
    /// A second reading of the same sensor at the same microsecond replaces the first.
    ///
    /// # Errors
    ///
    /// Returns error if the value is not finite, the sensor does not exist,
    /// or an I/O error occurred.
    pub fn write(&self, reading: NewReading) -> crate::Result<StoredReading> {
        if !reading.value.is_finite() {
            return Err(ValidationError::new(
                0,
                Some(&reading.sensor_id),
                ValidationErrorKind::NonFiniteValue(reading.value),
            )
            .into());
        }

        if !self.sensors.contains_key(&reading.sensor_id)? {
            return Err(crate::Error::SensorNotFound(reading.sensor_id));
        }

        let reading = StoredReading {
            sensor_id: reading.sensor_id,
            value: reading.value,
            unit: reading.unit.unwrap_or_else(|| DEFAULT_UNIT.to_owned()),
            timestamp: reading.timestamp,
        };

        let key = ReadingKey::format(&reading.timestamp, &reading.sensor_id);

        let mut tx = self.keyspace.write_tx();

        // NOTE: Readings may arrive out of order, only move the pointer forward
        let is_newest = match tx.get(&self.latest, reading.sensor_id.as_str())? {
            Some(prev) => *prev <= *key,
            None => true,
        };

        tx.insert(&self.readings, key.as_slice(), serde_json::to_vec(&reading)?);

        if is_newest {
            tx.insert(&self.latest, reading.sensor_id.as_str(), key.as_slice());
        }

        tx.commit()?;

        Ok(reading)
    }

    /// Lists the newest readings, newest first.
    ///
    /// If `sensor_ids` is not empty, only readings of those sensors are listed.
    /// `limit` defaults to 100 and is capped at 500 (see [`Builder`]).
    ///
    /// # Errors
    ///
    /// Returns error if an I/O error occurred.
    pub fn recent_readings(
        &self,
        sensor_ids: &[&str],
        limit: Option<usize>,
    ) -> crate::Result<Vec<ReadingWithSensor>> {
        let limit = limit
            .unwrap_or(self.limits.default_recent)
            .min(self.limits.max_recent);

        let sensors = self.all_sensors()?;
        let mut result = Vec::with_capacity(limit);

        for kv in self.readings.inner().iter().rev() {
            if result.len() >= limit {
                break;
            }

            let (_, v) = kv?;
            let reading: StoredReading = serde_json::from_slice(&v)?;

            if !sensor_ids.is_empty() && !sensor_ids.contains(&reading.sensor_id.as_str()) {
                continue;
            }

            let Some(sensor) = sensors.get(&reading.sensor_id) else {
                log::warn!("reading of unknown sensor {:?}", reading.sensor_id);
                continue;
            };

            result.push(ReadingWithSensor {
                sensor: sensor.clone(),
                reading,
            });
        }

        Ok(result)
    }

    /// Starts building a time series query over the stored readings.
    #[must_use]
    pub fn timeseries(&self) -> TimeSeriesQuery<'_, Self> {
        TimeSeriesQuery::new(self)
    }

    /// Summarizes sensors and their readings in the window ending at `now`.
    ///
    /// If `types` is not empty, only sensors of those types are counted.
    ///
    /// # Errors
    ///
    /// Returns error if an I/O error occurred.
    pub fn stats(
        &self,
        types: &[SensorType],
        range: TimeRange,
        now: DateTime<Utc>,
    ) -> crate::Result<SensorStats> {
        let sensors = self
            .all_sensors()?
            .into_values()
            .filter(|s| types.is_empty() || types.contains(&s.sensor_type))
            .collect::<Vec<_>>();

        let readings = self.readings_since(range.start(now), types)?;

        Ok(SensorStats::compute(&sensors, &readings)?)
    }
}

impl ReadingSource for Database {
    fn readings_since(
        &self,
        start: DateTime<Utc>,
        types: &[SensorType],
    ) -> crate::Result<Vec<Reading>> {
        let sensor_types = self
            .all_sensors()?
            .into_iter()
            .map(|(id, sensor)| (id, sensor.sensor_type))
            .collect::<crate::HashMap<_, _>>();

        let mut result = vec![];

        for kv in self.readings.inner().range(ReadingKey::encode_ts(&start)..) {
            let (_, v) = kv?;
            let reading: StoredReading = serde_json::from_slice(&v)?;

            // NOTE: Keys only have microsecond precision
            if reading.timestamp < start {
                continue;
            }

            let Some(&sensor_type) = sensor_types.get(&reading.sensor_id) else {
                log::warn!("reading of unknown sensor {:?}", reading.sensor_id);
                continue;
            };

            if !types.is_empty() && !types.contains(&sensor_type) {
                continue;
            }

            result.push(Reading {
                sensor_id: reading.sensor_id,
                sensor_type,
                value: reading.value,
                timestamp: reading.timestamp,
            });
        }

        log::debug!("fetched {} readings since {start}", result.len());

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0)
            .single()
            .expect("should be valid")
    }

    fn sensor(db: &Database, name: &str, sensor_type: SensorType) -> crate::Result<Sensor> {
        db.create_sensor(NewSensor::new(name, sensor_type, 37.4419, -122.1430))
    }

    #[test_log::test]
    fn db_create_and_get_sensor() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Database::new(&dir)?;

        let created = sensor(&db, "Traffic Sensor 1", SensorType::Traffic)?;
        assert_eq!("active", created.status);
        assert_eq!(Some(created.clone()), db.sensor(&created.id)?);
        assert_eq!(None, db.sensor("nope")?);

        assert!(matches!(
            db.create_sensor(NewSensor::new("", SensorType::Traffic, 0.0, 0.0)),
            Err(crate::Error::Validation(_)),
        ));

        Ok(())
    }

    #[test_log::test]
    fn db_write_requires_sensor() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Database::new(&dir)?;

        assert!(matches!(
            db.write(NewReading::new("ghost", 1.0, now())),
            Err(crate::Error::SensorNotFound(id)) if id == "ghost",
        ));

        let s = sensor(&db, "a", SensorType::Environmental)?;
        assert!(matches!(
            db.write(NewReading::new(&s.id, f64::NAN, now())),
            Err(crate::Error::Validation(_)),
        ));

        let stored = db.write(NewReading::new(&s.id, 25.0, now()))?;
        assert_eq!("unit", stored.unit);

        Ok(())
    }

    #[test_log::test]
    fn db_timeseries() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Database::new(&dir)?;

        let traffic = sensor(&db, "t", SensorType::Traffic)?;
        let pedestrian = sensor(&db, "p", SensorType::Pedestrian)?;

        let base = now() - TimeDelta::hours(2);

        for (sensor, value, offset) in [
            (&traffic, 10.0, 2),
            (&traffic, 20.0, 7),
            (&traffic, 100.0, 20),
            (&pedestrian, 5.0, 1),
        ] {
            db.write(NewReading::new(
                &sensor.id,
                value,
                base + TimeDelta::minutes(offset),
            ))?;
        }

        // NOTE: Outside of the 24h window
        db.write(NewReading::new(&traffic.id, 1_000.0, now() - TimeDelta::days(2)))?;

        let rows = db.timeseries().range("24h").now(now()).collect()?;
        assert_eq!(2, rows.len());
        assert_eq!(base, rows[0].timestamp);
        assert_eq!(Some(15.0), rows[0].get(SensorType::Traffic));
        assert_eq!(Some(5.0), rows[0].get(SensorType::Pedestrian));
        assert_eq!(base + TimeDelta::minutes(15), rows[1].timestamp);
        assert_eq!(Some(100.0), rows[1].get(SensorType::Traffic));
        assert_eq!(None, rows[1].get(SensorType::Pedestrian));

        let rows = db
            .timeseries()
            .types(&[SensorType::Pedestrian])
            .range("7d")
            .now(now())
            .collect()?;
        assert_eq!(1, rows.len());
        assert_eq!(None, rows[0].get(SensorType::Traffic));

        let week = db.timeseries().range("7d").now(now()).collect()?;
        assert_eq!(3, week.len());
        assert_eq!(Some(1_000.0), week[0].get(SensorType::Traffic));

        Ok(())
    }

    #[test_log::test]
    fn db_recent_readings() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Database::builder()
            .default_recent_limit(3)
            .max_recent_limit(5)
            .open(&dir)?;

        let a = sensor(&db, "a", SensorType::Traffic)?;
        let b = sensor(&db, "b", SensorType::Streetlight)?;

        for minute in 0..10 {
            let s = if minute % 2 == 0 { &a } else { &b };
            db.write(NewReading::new(
                &s.id,
                f64::from(minute),
                now() + TimeDelta::minutes(minute.into()),
            ))?;
        }

        let recent = db.recent_readings(&[], None)?;
        assert_eq!(
            vec![9.0, 8.0, 7.0],
            recent.iter().map(|r| r.reading.value).collect::<Vec<_>>()
        );
        assert_eq!(b, recent[0].sensor);

        assert_eq!(5, db.recent_readings(&[], Some(1_000))?.len());

        let only_a = db.recent_readings(&[&a.id], Some(2))?;
        assert_eq!(
            vec![8.0, 6.0],
            only_a.iter().map(|r| r.reading.value).collect::<Vec<_>>()
        );

        Ok(())
    }

    #[test_log::test]
    fn db_sensors_with_latest_reading() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Database::new(&dir)?;

        let zulu = sensor(&db, "Zulu", SensorType::Traffic)?;
        let alpha = sensor(&db, "Alpha", SensorType::Traffic)?;
        let mike = sensor(&db, "Mike", SensorType::Pedestrian)?;

        db.write(NewReading::new(&zulu.id, 1.0, now() - TimeDelta::hours(1)))?;
        db.write(NewReading::new(&zulu.id, 2.0, now()))?;
        db.write(NewReading::new(&mike.id, 3.0, now()).unit("count"))?;

        let all = db.sensors(&[])?;
        assert_eq!(
            vec!["Alpha", "Mike", "Zulu"],
            all.iter().map(|s| s.sensor.name.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(alpha, all[0].sensor);
        assert_eq!(None, all[0].latest_reading);
        assert_eq!(Some(2.0), all[2].latest_reading.as_ref().map(|r| r.value));
        assert_eq!(
            Some("count"),
            all[1].latest_reading.as_ref().map(|r| r.unit.as_str())
        );

        let traffic = db.sensors(&[SensorType::Traffic])?;
        assert_eq!(2, traffic.len());

        Ok(())
    }

    #[test_log::test]
    fn db_latest_reading_with_silent_sensor() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Database::new(&dir)?;

        let a = sensor(&db, "a", SensorType::Traffic)?;
        let b = sensor(&db, "b", SensorType::Pedestrian)?;
        let c = sensor(&db, "c", SensorType::Environmental)?;
        let silent = sensor(&db, "d", SensorType::Streetlight)?;

        db.write(NewReading::new(&a.id, 1.0, now() - TimeDelta::hours(3)))?;
        db.write(NewReading::new(&a.id, 2.0, now()))?;

        // NOTE: Older reading arrives after the newer one
        db.write(NewReading::new(&a.id, 0.5, now() - TimeDelta::days(1)))?;

        db.write(NewReading::new(&b.id, 3.0, now() - TimeDelta::minutes(10)))?;
        db.write(NewReading::new(&c.id, 4.0, now() - TimeDelta::days(400)))?;

        let all = db.sensors(&[])?;
        let latest = all
            .iter()
            .map(|s| (s.sensor.id.as_str(), s.latest_reading.as_ref().map(|r| r.value)))
            .collect::<Vec<_>>();

        assert_eq!(
            vec![
                (a.id.as_str(), Some(2.0)),
                (b.id.as_str(), Some(3.0)),
                (c.id.as_str(), Some(4.0)),
                (silent.id.as_str(), None),
            ],
            latest,
        );

        Ok(())
    }

    #[test_log::test]
    fn db_readings_since_sub_microsecond_start() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Database::new(&dir)?;

        let s = sensor(&db, "a", SensorType::Traffic)?;
        let ts = now() - TimeDelta::hours(2);

        db.write(NewReading::new(&s.id, 1.0, ts))?;
        db.write(NewReading::new(&s.id, 2.0, ts + TimeDelta::microseconds(1)))?;

        let start = ts + TimeDelta::nanoseconds(500);
        let readings = db.readings_since(start, &[])?;

        assert!(readings.iter().all(|r| r.timestamp >= start));
        assert_eq!(
            vec![2.0],
            readings.iter().map(|r| r.value).collect::<Vec<_>>()
        );

        assert_eq!(2, db.readings_since(ts, &[])?.len());

        Ok(())
    }

    #[test_log::test]
    fn db_stats() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Database::new(&dir)?;

        let a = sensor(&db, "a", SensorType::Traffic)?;
        db.create_sensor(NewSensor {
            status: Some("inactive".into()),
            ..NewSensor::new("b", SensorType::Traffic, 0.0, 0.0)
        })?;

        db.write(NewReading::new(&a.id, 60.0, now() - TimeDelta::hours(1)))?;
        db.write(NewReading::new(&a.id, 90.0, now() - TimeDelta::hours(2)))?;
        db.write(NewReading::new(&a.id, 1.0, now() - TimeDelta::days(3)))?;

        let stats = db.stats(&[], TimeRange::Day, now())?;
        assert_eq!(2, stats.total_sensors);
        assert_eq!(1, stats.active_count);
        assert_eq!(1, stats.inactive_count);
        assert_eq!(2, stats.readings_in_period);
        assert_eq!(Some(&75.0), stats.averages.get(&SensorType::Traffic));

        let stats = db.stats(&[SensorType::Pedestrian], TimeRange::Day, now())?;
        assert_eq!(0, stats.total_sensors);
        assert!(stats.averages.is_empty());

        Ok(())
    }
}
