//! Sensor reading store and time series aggregation for smart-city dashboards.
//!
//! Readings of streetlight, pedestrian, traffic and environmental sensors are
//! bucketed into fixed 15-minute windows and averaged per sensor type, producing
//! a sparse, time-ordered series that can be handed to a chart as JSON.
//!
//! The pipeline has three stages:
//!
//! - a [`TimeRange`] (`24h`, `7d`, `30d`, `1y`) resolves to a start instant
//! - a [`ReadingSource`] returns the readings since that instant
//! - the aggregator ([`agg::aggregate`]) buckets and averages them
//!
//! Readings can come from memory ([`MemorySource`]) or from the embedded
//! [`Database`], which uses <https://github.com/fjall-rs/fjall> as its storage engine.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use streetpulse::{agg::aggregate, Reading, SensorType};
//!
//! let at = |m| Utc.with_ymd_and_hms(2024, 5, 1, 10, m, 0).unwrap();
//!
//! let readings = [
//!     Reading::new("t-1", SensorType::Traffic, 10.0, at(2)),
//!     Reading::new("t-2", SensorType::Traffic, 20.0, at(7)),
//!     Reading::new("t-1", SensorType::Traffic, 100.0, at(20)),
//!     Reading::new("p-1", SensorType::Pedestrian, 5.0, at(1)),
//! ];
//!
//! let rows = aggregate(&readings)?;
//!
//! assert_eq!(
//!     r#"[{"timestamp":"2024-05-01T10:00:00.000Z","PEDESTRIAN":5.0,"TRAFFIC":15.0},{"timestamp":"2024-05-01T10:15:00.000Z","TRAFFIC":100.0}]"#,
//!     serde_json::to_string(&rows)?,
//! );
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::result_unit_err)]

/// Bucketing and aggregation of readings.
pub mod agg;

mod db;
mod db_builder;
mod error;
mod key;
mod range;
mod reading;
mod sensor;
mod source;
mod time;

type HashMap<K, V> = std::collections::HashMap<K, V, rustc_hash::FxBuildHasher>;

pub use agg::{SensorStats, TimeSeriesQuery, TimeSeriesRow};
pub use db::Database;
pub use db_builder::{Builder, DEFAULT_RECENT_LIMIT, MAX_RECENT_LIMIT};
pub use error::{Error, Result, ValidationError, ValidationErrorKind};
pub use range::{resolve_start, TimeRange};
pub use reading::{validate_all, NewReading, RawReading, Reading, ReadingWithSensor, StoredReading};
pub use sensor::{parse_sensor_types, NewSensor, Sensor, SensorType, SensorWithLatestReading};
pub use source::{MemorySource, ReadingSource};
pub use time::{format_iso, now, truncate, BUCKET_WIDTH_SECS};

/// Value of a reading
///
/// Sums are accumulated in this type as well, so it is always 64-bit.
pub type Value = f64;
