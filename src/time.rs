use chrono::{DateTime, SecondsFormat, Utc};

/// Width of a time series bucket, in seconds (15 minutes).
pub const BUCKET_WIDTH_SECS: i64 = 15 * 60;

/// Returns the current instant.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Floors a timestamp to its 15-minute bucket, in seconds since the epoch.
pub(crate) fn bucket_secs(ts: &DateTime<Utc>) -> i64 {
    let secs = ts.timestamp();
    secs - secs.rem_euclid(BUCKET_WIDTH_SECS)
}

/// Floors a timestamp to its 15-minute bucket (UTC).
///
/// The minute is rounded down to a multiple of 15, seconds and
/// sub-seconds are zeroed.
///
/// Returns `None` only if the bucket start is not representable.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use streetpulse::truncate;
///
/// let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 14, 59).unwrap();
/// let bucket = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
///
/// assert_eq!(Some(bucket), truncate(&ts));
/// assert_eq!(Some(bucket), truncate(&bucket));
/// ```
#[must_use]
pub fn truncate(ts: &DateTime<Utc>) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(bucket_secs(ts), 0)
}

/// Renders an instant the way the dashboard expects it, e.g. `2024-05-01T12:15:00.000Z`.
#[must_use]
pub fn format_iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
