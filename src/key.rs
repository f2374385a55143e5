use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Utc};

/// Key layout of the readings partition.
///
/// `[timestamp; 8 bytes][sensor id]`, where the timestamp is microseconds
/// since the epoch with the sign bit flipped, big endian, so keys sort
/// chronologically, also before 1970.
pub struct ReadingKey;

impl ReadingKey {
    const TS_LEN: usize = std::mem::size_of::<u64>();

    #[allow(clippy::cast_sign_loss)]
    #[must_use]
    pub fn encode_ts(ts: &DateTime<Utc>) -> [u8; Self::TS_LEN] {
        let mut buf = [0; Self::TS_LEN];
        BigEndian::write_u64(&mut buf, (ts.timestamp_micros() as u64) ^ (1 << 63));
        buf
    }

    #[must_use]
    pub fn format(ts: &DateTime<Utc>, sensor_id: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(Self::TS_LEN + sensor_id.len());
        key.extend_from_slice(&Self::encode_ts(ts));
        key.extend_from_slice(sensor_id.as_bytes());
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test_log::test]
    fn reading_key_sorts_chronologically() {
        let epoch = DateTime::UNIX_EPOCH;

        let mut keys = [
            ReadingKey::format(&(epoch + TimeDelta::days(1)), "a"),
            ReadingKey::format(&(epoch - TimeDelta::microseconds(1)), "z"),
            ReadingKey::format(&epoch, "b"),
            ReadingKey::format(&(epoch - TimeDelta::days(400)), "a"),
            ReadingKey::format(&epoch, "a"),
        ];
        keys.sort();

        let ts = |key: &Vec<u8>| BigEndian::read_u64(&key[..8]);
        assert!(keys.windows(2).all(|w| ts(&w[0]) <= ts(&w[1])));

        assert_eq!(ReadingKey::format(&(epoch - TimeDelta::days(400)), "a"), keys[0]);
        assert_eq!(ReadingKey::format(&epoch, "a"), keys[2]);
        assert_eq!(ReadingKey::format(&(epoch + TimeDelta::days(1)), "a"), keys[4]);
    }

    #[test_log::test]
    fn reading_key_layout() {
        let ts = Utc
            .with_ymd_and_hms(2024, 5, 1, 0, 0, 0)
            .single()
            .expect("should be valid");

        let key = ReadingKey::format(&ts, "sensor-1");
        assert_eq!(8 + "sensor-1".len(), key.len());
        assert_eq!(&ReadingKey::encode_ts(&ts)[..], &key[..8]);
        assert_eq!(b"sensor-1", &key[8..]);
    }
}
