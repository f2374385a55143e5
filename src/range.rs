use chrono::{DateTime, TimeDelta, Utc};

/// A lookback window, as selected on the dashboard.
///
/// Tokens are `24h`, `7d`, `30d` and `1y`.
///
/// ```
/// use streetpulse::TimeRange;
///
/// assert_eq!(TimeRange::Week, TimeRange::lenient("7d"));
///
/// // Unknown tokens fall back to the last 24 hours
/// assert_eq!(TimeRange::Day, TimeRange::lenient("bogus"));
///
/// // ... unless parsed strictly
/// assert!("bogus".parse::<TimeRange>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, std::hash::Hash)]
pub enum TimeRange {
    /// `24h`
    #[default]
    Day,

    /// `7d`
    Week,

    /// `30d`
    Month,

    /// `1y` (365 days)
    Year,
}

impl TimeRange {
    /// Parses a token, treating anything unrecognized as [`TimeRange::Day`].
    #[must_use]
    pub fn lenient(token: &str) -> Self {
        token.parse().unwrap_or_else(|_| {
            log::warn!("unknown time range {token:?}, falling back to 24h");
            Self::Day
        })
    }

    /// Token of this range.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Year => "1y",
        }
    }

    /// Length of the window.
    #[must_use]
    pub fn duration(self) -> TimeDelta {
        match self {
            Self::Day => TimeDelta::hours(24),
            Self::Week => TimeDelta::days(7),
            Self::Month => TimeDelta::days(30),
            Self::Year => TimeDelta::days(365),
        }
    }

    /// Start of the window ending at `now`.
    ///
    /// Saturates at the earliest representable instant.
    #[must_use]
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.duration())
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TimeRange {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "24h" => Ok(Self::Day),
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "1y" => Ok(Self::Year),
            _ => Err(crate::Error::InvalidRange(s.to_owned())),
        }
    }
}

/// Resolves a range token to the start of its window, anchored at `now`.
///
/// Unrecognized tokens resolve like `24h`.
#[must_use]
pub fn resolve_start(token: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    TimeRange::lenient(token).start(now)
}
