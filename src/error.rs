/// What was wrong with a rejected record.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationErrorKind {
    /// The value is NaN or infinite.
    NonFiniteValue(f64),

    /// The timestamp is missing, cannot be parsed, or cannot be bucketed.
    InvalidTimestamp(String),

    /// The sensor type is not one of the known names.
    UnknownSensorType(String),

    /// A required field is absent.
    MissingField(&'static str),

    /// A field is present but out of its allowed domain.
    InvalidField {
        /// Name of the offending field
        field: &'static str,

        /// Why it was rejected
        reason: String,
    },
}

/// A record was rejected.
///
/// Identifies the offending record by its position in the input
/// and, if known, the sensor it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationError {
    /// Position of the record in its input sequence
    pub index: usize,

    /// Sensor the record belongs to, if known
    pub sensor_id: Option<String>,

    /// What was wrong
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    pub(crate) fn new(index: usize, sensor_id: Option<&str>, kind: ValidationErrorKind) -> Self {
        Self {
            index,
            sensor_id: sensor_id.map(str::to_owned),
            kind,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "record #{}", self.index)?;

        if let Some(sensor_id) = &self.sensor_id {
            write!(f, " (sensor {sensor_id:?})")?;
        }

        match &self.kind {
            ValidationErrorKind::NonFiniteValue(v) => write!(f, ": non-finite value {v}"),
            ValidationErrorKind::InvalidTimestamp(ts) => write!(f, ": invalid timestamp {ts:?}"),
            ValidationErrorKind::UnknownSensorType(t) => write!(f, ": unknown sensor type {t:?}"),
            ValidationErrorKind::MissingField(field) => write!(f, ": missing field {field:?}"),
            ValidationErrorKind::InvalidField { field, reason } => {
                write!(f, ": invalid field {field:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Error type
#[derive(Debug)]
pub enum Error {
    /// An IO error.
    Io(std::io::Error),

    /// Error in storage engine.
    Storage(fjall::Error),

    /// A stored record could not be (de)serialized.
    Serialization(serde_json::Error),

    /// A record was rejected.
    Validation(ValidationError),

    /// A reading referenced a sensor that does not exist.
    SensorNotFound(String),

    /// A range token was rejected by strict parsing.
    InvalidRange(String),
}

impl From<fjall::Error> for Error {
    fn from(value: fjall::Error) -> Self {
        Self::Storage(value)
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(e) => {
                write!(f, "{e}",)
            }
            Self::Io(e) => {
                write!(f, "{e}",)
            }
            Self::Serialization(e) => {
                write!(f, "{e}",)
            }
            Self::Validation(e) => {
                write!(f, "ValidationError: {e}",)
            }
            Self::SensorNotFound(id) => {
                write!(f, "SensorNotFound: {id:?}",)
            }
            Self::InvalidRange(token) => {
                write!(f, "InvalidRange: {token:?}",)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::Serialization(e) => Some(e),
            Self::Validation(e) => Some(e),
            Self::SensorNotFound(_) | Self::InvalidRange(_) => None,
        }
    }
}

/// Result helper type
pub type Result<T> = std::result::Result<T, Error>;
