use std::fmt;

use thiserror::Error;


/// Part of the metric line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The metric name (key)
    Metric,
    /// The metric value
    Value,
    /// Unix timestamp in seconds
    Timestamp,
}

/// Error returned when a metric line doesn't match the plaintext grammar
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Field is empty or starts with a character not allowed in it
    #[error("{0} is empty or has invalid characters")]
    Empty(Field),
    /// Prebound metric key contains a character outside of `[A-Za-z0-9_.-]`
    #[error("metric key has invalid characters")]
    InvalidKey,
    /// No space after the field
    #[error("expected space after {0}")]
    NoSeparator(Field),
}

/// Returned by `Connection::send` when there is no established connection
///
/// The metric is not queued anywhere, it's just dropped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("graphite connection is not established")]
pub struct NotConnected;

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Field::Metric => "metric",
            Field::Value => "value",
            Field::Timestamp => "timestamp",
        })
    }
}

#[cfg(test)]
mod test {
    use super::{Field, NotConnected, ParseError};

    #[test]
    fn messages() {
        assert_eq!(ParseError::Empty(Field::Timestamp).to_string(),
                   "timestamp is empty or has invalid characters");
        assert_eq!(ParseError::NoSeparator(Field::Metric).to_string(),
                   "expected space after metric");
        assert_eq!(ParseError::InvalidKey.to_string(),
                   "metric key has invalid characters");
        assert_eq!(NotConnected.to_string(),
                   "graphite connection is not established");
    }
}
