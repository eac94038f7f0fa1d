use std::fmt;

use crate::error::{Field, ParseError};


/// A metric line split into its three fields
///
/// Fields borrow from the parsed line (and from the prebound key, if any).
/// `Display` formats it as a wire line without the trailing newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Metric name, matches `[A-Za-z0-9_.-]+`
    pub metric: &'a str,
    /// Value, matches `[0-9.-]+`
    pub value: &'a str,
    /// Unix timestamp in seconds, decimal digits only
    pub timestamp: &'a str,
}

fn is_key_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.'
}

fn is_value_char(b: u8) -> bool {
    b.is_ascii_digit() || b == b'-' || b == b'.'
}

fn is_space(b: u8) -> bool {
    b == b' '
}

/// Length of the prefix consisting of allowed bytes only
///
/// All allowed bytes are ASCII so the result is always a char boundary.
fn span(data: &str, allowed: fn(u8) -> bool) -> usize {
    data.bytes().take_while(|&b| allowed(b)).count()
}

/// Returns the field and the rest of the line after the field and the
/// spaces that follow it
fn field<'a>(data: &'a str, allowed: fn(u8) -> bool, name: Field)
    -> Result<(&'a str, &'a str), ParseError>
{
    let len = span(data, allowed);
    if len == 0 {
        return Err(ParseError::Empty(name));
    }
    let (value, tail) = data.split_at(len);
    let spaces = span(tail, is_space);
    if spaces == 0 {
        return Err(ParseError::NoSeparator(name));
    }
    Ok((value, &tail[spaces..]))
}

/// Check that the metric key is non-empty and consists of allowed characters
///
/// Allowed characters are ASCII letters, digits, underscore, hyphen
/// and period.
pub fn validate_key(key: &str) -> Result<(), ParseError> {
    if key.is_empty() {
        return Err(ParseError::Empty(Field::Metric));
    }
    if span(key, is_key_char) != key.len() {
        return Err(ParseError::InvalidKey);
    }
    Ok(())
}

/// Parse a plaintext metric line
///
/// If `key` is `None` the line is `metric value timestamp`, otherwise the
/// key is validated and the line should contain only `value timestamp`.
/// Fields are separated by one or more spaces. Anything after the
/// timestamp digits (like `\r` left over from framing) is ignored.
///
/// # Example
///
/// ```
/// let line = tk_graphite::parse("cpu.load 0.95 1000", None).unwrap();
/// assert_eq!(line.metric, "cpu.load");
/// assert_eq!(line.value, "0.95");
/// assert_eq!(line.timestamp, "1000");
/// ```
pub fn parse<'a>(line: &'a str, key: Option<&'a str>)
    -> Result<Line<'a>, ParseError>
{
    let (metric, rest) = match key {
        Some(key) => {
            validate_key(key)?;
            (key, line)
        }
        None => field(line, is_key_char, Field::Metric)?,
    };
    let (value, rest) = field(rest, is_value_char, Field::Value)?;
    let len = span(rest, |b| b.is_ascii_digit());
    if len == 0 {
        return Err(ParseError::Empty(Field::Timestamp));
    }
    // trailing junk is truncated
    let timestamp = &rest[..len];
    Ok(Line { metric, value, timestamp })
}

impl<'a> fmt::Display for Line<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.metric, self.value, self.timestamp)
    }
}
