//! Duration codec.
//!
//! Converts between human-readable duration strings (`"1.5s"`, `"250ms"`, `"2h"`)
//! and the fixed-point `seconds` + `nanos` representation used by the trace model.
//!
//! Two renderings exist:
//!
//! - [`format_duration`] picks the most readable unit for display.
//! - [`format_duration_for_api`] always renders seconds with up to nine fractional
//!   digits. This form is wire-stable and never uses scientific notation.
//!
//! A bare number without a unit suffix is rejected by [`parse_duration`].

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit0, digit1},
    combinator::{all_consuming, map, opt, value},
    sequence::preceded,
    IResult, Parser,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Fraction digits beyond this cannot influence the rounded nanosecond value,
/// even for the hour unit.
const MAX_FRACTION_DIGITS: usize = 24;

/// A non-negative duration with nanosecond resolution.
///
/// # Example
///
/// ```
/// use shared::duration::{parse_duration, Duration};
///
/// let d = parse_duration("1.5s").unwrap();
/// assert_eq!(d, Duration::new(1, 500_000_000));
/// assert_eq!(d.to_string(), "1.5s");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Duration {
    /// Whole seconds.
    pub seconds: i64,
    /// Nanosecond remainder in `0..1_000_000_000`.
    pub nanos: i32,
}

/// Error returned when a duration string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid duration: '{0}'. Expected a number followed by one of ns, us, ms, s, m, h")]
pub struct DurationParseError(pub String);

impl Duration {
    /// Creates a duration from whole seconds and a nanosecond remainder.
    #[must_use]
    pub const fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Creates a duration from a nanosecond count.
    #[must_use]
    pub fn from_nanos(nanos: u64) -> Self {
        let nanos = i128::from(nanos);
        Self::from_total_nanos(nanos).unwrap_or_default()
    }

    fn from_total_nanos(total: i128) -> Option<Self> {
        if total < 0 {
            return None;
        }
        let seconds = i64::try_from(total / NANOS_PER_SECOND).ok()?;
        let nanos = i32::try_from(total % NANOS_PER_SECOND).ok()?;
        Some(Self { seconds, nanos })
    }

    /// Returns the total number of nanoseconds.
    #[must_use]
    pub fn total_nanos(&self) -> i128 {
        i128::from(self.seconds) * NANOS_PER_SECOND + i128::from(self.nanos)
    }

    /// Returns the duration as fractional seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + f64::from(self.nanos) / 1e9
    }

    /// Returns true if the duration is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.total_nanos() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Nanos,
    Micros,
    Millis,
    Seconds,
    Minutes,
    Hours,
}

impl Unit {
    fn nanos(self) -> u128 {
        match self {
            Self::Nanos => 1,
            Self::Micros => 1_000,
            Self::Millis => 1_000_000,
            Self::Seconds => 1_000_000_000,
            Self::Minutes => 60_000_000_000,
            Self::Hours => 3_600_000_000_000,
        }
    }
}

/// Parses a duration such as `"1.5s"`, `"250ms"`, `"10us"` or `"2h"`.
///
/// Returns `None` for anything that is not a non-negative decimal literal
/// immediately followed by a unit, including bare numbers like `"30"`.
///
/// # Examples
///
/// ```
/// use shared::duration::parse_duration;
///
/// let d = parse_duration("250ms").unwrap();
/// assert_eq!((d.seconds, d.nanos), (0, 250_000_000));
/// assert!(parse_duration("30").is_none());
/// ```
#[must_use]
pub fn parse_duration(text: &str) -> Option<Duration> {
    let (_, ((whole, fraction), unit)) = all_consuming((literal, unit)).parse(text.trim()).ok()?;
    from_decimal(whole, fraction.unwrap_or(""), unit)
}

fn literal(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    alt((
        (digit1, opt(preceded(char('.'), digit0))),
        map(preceded(char('.'), digit1), |fraction| ("", Some(fraction))),
    ))
    .parse(input)
}

fn unit(input: &str) -> IResult<&str, Unit> {
    alt((
        value(Unit::Nanos, tag("ns")),
        value(Unit::Micros, alt((tag("us"), tag("µs"), tag("μs")))),
        value(Unit::Millis, tag("ms")),
        value(Unit::Seconds, tag("s")),
        value(Unit::Minutes, tag("m")),
        value(Unit::Hours, tag("h")),
    ))
    .parse(input)
}

fn from_decimal(whole: &str, fraction: &str, unit: Unit) -> Option<Duration> {
    let scale = unit.nanos();
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut total = whole.checked_mul(scale)?;

    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    if !fraction.is_empty() {
        let denominator = 10u128.pow(u32::try_from(fraction.len()).ok()?);
        let numerator: u128 = fraction.parse().ok()?;
        let rounded = (numerator * scale + denominator / 2) / denominator;
        total = total.checked_add(rounded)?;
    }

    Duration::from_total_nanos(i128::try_from(total).ok()?)
}

/// Formats a duration using the most readable unit.
///
/// Zero renders as `"0s"`; sub-microsecond values as nanoseconds; sub-millisecond
/// values as microseconds; sub-second values as milliseconds; whole hours and whole
/// minutes as `"h"`/`"m"`; everything else as decimal seconds.
///
/// # Examples
///
/// ```
/// use shared::duration::{format_duration, Duration};
///
/// assert_eq!(format_duration(&Duration::new(1, 500_000_000)), "1.5s");
/// assert_eq!(format_duration(&Duration::new(0, 250_000_000)), "250ms");
/// assert_eq!(format_duration(&Duration::new(300, 0)), "5m");
/// ```
#[must_use]
pub fn format_duration(duration: &Duration) -> String {
    let total = duration.total_nanos();
    if total == 0 {
        return "0s".to_string();
    }
    if total < 0 {
        return format!("-{}", format_magnitude(-total));
    }
    format_magnitude(total)
}

fn format_magnitude(total: i128) -> String {
    if total < NANOS_PER_MICRO {
        return format!("{total}ns");
    }
    if total < NANOS_PER_MILLI {
        return format!("{}µs", decimal(total, NANOS_PER_MICRO, 3));
    }
    if total < NANOS_PER_SECOND {
        return format!("{}ms", decimal(total, NANOS_PER_MILLI, 6));
    }
    if total % NANOS_PER_SECOND == 0 {
        let seconds = total / NANOS_PER_SECOND;
        if seconds % 3600 == 0 {
            return format!("{}h", seconds / 3600);
        }
        if seconds % 60 == 0 {
            return format!("{}m", seconds / 60);
        }
    }
    format!("{}s", decimal(total, NANOS_PER_SECOND, 9))
}

/// Formats a duration in seconds for the upstream API, e.g. `"0.001s"`.
///
/// Returns `None` when no duration is given.
///
/// # Examples
///
/// ```
/// use shared::duration::{format_duration_for_api, Duration};
///
/// let one_ns = Duration::new(0, 1);
/// assert_eq!(format_duration_for_api(Some(&one_ns)).as_deref(), Some("0.000000001s"));
/// assert_eq!(format_duration_for_api(None), None);
/// ```
#[must_use]
pub fn format_duration_for_api(duration: Option<&Duration>) -> Option<String> {
    let total = duration?.total_nanos();
    if total < 0 {
        return Some(format!("-{}s", decimal(-total, NANOS_PER_SECOND, 9)));
    }
    Some(format!("{}s", decimal(total, NANOS_PER_SECOND, 9)))
}

/// Renders `value / unit` exactly, with trailing zeros and a dangling point removed.
fn decimal(value: i128, unit: i128, digits: usize) -> String {
    let whole = value / unit;
    let remainder = value % unit;
    if remainder == 0 {
        return whole.to_string();
    }
    let fraction = format!("{remainder:0digits$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(self))
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).ok_or_else(|| DurationParseError(s.to_string()))
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = format_duration_for_api(Some(self)).unwrap_or_default();
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
