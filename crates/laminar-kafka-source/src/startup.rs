//! Startup policy resolution.
//!
//! Maps the `startupMode` option (and, for `TIMESTAMP`, the `startTime`
//! option) to a [`StartupPolicy`]. Start times use the fixed
//! `yyyy-MM-dd HH:mm:ss` layout and are interpreted in the local time zone
//! unless [`resolve_in`] is given another one.

use std::fmt;

use chrono::{LocalResult, NaiveDateTime, TimeZone, Timelike};

use crate::error::ConnectorError;

/// `chrono` format string equivalent to `yyyy-MM-dd HH:mm:ss`.
pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Startup mode used when the option is absent.
pub const DEFAULT_STARTUP_MODE: &str = "GROUP_OFFSETS";

const EXPECTED_SHAPE: &str = "expected yyyy-MM-dd HH:mm:ss";

/// Where consumption begins on each assigned partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupPolicy {
    /// Oldest retained offset.
    Earliest,
    /// Only records produced after startup.
    Latest,
    /// Offsets committed by the consumer group.
    GroupOffsets,
    /// First record at or after this epoch time, in milliseconds.
    Timestamp(i64),
    /// A mode name that is not recognised here, kept verbatim.
    ///
    /// Broker client adapters reject this variant.
    Unrecognized(String),
}

impl StartupPolicy {
    /// Returns the canonical mode name.
    #[must_use]
    pub fn mode_name(&self) -> &str {
        match self {
            Self::Earliest => "EARLIEST",
            Self::Latest => "LATEST",
            Self::GroupOffsets => "GROUP_OFFSETS",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::Unrecognized(mode) => mode,
        }
    }

    /// Returns the start time in epoch milliseconds, for [`StartupPolicy::Timestamp`].
    #[must_use]
    pub fn timestamp_ms(&self) -> Option<i64> {
        match self {
            Self::Timestamp(ms) => Some(*ms),
            _ => None,
        }
    }
}

impl fmt::Display for StartupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(ms) => write!(f, "TIMESTAMP({ms})"),
            other => f.write_str(other.mode_name()),
        }
    }
}

/// Resolves a startup mode against the local time zone.
///
/// # Errors
///
/// Returns `ConnectorError::TimestampParse` if `mode` is `TIMESTAMP` and
/// `start_time` is missing or not a valid local `yyyy-MM-dd HH:mm:ss`.
pub fn resolve(mode: &str, start_time: Option<&str>) -> Result<StartupPolicy, ConnectorError> {
    resolve_in(mode, start_time, &chrono::Local)
}

/// Resolves a startup mode, interpreting start times in `tz`.
///
/// Mode names match case-insensitively. `start_time` is only looked at for
/// `TIMESTAMP`; other modes ignore it even when it is malformed.
///
/// # Errors
///
/// Returns `ConnectorError::TimestampParse` if `mode` is `TIMESTAMP` and
/// `start_time` is missing, malformed, out of range, or names a local time
/// that does not exist in `tz`.
pub fn resolve_in<Tz: TimeZone>(
    mode: &str,
    start_time: Option<&str>,
    tz: &Tz,
) -> Result<StartupPolicy, ConnectorError> {
    let policy = match mode.to_ascii_uppercase().as_str() {
        "EARLIEST" => StartupPolicy::Earliest,
        "LATEST" => StartupPolicy::Latest,
        "GROUP_OFFSETS" => StartupPolicy::GroupOffsets,
        "TIMESTAMP" => StartupPolicy::Timestamp(parse_start_time(start_time.unwrap_or(""), tz)?),
        _ => StartupPolicy::Unrecognized(mode.to_string()),
    };
    Ok(policy)
}

/// Parses `yyyy-MM-dd HH:mm:ss` in `tz` into epoch milliseconds.
///
/// An ambiguous local time (clocks turned back) resolves to the earlier
/// instant.
///
/// # Errors
///
/// Returns `ConnectorError::TimestampParse` carrying `input` verbatim.
pub fn parse_start_time<Tz: TimeZone>(input: &str, tz: &Tz) -> Result<i64, ConnectorError> {
    if !has_expected_shape(input) {
        return Err(ConnectorError::timestamp(input, EXPECTED_SHAPE));
    }

    let naive = NaiveDateTime::parse_from_str(input, START_TIME_FORMAT)
        .map_err(|e| ConnectorError::timestamp(input, e.to_string()))?;

    // chrono encodes a leap second as :59 with an overflowing fraction.
    if naive.nanosecond() >= 1_000_000_000 {
        return Err(ConnectorError::timestamp(input, "seconds out of range"));
    }

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Ok(dt.timestamp_millis()),
        LocalResult::None => Err(ConnectorError::timestamp(
            input,
            "local time does not exist in this time zone",
        )),
    }
}

/// Checks the fixed `dddd-dd-dd dd:dd:dd` layout.
///
/// `chrono` accepts unpadded fields and will not flag some trailing input
/// the way a strict layout requires, so the shape is checked up front.
fn has_expected_shape(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 19
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 | 16 => *b == b':',
            _ => b.is_ascii_digit(),
        })
}
