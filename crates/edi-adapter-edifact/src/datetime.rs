//! Date/time conversion for EDIFACT format codes
//!
//! Data components of type `datetime` carry a numeric format code
//! (UN/EDIFACT code list 2379). Conversion goes through the
//! [`DateTimeFormatter`] trait; [`ZonedFormatter`] interprets local times in a
//! configurable IANA time zone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

/// `CCYYMMDD`
pub const FORMAT_DATE: u32 = 102;
/// `CCYYMMDDHHMM`, local time
pub const FORMAT_DATE_TIME: u32 = 203;
/// `CCYYMMDDHHMMZZZ`, time with UTC offset
pub const FORMAT_DATE_TIME_OFFSET: u32 = 303;

/// Errors raised by date/time conversion
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported date/time format code {0}")]
    UnsupportedFormat(u32),

    #[error("Invalid value '{value}' for date/time format {code}: {reason}")]
    InvalidValue {
        value: String,
        code: u32,
        reason: String,
    },
}

impl FormatError {
    fn invalid(value: &str, code: u32, reason: impl Into<String>) -> Self {
        FormatError::InvalidValue {
            value: value.to_string(),
            code,
            reason: reason.into(),
        }
    }
}

/// Converts between EDIFACT date/time text and timestamps
pub trait DateTimeFormatter: Send + Sync {
    /// Parse `raw` according to format `code`
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnsupportedFormat`] for unknown codes and
    /// [`FormatError::InvalidValue`] when `raw` does not match the format.
    fn parse(&self, raw: &str, code: u32) -> Result<DateTime<FixedOffset>, FormatError>;

    /// Render `value` according to format `code`
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnsupportedFormat`] for unknown codes.
    fn format(&self, value: &DateTime<FixedOffset>, code: u32) -> Result<String, FormatError>;
}

/// Formatter resolving local times in a fixed IANA zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZonedFormatter {
    zone: Tz,
}

impl Default for ZonedFormatter {
    fn default() -> Self {
        Self {
            zone: chrono_tz::Europe::Vienna,
        }
    }
}

impl ZonedFormatter {
    #[must_use]
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    #[must_use]
    pub fn zone(&self) -> Tz {
        self.zone
    }

    fn localize(
        &self,
        raw: &str,
        code: u32,
        naive: NaiveDateTime,
    ) -> Result<DateTime<FixedOffset>, FormatError> {
        // Ambiguous local times (DST fall-back) resolve to the earlier instant
        self.zone
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset())
            .ok_or_else(|| FormatError::invalid(raw, code, "local time does not exist"))
    }
}

/// Parse `CCYYMMDD` or `CCYYMMDDHHMM` from ASCII digits
fn naive_from_digits(raw: &str, with_time: bool) -> Option<NaiveDateTime> {
    let expected = if with_time { 12 } else { 8 };
    if raw.len() != expected || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let field = |range: std::ops::Range<usize>| raw[range].parse::<u32>().ok();
    let year = i32::try_from(field(0..4)?).ok()?;
    let date = NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)?;

    if with_time {
        date.and_hms_opt(field(8..10)?, field(10..12)?, 0)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
}

/// Parse a UTC offset: `Z`, `+HH`, `+HHMM` or `+HH:MM`
fn parse_offset(raw: &str) -> Option<FixedOffset> {
    if raw == "Z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits = digits.replace(':', "");
    if !(digits.len() == 2 || digits.len() == 4) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[0..2].parse().ok()?;
    let minutes: i32 = if digits.len() == 4 {
        digits[2..4].parse().ok()?
    } else {
        0
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Render an offset as `+HH`, or `+HHMM` when minutes are present
fn format_offset(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.abs();
    let (hours, minutes) = (seconds / 3600, seconds % 3600 / 60);
    if minutes == 0 {
        format!("{sign}{hours:02}")
    } else {
        format!("{sign}{hours:02}{minutes:02}")
    }
}

impl DateTimeFormatter for ZonedFormatter {
    fn parse(&self, raw: &str, code: u32) -> Result<DateTime<FixedOffset>, FormatError> {
        match code {
            FORMAT_DATE | FORMAT_DATE_TIME => {
                let naive = naive_from_digits(raw, code == FORMAT_DATE_TIME)
                    .ok_or_else(|| FormatError::invalid(raw, code, "malformed digits"))?;
                self.localize(raw, code, naive)
            }
            FORMAT_DATE_TIME_OFFSET => {
                let (local, offset) = match (raw.get(..12), raw.get(12..)) {
                    (Some(local), Some(offset)) => (local, offset),
                    _ => return Err(FormatError::invalid(raw, code, "value too short")),
                };
                let naive = naive_from_digits(local, true)
                    .ok_or_else(|| FormatError::invalid(raw, code, "malformed digits"))?;
                let offset = parse_offset(offset)
                    .ok_or_else(|| FormatError::invalid(raw, code, "malformed UTC offset"))?;
                offset
                    .from_local_datetime(&naive)
                    .single()
                    .ok_or_else(|| FormatError::invalid(raw, code, "time out of range"))
            }
            other => Err(FormatError::UnsupportedFormat(other)),
        }
    }

    fn format(&self, value: &DateTime<FixedOffset>, code: u32) -> Result<String, FormatError> {
        match code {
            FORMAT_DATE => Ok(value.with_timezone(&self.zone).format("%Y%m%d").to_string()),
            FORMAT_DATE_TIME => Ok(value
                .with_timezone(&self.zone)
                .format("%Y%m%d%H%M")
                .to_string()),
            FORMAT_DATE_TIME_OFFSET => Ok(format!(
                "{}{}",
                value.format("%Y%m%d%H%M"),
                format_offset(value.offset().fix())
            )),
            other => Err(FormatError::UnsupportedFormat(other)),
        }
    }
}
