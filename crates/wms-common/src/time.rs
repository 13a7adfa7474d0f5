//! Time handling for time-varying catalog items.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// A single point in a temporal data series.
///
/// `tag` is the exact string sent back to the server as the `time`
/// parameter; `time` is its parsed value used for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteTime {
    pub time: DateTime<Utc>,
    pub tag: String,
}

impl DiscreteTime {
    pub fn new(time: DateTime<Utc>, tag: impl Into<String>) -> Self {
        Self {
            time,
            tag: tag.into(),
        }
    }

    /// Parse a single ISO 8601 instant, keeping the original text as the tag.
    pub fn parse(s: &str) -> CatalogResult<Self> {
        let trimmed = s.trim();
        Ok(Self::new(parse_iso8601(trimmed)?, trimmed))
    }

    /// Build from a time, tagging it with an RFC 3339 string.
    pub fn from_time(time: DateTime<Utc>) -> Self {
        Self::new(time, time.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

/// Parse an ISO 8601 instant (timezone optional, UTC assumed).
pub fn parse_iso8601(s: &str) -> CatalogResult<DateTime<Utc>> {
    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try without timezone (assume UTC)
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    // Try date only
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(CatalogError::InvalidTime(s.to_string()))
}

/// An ISO 8601 period such as `P1D`, `PT6H` or `P1Y2M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IsoPeriod {
    pub months: u32,
    pub days: i64,
    pub seconds: i64,
}

impl IsoPeriod {
    pub fn parse(s: &str) -> CatalogResult<Self> {
        let invalid = || CatalogError::InvalidTime(s.to_string());
        let body = s.trim().strip_prefix('P').ok_or_else(invalid)?;
        if body.is_empty() {
            return Err(invalid());
        }

        let mut period = IsoPeriod::default();
        let mut in_time = false;
        let mut number = String::new();
        for c in body.chars() {
            match c {
                'T' => {
                    if !number.is_empty() {
                        return Err(invalid());
                    }
                    in_time = true;
                }
                '0'..='9' | '.' => number.push(c),
                unit => {
                    let value: f64 = number.parse().map_err(|_| invalid())?;
                    number.clear();
                    match (in_time, unit) {
                        (false, 'Y') => {
                            let months = scaled(value, 12.0).and_then(|v| u32::try_from(v).ok());
                            period.months = months
                                .and_then(|m| period.months.checked_add(m))
                                .ok_or_else(invalid)?;
                        }
                        (false, 'M') => {
                            let months = scaled(value, 1.0).and_then(|v| u32::try_from(v).ok());
                            period.months = months
                                .and_then(|m| period.months.checked_add(m))
                                .ok_or_else(invalid)?;
                        }
                        (false, 'W') => {
                            period.days = add_scaled(period.days, value, 7.0).ok_or_else(invalid)?
                        }
                        (false, 'D') => {
                            period.days = add_scaled(period.days, value, 1.0).ok_or_else(invalid)?
                        }
                        (true, 'H') => {
                            period.seconds = add_scaled(period.seconds, value, 3600.0).ok_or_else(invalid)?
                        }
                        (true, 'M') => {
                            period.seconds = add_scaled(period.seconds, value, 60.0).ok_or_else(invalid)?
                        }
                        (true, 'S') => {
                            period.seconds = add_scaled(period.seconds, value, 1.0).ok_or_else(invalid)?
                        }
                        _ => return Err(invalid()),
                    }
                }
            }
        }

        if !number.is_empty() || period.is_zero() {
            return Err(invalid());
        }
        Ok(period)
    }

    pub fn is_zero(&self) -> bool {
        self.months == 0 && self.days == 0 && self.seconds == 0
    }

    /// Advance `dt` by this period. Calendar months are applied first.
    pub fn add_to(&self, dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let shifted = if self.months > 0 {
            dt.checked_add_months(Months::new(self.months))?
        } else {
            dt
        };
        let offset =
            Duration::try_days(self.days)?.checked_add(&Duration::try_seconds(self.seconds)?)?;
        shifted.checked_add_signed(offset)
    }
}

/// `value * factor` truncated to a whole number, or `None` when it does not
/// fit in an `i64`.
fn scaled(value: f64, factor: f64) -> Option<i64> {
    let v = (value * factor).trunc();
    if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn add_scaled(total: i64, value: f64, factor: f64) -> Option<i64> {
    total.checked_add(scaled(value, factor)?)
}

/// One entry of a WMS time dimension: a single instant or a
/// `start/end/period` interval.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeExtent {
    Instant(DiscreteTime),
    Interval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        period: IsoPeriod,
    },
}

impl TimeExtent {
    /// Parse a full dimension value: comma separated instants and intervals.
    pub fn parse_list(s: &str) -> CatalogResult<Vec<TimeExtent>> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(TimeExtent::parse)
            .collect()
    }

    pub fn parse(s: &str) -> CatalogResult<TimeExtent> {
        let parts: Vec<&str> = s.split('/').map(str::trim).collect();
        match parts.as_slice() {
            [single] => Ok(TimeExtent::Instant(DiscreteTime::parse(single)?)),
            [start, end, period] => Ok(TimeExtent::Interval {
                start: parse_iso8601(start)?,
                end: parse_iso8601(end)?,
                period: IsoPeriod::parse(period)?,
            }),
            _ => Err(CatalogError::InvalidTime(s.to_string())),
        }
    }

    /// Append the discrete times of this extent to `out`, stopping once `out`
    /// holds `max` entries.
    fn expand_into(&self, out: &mut Vec<DiscreteTime>, max: usize) {
        match self {
            TimeExtent::Instant(t) => {
                if out.len() < max {
                    out.push(t.clone());
                }
            }
            TimeExtent::Interval { start, end, period } => {
                let mut current = *start;
                while current <= *end && out.len() < max {
                    out.push(DiscreteTime::from_time(current));
                    match period.add_to(current) {
                        Some(next) if next > current => current = next,
                        _ => break,
                    }
                }
            }
        }
    }
}

/// Expand a time dimension value into sorted, de-duplicated discrete times.
pub fn expand_time_dimension(values: &str, max: usize) -> CatalogResult<Vec<DiscreteTime>> {
    let mut times = Vec::new();
    for extent in TimeExtent::parse_list(values)? {
        extent.expand_into(&mut times, max);
    }
    times.sort_by(|a, b| a.time.cmp(&b.time));
    times.dedup_by(|a, b| a.time == b.time);
    Ok(times)
}

/// Index of the latest time not after `current`.
///
/// `None` for `current` selects the latest time. A `current` earlier than every
/// entry selects the first one. Returns `None` only for an empty slice.
pub fn current_index(times: &[DiscreteTime], current: Option<&DateTime<Utc>>) -> Option<usize> {
    if times.is_empty() {
        return None;
    }
    match current {
        None => Some(times.len() - 1),
        Some(current) => {
            let after = times.partition_point(|t| t.time <= *current);
            Some(after.saturating_sub(1))
        }
    }
}
