//! Relative durations (`90d`, `1y6mo`, `12h30m`) and absolute timestamps for
//! `--expires-at` / `--not-before`.

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DURATION_PART: Regex = Regex::new(r"(\d+)(y|mo|w|d|h|m|s)")
        .expect("DURATION_PART should be a valid regex pattern");
}

/// Parses a sequence of `<number><unit>` parts.
///
/// Units: `y` (365 days), `mo` (30 days), `w`, `d`, `h`, `m`, `s`.
pub fn parse_duration(value: &str) -> anyhow::Result<Duration> {
    let value = value.trim();
    if value.is_empty() {
        bail!("Invalid duration: empty value");
    }

    let mut total = Duration::zero();
    let mut consumed = 0;
    for part in DURATION_PART.captures_iter(value) {
        let whole = part.get(0).ok_or_else(|| anyhow!("Invalid duration '{}'", value))?;
        if whole.start() != consumed {
            bail!("Invalid duration '{}': unexpected '{}'", value, &value[consumed..whole.start()]);
        }
        consumed = whole.end();

        let quantity: i64 =
            part[1].parse().with_context(|| format!("Invalid duration '{}'", value))?;
        let step = match &part[2] {
            "y" => Duration::days(365),
            "mo" => Duration::days(30),
            "w" => Duration::weeks(1),
            "d" => Duration::days(1),
            "h" => Duration::hours(1),
            "m" => Duration::minutes(1),
            _ => Duration::seconds(1),
        };
        total = i32::try_from(quantity)
            .ok()
            .and_then(|quantity| step.checked_mul(quantity))
            .and_then(|amount| total.checked_add(&amount))
            .ok_or_else(|| anyhow!("Invalid duration '{}': too large", value))?;
    }

    if consumed != value.len() {
        bail!(
            "Invalid duration '{}': expected parts like 1y, 6mo, 2w, 90d, 12h, 30m, 45s",
            value
        );
    }

    Ok(total)
}

/// A relative duration from `now`, or an RFC 3339 timestamp.
pub fn parse_time_spec(value: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(duration) = parse_duration(value) {
        return now
            .checked_add_signed(duration)
            .ok_or_else(|| anyhow!("'{}' is out of range", value));
    }

    DateTime::parse_from_rfc3339(value.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| anyhow!("Invalid time '{}': expected a duration like 90d or an RFC 3339 timestamp", value))
}
