//! Duration values written as human strings in config files.

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const NANOS_PER_SEC: u128 = 1_000_000_000;

// Longer suffixes first so "ms" is not read as "m".
const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("\u{b5}s", 1_000),
    ("ms", 1_000_000),
    ("h", 3600 * NANOS_PER_SEC),
    ("m", 60 * NANOS_PER_SEC),
    ("s", NANOS_PER_SEC),
];

/// Parse a duration string like "1h", "30m", "300s", "300" into seconds.
/// Supports:
/// - Plain numbers (interpreted as seconds): "300"
/// - A single unit: "300s", "30m", "1h"
/// - Compound values as written by older components: "5m0s", "1h30m", "1.5m"
///
/// The total must be a whole number of seconds that fits in a `u64`.
pub fn parse_duration_to_secs(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }

    let mut rest = s;
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() {
            anyhow::bail!("Invalid duration value: {s}");
        }
        let (unit, scale) = UNITS
            .iter()
            .find(|(unit, _)| tail.starts_with(unit))
            .ok_or_else(|| anyhow::anyhow!("Missing or unknown unit in duration: {s}"))?;

        let nanos = scale_number(number, *scale)
            .with_context(|| format!("Invalid duration value: {s}"))?;
        total = total
            .checked_add(nanos)
            .with_context(|| format!("Duration out of range: {s}"))?;
        rest = &tail[unit.len()..];
    }

    if total % NANOS_PER_SEC != 0 {
        anyhow::bail!("Duration {s} is not a whole number of seconds");
    }
    u64::try_from(total / NANOS_PER_SEC).with_context(|| format!("Duration out of range: {s}"))
}

// `number` in units of `scale` nanoseconds, e.g. "1.5" with the seconds scale.
fn scale_number(number: &str, scale: u128) -> anyhow::Result<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        anyhow::bail!("Missing number");
    }
    if fraction.contains('.') {
        anyhow::bail!("Too many decimal points");
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse()? };
    let mut nanos = whole.checked_mul(scale).context("Duration out of range")?;

    // digits past the 18th are below a nanosecond for every unit
    let fraction = &fraction[..fraction.len().min(18)];
    if !fraction.is_empty() {
        let digits: u128 = fraction.parse()?;
        let divisor = 10u128.pow(fraction.len() as u32);
        nanos = nanos
            .checked_add(digits * scale / divisor)
            .context("Duration out of range")?;
    }
    Ok(nanos)
}

/// Format seconds using the largest unit that divides them exactly.
pub fn format_secs(secs: u64) -> String {
    if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

/// Whole-second duration that serializes as `"5m"` / `"30s"` / `"1h"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Duration(pub std::time::Duration);

impl Duration {
    pub const fn from_secs(secs: u64) -> Self {
        Self(std::time::Duration::from_secs(secs))
    }

    pub fn as_std(&self) -> std::time::Duration {
        self.0
    }
}

impl From<std::time::Duration> for Duration {
    fn from(d: std::time::Duration) -> Self {
        Self(d)
    }
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_secs(self.0.as_secs()))
    }
}

impl std::str::FromStr for Duration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration_to_secs(s).map(Self::from_secs)
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_plain_number() {
        assert_eq!(parse_duration_to_secs("300").unwrap(), 300);
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration_to_secs("45s").unwrap(), 45);
        assert_eq!(parse_duration_to_secs("5m").unwrap(), 300);
        assert_eq!(parse_duration_to_secs("2h").unwrap(), 7200);
        assert_eq!(parse_duration_to_secs(" 10s ").unwrap(), 10);
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert!(parse_duration_to_secs("").is_err());
        assert!(parse_duration_to_secs("abc").is_err());
        assert!(parse_duration_to_secs("5x").is_err());
        assert!(parse_duration_to_secs("-5s").is_err());
    }

    #[test]
    fn test_parse_duration_compound() {
        assert_eq!(parse_duration_to_secs("5m0s").unwrap(), 300);
        assert_eq!(parse_duration_to_secs("1h30m").unwrap(), 5400);
        assert_eq!(parse_duration_to_secs("1h0m0s").unwrap(), 3600);
        assert_eq!(parse_duration_to_secs("1.5m").unwrap(), 90);
        assert_eq!(parse_duration_to_secs("2000ms").unwrap(), 2);
        assert_eq!(parse_duration_to_secs("0s").unwrap(), 0);
    }

    #[test]
    fn test_parse_duration_sub_second_is_rejected() {
        assert!(parse_duration_to_secs("500ms").is_err());
        assert!(parse_duration_to_secs("1m30.5s").is_err());
        let err = parse_duration_to_secs("1.5s").unwrap_err();
        assert!(err.to_string().contains("whole number of seconds"));
        assert!(parse_duration_to_secs("1.2.3s").is_err());
        assert!(parse_duration_to_secs("5m0").is_err());
    }

    #[test]
    fn test_parse_duration_overflow_is_an_error() {
        assert!(parse_duration_to_secs("5124095576030432h").is_err());
        assert!(parse_duration_to_secs("307445734561825861m").is_err());
        assert!(parse_duration_to_secs("99999999999999999999999999999999999999999h").is_err());
        assert_eq!(
            parse_duration_to_secs("18446744073709551615s").unwrap(),
            u64::MAX
        );
    }

    #[test]
    fn test_format_picks_largest_unit() {
        assert_eq!(format_secs(0), "0s");
        assert_eq!(format_secs(30), "30s");
        assert_eq!(format_secs(300), "5m");
        assert_eq!(format_secs(3600), "1h");
        assert_eq!(format_secs(90), "90s");
    }

    #[test]
    fn test_duration_serde_as_string() {
        let d = Duration::from_secs(300);
        assert_eq!(serde_json::to_string(&d).unwrap(), "\"5m\"");
        let back: Duration = serde_json::from_str("\"300\"").unwrap();
        assert_eq!(back, d);
    }
}
