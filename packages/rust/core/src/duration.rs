//! Day-count parsing for timeline estimates and budget effort.

use std::sync::LazyLock;

use regex::Regex;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(days?|d)?\s*$").expect("duration regex")
});

/// Unit attached to a parsed duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    /// A bare number, read as days.
    Unitless,
    /// "day", "days" or "d".
    Days,
}

/// A numeric day count with the unit it was written in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedDuration {
    pub value: f64,
    pub unit: DurationUnit,
}

/// Parse "3", "3 days", "1 day" or "2.5d". Anything else is unspecified.
pub fn parse_duration(text: &str) -> Option<ParsedDuration> {
    let caps = DURATION_RE.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = if caps.get(2).is_some() {
        DurationUnit::Days
    } else {
        DurationUnit::Unitless
    };
    Some(ParsedDuration { value, unit })
}

/// Day count for cost purposes: the parsed value, or 1 when unparsable.
pub fn days_or_minimum(text: &str) -> f64 {
    parse_duration(text).map(|d| d.value).unwrap_or(1.0)
}

/// Render a day count without a trailing ".0" for whole numbers.
pub fn format_days(days: f64) -> String {
    if days.fract() == 0.0 {
        format!("{days:.0}")
    } else {
        format!("{days}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_and_suffixed_values() {
        assert_eq!(parse_duration("3").unwrap().value, 3.0);
        assert_eq!(parse_duration("3 days").unwrap().value, 3.0);
        assert_eq!(parse_duration("1 Day").unwrap().unit, DurationUnit::Days);
        assert_eq!(parse_duration(" 2.5d ").unwrap().value, 2.5);
        assert_eq!(parse_duration("7").unwrap().unit, DurationUnit::Unitless);
    }

    #[test]
    fn rejects_other_units_and_text() {
        assert!(parse_duration("2 weeks").is_none());
        assert!(parse_duration("Not specified").is_none());
        assert!(parse_duration("").is_none());
        assert!(parse_duration("about 3 days").is_none());
    }

    #[test]
    fn minimum_applies_only_when_unparsable() {
        assert_eq!(days_or_minimum("10"), 10.0);
        assert_eq!(days_or_minimum("Not specified"), 1.0);
        assert_eq!(days_or_minimum(""), 1.0);
        assert_eq!(days_or_minimum("0"), 0.0);
    }

    #[test]
    fn formats_whole_days_without_decimals() {
        assert_eq!(format_days(10.0), "10");
        assert_eq!(format_days(2.5), "2.5");
    }
}
