//! Field validation rules
//!
//! Each rule is a pure predicate over one raw cell value. Rules never see
//! the rest of the row or the feed.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accepted `route_type` values (basic GTFS route types)
pub const ROUTE_TYPES: &[&str] = &["0", "1", "2", "3", "4", "5", "6", "7", "11", "12"];

/// Accepted `location_type` values
pub const LOCATION_TYPES: &[&str] = &["0", "1", "2", "3", "4"];

/// A named validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Value must be present and non-empty
    #[serde(rename = "required_field")]
    Required,
    /// Any finite decimal number
    Numeric,
    /// A base-10 integer
    Integer,
    /// Decimal degrees in `[-90, 90]`
    Latitude,
    /// Decimal degrees in `[-180, 180]`
    Longitude,
    /// `H:MM:SS` to `HHH:MM:SS`; hours may exceed 23
    Time,
    /// `YYYYMMDD`, must be a real calendar date
    Date,
    /// Absolute http(s) URL
    Url,
    Email,
    /// Six hex digits, no leading `#`
    Color,
    /// ISO 4217 style code: three uppercase letters
    Currency,
    /// `0` or `1`
    Binary,
    RouteType,
    LocationType,
}

impl Rule {
    /// Name used in reports
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Required => "required_field",
            Rule::Numeric => "numeric",
            Rule::Integer => "integer",
            Rule::Latitude => "latitude",
            Rule::Longitude => "longitude",
            Rule::Time => "time",
            Rule::Date => "date",
            Rule::Url => "url",
            Rule::Email => "email",
            Rule::Color => "color",
            Rule::Currency => "currency",
            Rule::Binary => "binary",
            Rule::RouteType => "route_type",
            Rule::LocationType => "location_type",
        }
    }

    /// Run the predicate against a raw value
    pub fn check(&self, value: &str) -> bool {
        match self {
            Rule::Required => !value.trim().is_empty(),
            Rule::Numeric => is_numeric(value),
            Rule::Integer => value.parse::<i64>().is_ok(),
            Rule::Latitude => in_range(value, 90.0),
            Rule::Longitude => in_range(value, 180.0),
            Rule::Time => is_time(value),
            Rule::Date => is_date(value),
            Rule::Url => is_url(value),
            Rule::Email => is_email(value),
            Rule::Color => value.len() == 6 && value.bytes().all(|b| b.is_ascii_hexdigit()),
            Rule::Currency => value.len() == 3 && value.bytes().all(|b| b.is_ascii_uppercase()),
            Rule::Binary => value == "0" || value == "1",
            Rule::RouteType => ROUTE_TYPES.contains(&value),
            Rule::LocationType => LOCATION_TYPES.contains(&value),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_numeric(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(f64::is_finite)
}

fn in_range(value: &str, limit: f64) -> bool {
    value
        .parse::<f64>()
        .is_ok_and(|v| (-limit..=limit).contains(&v))
}

fn is_time(value: &str) -> bool {
    let mut parts = value.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !(1..=3).contains(&h.len()) || !all_digits(h) {
        return false;
    }
    let sexagesimal = |p: &str| p.len() == 2 && all_digits(p) && p < "60";
    sexagesimal(m) && sexagesimal(s)
}

/// Earliest year a service date may carry
const MIN_DATE_YEAR: i32 = 1900;

fn is_date(value: &str) -> bool {
    value.len() == 8
        && value.bytes().all(|b| b.is_ascii_digit())
        && NaiveDate::parse_from_str(value, "%Y%m%d")
            .is_ok_and(|date| date.year() >= MIN_DATE_YEAR)
}

fn is_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !rest.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(name, tld)| !name.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latitude_bounds() {
        assert!(Rule::Latitude.check("90"));
        assert!(Rule::Latitude.check("-90"));
        assert!(Rule::Latitude.check("40.7128"));
        assert!(!Rule::Latitude.check("90.0001"));
        assert!(!Rule::Latitude.check("abc"));
        assert!(!Rule::Latitude.check("NaN"));
    }

    #[test]
    fn test_longitude_bounds() {
        assert!(Rule::Longitude.check("-180"));
        assert!(Rule::Longitude.check("-74.0"));
        assert!(!Rule::Longitude.check("180.5"));
    }

    #[test]
    fn test_date() {
        assert!(Rule::Date.check("20240229"));
        assert!(!Rule::Date.check("20230229"));
        assert!(!Rule::Date.check("20230230"));
        assert!(!Rule::Date.check("2024-02-29"));
        assert!(!Rule::Date.check("2024021"));
        assert!(!Rule::Date.check("00000101"));
        assert!(!Rule::Date.check("08991231"));
        assert!(!Rule::Date.check("18991231"));
        assert!(Rule::Date.check("19000101"));
    }

    #[test]
    fn test_time() {
        assert!(Rule::Time.check("8:00:00"));
        assert!(Rule::Time.check("08:30:15"));
        assert!(Rule::Time.check("25:10:00"));
        assert!(Rule::Time.check("025:59:59"));
        assert!(!Rule::Time.check("25:61:00"));
        assert!(!Rule::Time.check("12:00:60"));
        assert!(!Rule::Time.check("1000:00:00"));
        assert!(!Rule::Time.check("12:00"));
        assert!(!Rule::Time.check("12:0:00"));
    }

    #[test]
    fn test_color() {
        assert!(Rule::Color.check("1A2B3C"));
        assert!(Rule::Color.check("ffffff"));
        assert!(!Rule::Color.check("#1A2B3C"));
        assert!(!Rule::Color.check("1A2B3"));
        assert!(!Rule::Color.check("GGGGGG"));
    }

    #[test]
    fn test_numeric_and_integer() {
        assert!(Rule::Numeric.check("2.50"));
        assert!(Rule::Numeric.check("-1"));
        assert!(!Rule::Numeric.check("inf"));
        assert!(!Rule::Numeric.check("two"));
        assert!(Rule::Integer.check("12"));
        assert!(!Rule::Integer.check("1.5"));
    }

    #[test]
    fn test_url_and_email() {
        assert!(Rule::Url.check("https://example.com"));
        assert!(Rule::Url.check("http://transit.example.org/fares?x=1"));
        assert!(!Rule::Url.check("example.com"));
        assert!(!Rule::Url.check("https://"));
        assert!(Rule::Email.check("info@example.com"));
        assert!(!Rule::Email.check("info@example"));
        assert!(!Rule::Email.check("@example.com"));
    }

    #[test]
    fn test_enumerations() {
        assert!(Rule::Binary.check("0"));
        assert!(!Rule::Binary.check("2"));
        assert!(Rule::RouteType.check("3"));
        assert!(Rule::RouteType.check("12"));
        assert!(!Rule::RouteType.check("8"));
        assert!(Rule::LocationType.check("4"));
        assert!(!Rule::LocationType.check("5"));
        assert!(Rule::Currency.check("USD"));
        assert!(!Rule::Currency.check("usd"));
    }

    #[test]
    fn test_rule_names() {
        assert_eq!(Rule::Required.name(), "required_field");
        assert_eq!(Rule::RouteType.to_string(), "route_type");
        assert_eq!(serde_json::to_string(&Rule::Required).unwrap(), "\"required_field\"");
        assert_eq!(serde_json::to_string(&Rule::LocationType).unwrap(), "\"location_type\"");
    }
}
