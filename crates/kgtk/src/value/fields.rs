//! Structured sub-fields extracted from KGTK cell values.
//!
//! Each non-symbol datatype decomposes into a [`ValueFields`] record:
//! numbers and quantities carry a magnitude, tolerances, and units; dates
//! carry year/month/day/hour/minute/second plus a timezone marker; strings
//! carry decoded text and language tags; coordinates carry lat/lon.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::options::ValueOptions;

/// Structured sub-fields of a parsed value. Fields not applicable to the
/// value's datatype stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueFields {
    /// Number of items when the value is a list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_len: Option<usize>,

    /// The magnitude text exactly as written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numberstr: Option<String>,
    /// The parsed numeric magnitude.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<f64>,
    /// Low end of a quantity tolerance interval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_tolerance: Option<f64>,
    /// High end of a quantity tolerance interval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_tolerance: Option<f64>,
    /// SI unit suffix (e.g. `m`, `m/s^2`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub si_units: Option<String>,
    /// Unit-node symbol reference (e.g. `Q212`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units_node: Option<String>,

    /// Raw text between string delimiters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Text with backslash escapes decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_text: Option<String>,
    /// Language code of a language-qualified string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Language subtag suffix (e.g. the `US` in `en-US`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_suffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// The full date/time body (without the `^` sigil).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_and_times: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minute: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second: Option<u32>,
    /// Timezone marker text. Only a bare `Z` participates in ordering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zonestr: Option<String>,
    /// Wikidata-style precision digit after a trailing `/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,

    /// Boolean truth value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truth: Option<bool>,
}

impl ValueFields {
    /// Look up a field by its name, rendered as a string. Used by the
    /// FIELD_* property pattern rules. Unknown names and unset fields
    /// both return `None`.
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            "list_len" => self.list_len.map(|v| v.to_string()),
            "numberstr" => self.numberstr.clone(),
            "number" => self.number.map(|v| v.to_string()),
            "low_tolerance" => self.low_tolerance.map(|v| v.to_string()),
            "high_tolerance" => self.high_tolerance.map(|v| v.to_string()),
            "si_units" => self.si_units.clone(),
            "units_node" => self.units_node.clone(),
            "text" => self.text.clone(),
            "decoded_text" => self.decoded_text.clone(),
            "language" => self.language.clone(),
            "language_suffix" => self.language_suffix.clone(),
            "latitude" => self.latitude.map(|v| v.to_string()),
            "longitude" => self.longitude.map(|v| v.to_string()),
            "date_and_times" => self.date_and_times.clone(),
            "year" => self.year.map(|v| v.to_string()),
            "month" => self.month.map(|v| v.to_string()),
            "day" => self.day.map(|v| v.to_string()),
            "hour" => self.hour.map(|v| v.to_string()),
            "minute" => self.minute.map(|v| v.to_string()),
            "second" => self.second.map(|v| v.to_string()),
            "zonestr" => self.zonestr.clone(),
            "precision" => self.precision.map(|v| v.to_string()),
            "truth" => self.truth.map(|v| if v { "True" } else { "False" }.to_string()),
            _ => None,
        }
    }

    /// Sortable key for date comparison. `None` when the value is not a
    /// date or carries a timezone other than a bare `Z` (ordering is
    /// undefined for such values).
    pub fn date_sort_key(&self) -> Option<(i32, u32, u32, u32, u32, u32)> {
        let year = self.year?;
        if let Some(zone) = &self.zonestr {
            if !zone.is_empty() && zone != "Z" {
                return None;
            }
        }
        Some((
            year,
            self.month.unwrap_or(1),
            self.day.unwrap_or(1),
            self.hour.unwrap_or(0),
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
        ))
    }

    /// The date/time as a chrono value, when the components form a real
    /// calendar date. Syntactic validation is more lenient (it admits e.g.
    /// day 31 in any month); this is the stricter calendar view.
    pub fn naive_datetime(&self) -> Option<NaiveDateTime> {
        let (year, month, day, hour, minute, second) = self.date_sort_key()?;
        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
    }
}

/// A parsed value together with an optional repaired rendering.
#[derive(Debug, Clone)]
pub struct ParsedValue {
    pub fields: ValueFields,
    /// A canonical rewrite when a confident repair was applied.
    pub repaired: Option<String>,
}

impl ParsedValue {
    fn clean(fields: ValueFields) -> Self {
        Self {
            fields,
            repaired: None,
        }
    }
}

const NUMBER_PATTERN: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!("^(?P<number>{NUMBER_PATTERN})$")).unwrap());

static HEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<sign>[-+]?)0(?P<radix>[xob])(?P<digits>[0-9a-fA-F]+)$").unwrap());

static QUANTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<number>{NUMBER_PATTERN})(?:\[(?P<low>{NUMBER_PATTERN}),(?P<high>{NUMBER_PATTERN})\])?(?:(?P<unode>Q\d+)|(?P<si>[A-Za-z%$][A-Za-z0-9.^*/-]*))?$"
    ))
    .unwrap()
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\^(?P<year>[-+]?\d{4})(?:-(?P<month>\d{2})(?:-(?P<day>\d{2})(?:T(?P<hour>\d{2})(?::(?P<minute>\d{2})(?::(?P<second>\d{2}))?)?(?P<zone>Z|[-+]\d{2}(?::?\d{2})?)?)?)?)?(?:/(?P<precision>\d{1,2}))?$",
    )
    .unwrap()
});

static COORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@(?P<lat>[-+]?\d{2,3}(?:\.\d+)?)/(?P<lon>[-+]?\d{3}(?:\.\d+)?)$").unwrap()
});

static COORD_LAX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@(?P<lat>[-+]?\d{1,3}(?:\.\d+)?)/(?P<lon>[-+]?\d{1,3}(?:\.\d+)?)$").unwrap()
});

static LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<lang>[a-zA-Z]{2,3})(?:-(?P<suffix>[a-zA-Z0-9][a-zA-Z0-9-]*))?$").unwrap());

/// Parse a number or quantity body. Returns `None` when unparseable.
pub fn parse_number_or_quantity(value: &str, _options: &ValueOptions) -> Option<ParsedValue> {
    // Whitespace around an otherwise valid number is confidently repairable.
    let trimmed = value.trim();
    let repaired = if trimmed != value && !trimmed.is_empty() {
        Some(trimmed.to_string())
    } else {
        None
    };

    if let Some(caps) = HEX_RE.captures(trimmed) {
        let radix = match &caps["radix"] {
            "x" => 16,
            "o" => 8,
            _ => 2,
        };
        let magnitude = i64::from_str_radix(&caps["digits"], radix).ok()?;
        let signed = if &caps["sign"] == "-" { -magnitude } else { magnitude };
        return Some(ParsedValue {
            fields: ValueFields {
                numberstr: Some(trimmed.to_string()),
                number: Some(signed as f64),
                ..ValueFields::default()
            },
            repaired,
        });
    }

    if let Some(caps) = NUMBER_RE.captures(trimmed) {
        let number: f64 = caps["number"].parse().ok()?;
        return Some(ParsedValue {
            fields: ValueFields {
                numberstr: Some(caps["number"].to_string()),
                number: Some(number),
                ..ValueFields::default()
            },
            repaired,
        });
    }

    let caps = QUANTITY_RE.captures(trimmed)?;
    let number: f64 = caps["number"].parse().ok()?;
    let si_units = caps.name("si").map(|m| m.as_str().to_string());
    let units_node = caps.name("unode").map(|m| m.as_str().to_string());
    // A bare number with neither tolerance nor units is not a quantity;
    // it was already handled above, so here at least one must be present.
    if si_units.is_none() && units_node.is_none() && caps.name("low").is_none() {
        return None;
    }
    Some(ParsedValue {
        fields: ValueFields {
            numberstr: Some(caps["number"].to_string()),
            number: Some(number),
            low_tolerance: caps.name("low").and_then(|m| m.as_str().parse().ok()),
            high_tolerance: caps.name("high").and_then(|m| m.as_str().parse().ok()),
            si_units,
            units_node,
            ..ValueFields::default()
        },
        repaired,
    })
}

/// Parse a `^`-prefixed date/time value.
pub fn parse_date_and_times(value: &str, options: &ValueOptions) -> Option<ParsedValue> {
    let mut candidate = value.to_string();
    let mut repaired = None;

    // Locate zero month/day spans first so a repair touches nothing else.
    let zero_spans: Vec<usize> = {
        let caps = DATE_RE.captures(&candidate)?;
        ["month", "day"]
            .iter()
            .filter_map(|group| caps.name(group))
            .filter(|m| m.as_str() == "00")
            .map(|m| m.end() - 1)
            .collect()
    };
    if !zero_spans.is_empty() {
        if options.repair_month_or_day_zero {
            let mut bytes = candidate.into_bytes();
            for end in zero_spans {
                bytes[end] = b'1';
            }
            candidate = String::from_utf8(bytes).ok()?;
            repaired = Some(candidate.clone());
        } else if !options.allow_month_or_day_zero {
            return None;
        }
    }
    let caps = DATE_RE.captures(&candidate)?;

    let year: i32 = caps["year"].parse().ok()?;
    if year < options.minimum_valid_year || year > options.maximum_valid_year {
        return None;
    }
    let month: Option<u32> = caps.name("month").and_then(|m| m.as_str().parse().ok());
    let day: Option<u32> = caps.name("day").and_then(|m| m.as_str().parse().ok());
    if let Some(m) = month {
        if m > 12 {
            return None;
        }
    }
    if let Some(d) = day {
        if d > 31 {
            return None;
        }
    }
    let hour: Option<u32> = caps.name("hour").and_then(|m| m.as_str().parse().ok());
    let minute: Option<u32> = caps.name("minute").and_then(|m| m.as_str().parse().ok());
    let second: Option<u32> = caps.name("second").and_then(|m| m.as_str().parse().ok());
    if hour.map(|h| h > 24).unwrap_or(false)
        || minute.map(|m| m > 59).unwrap_or(false)
        || second.map(|s| s > 61).unwrap_or(false)
    {
        return None;
    }

    let body_end = candidate.rfind('/').filter(|_| caps.name("precision").is_some());
    let body = match body_end {
        Some(end) => candidate[1..end].to_string(),
        None => candidate[1..].to_string(),
    };

    Some(ParsedValue {
        fields: ValueFields {
            date_and_times: Some(body),
            year: Some(year),
            month,
            day,
            hour,
            minute,
            second,
            zonestr: Some(caps.name("zone").map(|m| m.as_str()).unwrap_or("").to_string()),
            precision: caps.name("precision").and_then(|m| m.as_str().parse().ok()),
            ..ValueFields::default()
        },
        repaired,
    })
}

/// Parse an `@lat/lon` location coordinate value.
pub fn parse_location_coordinates(value: &str, options: &ValueOptions) -> Option<ParsedValue> {
    let mut repaired = None;
    let caps = match COORD_RE.captures(value) {
        Some(caps) => caps,
        None => {
            if !(options.allow_lax_coordinates || options.repair_lax_coordinates) {
                return None;
            }
            let caps = COORD_LAX_RE.captures(value)?;
            if options.repair_lax_coordinates {
                let lat = pad_degrees(&caps["lat"], 3);
                let lon = pad_degrees(&caps["lon"], 3);
                repaired = Some(format!("@{lat}/{lon}"));
            }
            caps
        }
    };
    let latitude: f64 = caps["lat"].parse().ok()?;
    let longitude: f64 = caps["lon"].parse().ok()?;
    if !options.allow_out_of_range_coordinates
        && (!(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude))
    {
        return None;
    }
    Some(ParsedValue {
        fields: ValueFields {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..ValueFields::default()
        },
        repaired,
    })
}

/// Zero-pad the degree part of a coordinate component to `width` digits.
fn pad_degrees(component: &str, width: usize) -> String {
    let (sign, rest) = match component.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", component.strip_prefix('+').unwrap_or(component)),
    };
    let (degrees, frac) = match rest.find('.') {
        Some(dot) => (&rest[..dot], &rest[dot..]),
        None => (rest, ""),
    };
    format!("{sign}{degrees:0>width$}{frac}")
}

/// Parse a double-quoted string value.
pub fn parse_string(value: &str, options: &ValueOptions) -> Option<ParsedValue> {
    if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
        return None;
    }
    let interior = &value[1..value.len() - 1];
    if !options.allow_lax_strings && has_unescaped(interior, '"') {
        return None;
    }
    Some(ParsedValue::clean(ValueFields {
        text: Some(interior.to_string()),
        decoded_text: Some(decode_escapes(interior)),
        ..ValueFields::default()
    }))
}

/// Parse a single-quoted language-qualified string (`'text'@lang`).
pub fn parse_language_qualified_string(value: &str, options: &ValueOptions) -> Option<ParsedValue> {
    if !value.starts_with('\'') {
        return None;
    }
    let at = value.rfind("'@")?;
    if at == 0 {
        return None;
    }
    let interior = &value[1..at];
    if !options.allow_lax_lq_strings && has_unescaped(interior, '\'') {
        return None;
    }
    let caps = LANGUAGE_RE.captures(&value[at + 2..])?;
    Some(ParsedValue::clean(ValueFields {
        text: Some(interior.to_string()),
        decoded_text: Some(decode_escapes(interior)),
        language: Some(caps["lang"].to_lowercase()),
        language_suffix: caps.name("suffix").map(|m| m.as_str().to_string()),
        ..ValueFields::default()
    }))
}

/// Parse a boolean value.
pub fn parse_boolean(value: &str) -> Option<ParsedValue> {
    match value {
        "True" => Some(ParsedValue::clean(ValueFields {
            truth: Some(true),
            ..ValueFields::default()
        })),
        "False" => Some(ParsedValue::clean(ValueFields {
            truth: Some(false),
            ..ValueFields::default()
        })),
        _ => None,
    }
}

/// True if `needle` occurs unescaped (not preceded by a backslash).
fn has_unescaped(text: &str, needle: char) -> bool {
    let mut escaped = false;
    for ch in text.chars() {
        match ch {
            '\\' if !escaped => escaped = true,
            c if c == needle && !escaped => return true,
            _ => escaped = false,
        }
    }
    false
}

/// Decode backslash escapes into their literal characters.
fn decode_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_number() {
        let opts = ValueOptions::default();
        let parsed = parse_number_or_quantity("-3.14", &opts).unwrap();
        assert_eq!(parsed.fields.number, Some(-3.14));
        assert!(parsed.fields.si_units.is_none());
    }

    #[test]
    fn test_parse_quantity_with_tolerance_and_units() {
        let opts = ValueOptions::default();
        let parsed = parse_number_or_quantity("+12[10,14]m", &opts).unwrap();
        assert_eq!(parsed.fields.number, Some(12.0));
        assert_eq!(parsed.fields.low_tolerance, Some(10.0));
        assert_eq!(parsed.fields.high_tolerance, Some(14.0));
        assert_eq!(parsed.fields.si_units.as_deref(), Some("m"));
    }

    #[test]
    fn test_parse_quantity_unit_node() {
        let opts = ValueOptions::default();
        let parsed = parse_number_or_quantity("12Q212", &opts).unwrap();
        assert_eq!(parsed.fields.units_node.as_deref(), Some("Q212"));
        assert!(parsed.fields.si_units.is_none());
    }

    #[test]
    fn test_number_whitespace_repair() {
        let opts = ValueOptions::default();
        let parsed = parse_number_or_quantity(" 12 ", &opts).unwrap();
        assert_eq!(parsed.repaired.as_deref(), Some("12"));
        assert_eq!(parsed.fields.number, Some(12.0));
    }

    #[test]
    fn test_parse_date() {
        let opts = ValueOptions::default();
        let parsed = parse_date_and_times("^1960-11-05T13:45:12Z", &opts).unwrap();
        assert_eq!(parsed.fields.year, Some(1960));
        assert_eq!(parsed.fields.month, Some(11));
        assert_eq!(parsed.fields.day, Some(5));
        assert_eq!(parsed.fields.hour, Some(13));
        assert_eq!(parsed.fields.zonestr.as_deref(), Some("Z"));
    }

    #[test]
    fn test_date_month_zero() {
        let strict = ValueOptions::default();
        assert!(parse_date_and_times("^1960-00-05", &strict).is_none());

        let repair = ValueOptions {
            repair_month_or_day_zero: true,
            ..ValueOptions::default()
        };
        let parsed = parse_date_and_times("^1960-00-05", &repair).unwrap();
        assert_eq!(parsed.repaired.as_deref(), Some("^1960-01-05"));
        assert_eq!(parsed.fields.month, Some(1));
    }

    #[test]
    fn test_date_year_range() {
        let opts = ValueOptions::default();
        assert!(parse_date_and_times("^0900-01-01", &opts).is_none());
        assert!(parse_date_and_times("^1900-01-01", &opts).is_some());
    }

    #[test]
    fn test_parse_coordinates() {
        let opts = ValueOptions::default();
        let parsed = parse_location_coordinates("@043.26/010.92", &opts).unwrap();
        assert_eq!(parsed.fields.latitude, Some(43.26));
        assert_eq!(parsed.fields.longitude, Some(10.92));

        assert!(parse_location_coordinates("@3.2/010.92", &opts).is_none());
        let repair = ValueOptions {
            repair_lax_coordinates: true,
            ..ValueOptions::default()
        };
        let parsed = parse_location_coordinates("@3.2/10.92", &repair).unwrap();
        assert_eq!(parsed.repaired.as_deref(), Some("@003.2/010.92"));
    }

    #[test]
    fn test_parse_strings() {
        let opts = ValueOptions::default();
        let parsed = parse_string("\"hello\\tworld\"", &opts).unwrap();
        assert_eq!(parsed.fields.decoded_text.as_deref(), Some("hello\tworld"));
        assert!(parse_string("\"broken \" quote\"", &opts).is_none());

        let parsed = parse_language_qualified_string("'bonjour'@fr-CA", &opts).unwrap();
        assert_eq!(parsed.fields.language.as_deref(), Some("fr"));
        assert_eq!(parsed.fields.language_suffix.as_deref(), Some("CA"));
    }

    #[test]
    fn test_naive_datetime() {
        let opts = ValueOptions::default();
        let parsed = parse_date_and_times("^1960-11-05T13:45:12Z", &opts).unwrap();
        let dt = parsed.fields.naive_datetime().unwrap();
        assert_eq!(dt.to_string(), "1960-11-05 13:45:12");

        // Day 31 passes syntax but is not a real February date.
        let parsed = parse_date_and_times("^1960-02-31", &opts).unwrap();
        assert!(parsed.fields.naive_datetime().is_none());
    }

    #[test]
    fn test_fields_get() {
        let opts = ValueOptions::default();
        let parsed = parse_date_and_times("^1960-11-05", &opts).unwrap();
        assert_eq!(parsed.fields.get("year").as_deref(), Some("1960"));
        assert_eq!(parsed.fields.get("month").as_deref(), Some("11"));
        assert_eq!(parsed.fields.get("hour"), None);
        assert_eq!(parsed.fields.get("bogus"), None);
    }
}
