//! KGTK cell datatype classification.
//!
//! Classification is purely syntactic: it looks at the leading sigil (and
//! list separators) of a cell and never fails. Full syntax checking happens
//! later, in [`crate::value::KgtkValue::validate`].

use serde::{Deserialize, Serialize};

/// The classified kind of a single KGTK cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KgtkDatatype {
    /// The empty string.
    Empty,
    /// A `|`-separated list of values.
    List,
    /// An integer or floating-point number.
    Number,
    /// A number with optional tolerance and/or units.
    Quantity,
    /// A double-quoted string.
    String,
    /// A single-quoted string with an `@lang` suffix.
    LanguageQualifiedString,
    /// `@lat/lon` location coordinates.
    LocationCoordinates,
    /// A `^`-prefixed ISO-8601-like date/time.
    DateAndTimes,
    /// `True` or `False`.
    Boolean,
    /// Anything else: a bare symbol.
    Symbol,
}

impl KgtkDatatype {
    /// Human-readable name, matching the symbols used in property patterns.
    pub fn as_str(&self) -> &'static str {
        match self {
            KgtkDatatype::Empty => "empty",
            KgtkDatatype::List => "list",
            KgtkDatatype::Number => "number",
            KgtkDatatype::Quantity => "quantity",
            KgtkDatatype::String => "string",
            KgtkDatatype::LanguageQualifiedString => "language_qualified_string",
            KgtkDatatype::LocationCoordinates => "location_coordinates",
            KgtkDatatype::DateAndTimes => "date_and_times",
            KgtkDatatype::Boolean => "boolean",
            KgtkDatatype::Symbol => "symbol",
        }
    }

    /// Parse a datatype symbol as used in property pattern rules.
    pub fn from_symbol(symbol: &str) -> Option<KgtkDatatype> {
        match symbol {
            "empty" => Some(KgtkDatatype::Empty),
            "list" => Some(KgtkDatatype::List),
            "number" => Some(KgtkDatatype::Number),
            "quantity" => Some(KgtkDatatype::Quantity),
            "string" => Some(KgtkDatatype::String),
            "language_qualified_string" => Some(KgtkDatatype::LanguageQualifiedString),
            "location_coordinates" => Some(KgtkDatatype::LocationCoordinates),
            "date_and_times" => Some(KgtkDatatype::DateAndTimes),
            "boolean" => Some(KgtkDatatype::Boolean),
            "symbol" => Some(KgtkDatatype::Symbol),
            _ => None,
        }
    }

    /// Returns true for the two numeric kinds.
    pub fn is_numeric(&self) -> bool {
        matches!(self, KgtkDatatype::Number | KgtkDatatype::Quantity)
    }
}

impl std::fmt::Display for KgtkDatatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a cell string. Pure and total: never fails on any UTF-8 input.
pub fn classify(value: &str) -> KgtkDatatype {
    if value.is_empty() {
        return KgtkDatatype::Empty;
    }
    if has_list_separator(value) {
        return KgtkDatatype::List;
    }
    // Whitespace-wrapped numbers classify through their trimmed form so the
    // numeric whitespace repair can reach them. Whitespace around any other
    // sigil carries no repair and stays a symbol.
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        return match trimmed.as_bytes().first() {
            Some(b'0'..=b'9' | b'+' | b'-' | b'.') => {
                if looks_like_plain_number(trimmed) {
                    KgtkDatatype::Number
                } else {
                    KgtkDatatype::Quantity
                }
            }
            _ => KgtkDatatype::Symbol,
        };
    }
    match value.as_bytes()[0] {
        b'"' => KgtkDatatype::String,
        b'\'' => KgtkDatatype::LanguageQualifiedString,
        b'^' => KgtkDatatype::DateAndTimes,
        b'@' => KgtkDatatype::LocationCoordinates,
        b'0'..=b'9' | b'+' | b'-' | b'.' => {
            if looks_like_plain_number(value) {
                KgtkDatatype::Number
            } else {
                KgtkDatatype::Quantity
            }
        }
        _ => {
            if value == "True" || value == "False" {
                KgtkDatatype::Boolean
            } else {
                KgtkDatatype::Symbol
            }
        }
    }
}

/// True if the value contains an unescaped `|` list separator.
pub fn has_list_separator(value: &str) -> bool {
    let mut escaped = false;
    for ch in value.chars() {
        match ch {
            '\\' if !escaped => escaped = true,
            '|' if !escaped => return true,
            _ => escaped = false,
        }
    }
    false
}

/// Split a list value on unescaped `|` separators.
pub fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for ch in value.chars() {
        match ch {
            '\\' if !escaped => {
                escaped = true;
                current.push(ch);
            }
            '|' if !escaped => {
                items.push(std::mem::take(&mut current));
            }
            _ => {
                escaped = false;
                current.push(ch);
            }
        }
    }
    items.push(current);
    items
}

/// Cheap test distinguishing plain numbers from quantities. A plain number
/// is all digits with at most one sign, one decimal point, and one exponent.
fn looks_like_plain_number(value: &str) -> bool {
    let mut rest = value;
    if rest.starts_with('+') || rest.starts_with('-') {
        rest = &rest[1..];
    }
    if rest.is_empty() {
        return false;
    }
    // Hex/octal/binary integers count as numbers.
    if rest.starts_with("0x") || rest.starts_with("0o") || rest.starts_with("0b") {
        let digits = &rest[2..];
        return !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_alphanumeric())
            && match &rest[..2] {
                "0x" => digits.chars().all(|c| c.is_ascii_hexdigit()),
                "0o" => digits.chars().all(|c| ('0'..='7').contains(&c)),
                _ => digits.chars().all(|c| c == '0' || c == '1'),
            };
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            'e' | 'E' => {
                if !seen_digit {
                    return false;
                }
                // Exponent: optional sign then digits only.
                let mut exp = chars.clone();
                if matches!(exp.peek(), Some('+') | Some('-')) {
                    exp.next();
                }
                let mut any = false;
                for e in exp {
                    if !e.is_ascii_digit() {
                        return false;
                    }
                    any = true;
                }
                return any;
            }
            _ => return false,
        }
    }
    seen_digit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_basic_kinds() {
        assert_eq!(classify(""), KgtkDatatype::Empty);
        assert_eq!(classify("Q42"), KgtkDatatype::Symbol);
        assert_eq!(classify("\"hello\""), KgtkDatatype::String);
        assert_eq!(classify("'hello'@en"), KgtkDatatype::LanguageQualifiedString);
        assert_eq!(classify("^1960-11-05T00:00:00Z"), KgtkDatatype::DateAndTimes);
        assert_eq!(classify("@043.26/010.92"), KgtkDatatype::LocationCoordinates);
        assert_eq!(classify("True"), KgtkDatatype::Boolean);
        assert_eq!(classify("False"), KgtkDatatype::Boolean);
    }

    #[test]
    fn test_classify_numbers_and_quantities() {
        assert_eq!(classify("42"), KgtkDatatype::Number);
        assert_eq!(classify("-3.14"), KgtkDatatype::Number);
        assert_eq!(classify("1e10"), KgtkDatatype::Number);
        assert_eq!(classify("0x1f"), KgtkDatatype::Number);
        assert_eq!(classify("12m"), KgtkDatatype::Quantity);
        assert_eq!(classify("+12[10,14]m"), KgtkDatatype::Quantity);
        assert_eq!(classify("12Q212"), KgtkDatatype::Quantity);
    }

    #[test]
    fn test_classify_whitespace_wrapped_numbers() {
        assert_eq!(classify(" 12 "), KgtkDatatype::Number);
        assert_eq!(classify(" -3.14"), KgtkDatatype::Number);
        assert_eq!(classify(" 12m "), KgtkDatatype::Quantity);
        assert_eq!(classify(" Q42"), KgtkDatatype::Symbol);
        assert_eq!(classify("   "), KgtkDatatype::Symbol);
    }

    #[test]
    fn test_classify_lists() {
        assert_eq!(classify("a|b"), KgtkDatatype::List);
        assert_eq!(classify("a\\|b"), KgtkDatatype::Symbol);
        assert_eq!(split_list("a|b|c"), vec!["a", "b", "c"]);
        assert_eq!(split_list("a\\|b|c"), vec!["a\\|b", "c"]);
    }
}
