//! Configuration for value validation and repair.

use serde::{Deserialize, Serialize};

/// Options governing how strict value validation is and which repairs
/// are attempted. Read-only once the consumer is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueOptions {
    /// Accept internal unescaped double quotes in strings.
    pub allow_lax_strings: bool,
    /// Accept internal unescaped single quotes in language-qualified strings.
    pub allow_lax_lq_strings: bool,
    /// Accept `00` as a month or day.
    pub allow_month_or_day_zero: bool,
    /// Rewrite a `00` month or day to `01`.
    pub repair_month_or_day_zero: bool,
    /// Accept coordinates without zero-padded degree fields.
    pub allow_lax_coordinates: bool,
    /// Rewrite lax coordinates into the padded canonical form.
    pub repair_lax_coordinates: bool,
    /// Years below this are invalid (unless clamped).
    pub minimum_valid_year: i32,
    /// Years above this are invalid (unless clamped).
    pub maximum_valid_year: i32,
    /// Accept out-of-range latitude/longitude values.
    pub allow_out_of_range_coordinates: bool,
}

impl Default for ValueOptions {
    fn default() -> Self {
        Self {
            allow_lax_strings: false,
            allow_lax_lq_strings: false,
            allow_month_or_day_zero: false,
            repair_month_or_day_zero: false,
            allow_lax_coordinates: false,
            repair_lax_coordinates: false,
            minimum_valid_year: 1583,
            maximum_valid_year: 2100,
            allow_out_of_range_coordinates: false,
        }
    }
}

impl ValueOptions {
    /// A permissive option set that accepts every lax form.
    pub fn lax() -> Self {
        Self {
            allow_lax_strings: true,
            allow_lax_lq_strings: true,
            allow_month_or_day_zero: true,
            repair_month_or_day_zero: false,
            allow_lax_coordinates: true,
            repair_lax_coordinates: false,
            allow_out_of_range_coordinates: true,
            ..Self::default()
        }
    }
}
