//! A single KGTK cell value with lazy classification and validation.

use crate::error::{KgtkError, Result};

use super::datatype::{self, KgtkDatatype};
use super::fields::{self, ValueFields};
use super::options::ValueOptions;

/// One cell's string together with its lazily-computed classification and,
/// on demand, parsed sub-fields. Validation may repair the stored string
/// in place when a confident fix exists.
#[derive(Debug, Clone)]
pub struct KgtkValue {
    value: String,
    options: ValueOptions,
    datatype: Option<KgtkDatatype>,
    fields: Option<ValueFields>,
    valid: Option<bool>,
    repaired: bool,
}

impl KgtkValue {
    /// Wrap a cell string. No parsing happens until requested.
    pub fn new(value: impl Into<String>, options: &ValueOptions) -> Self {
        Self {
            value: value.into(),
            options: options.clone(),
            datatype: None,
            fields: None,
            valid: None,
            repaired: false,
        }
    }

    /// The current cell string (possibly repaired).
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True if validation rewrote the stored string.
    pub fn was_repaired(&self) -> bool {
        self.repaired
    }

    /// Classify the value, caching the result.
    pub fn classify(&mut self) -> KgtkDatatype {
        if let Some(dt) = self.datatype {
            return dt;
        }
        let dt = datatype::classify(&self.value);
        self.datatype = Some(dt);
        dt
    }

    /// Validate the value against its classified datatype. Malformed input
    /// yields `false`, never an error. When repair rewrites the string the
    /// value is re-classified from the repaired form.
    pub fn validate(&mut self) -> bool {
        if let Some(valid) = self.valid {
            return valid;
        }
        let valid = self.validate_uncached();
        self.valid = Some(valid);
        valid
    }

    fn validate_uncached(&mut self) -> bool {
        match self.classify() {
            KgtkDatatype::Empty | KgtkDatatype::Symbol => true,
            KgtkDatatype::Boolean => fields::parse_boolean(&self.value).is_some(),
            KgtkDatatype::List => {
                let items = datatype::split_list(&self.value);
                let mut repaired_items = Vec::with_capacity(items.len());
                let mut any_repaired = false;
                for item in &items {
                    // Empty items inside a list are malformed.
                    if item.is_empty() {
                        return false;
                    }
                    let mut sub = KgtkValue::new(item.clone(), &self.options);
                    if !sub.validate() {
                        return false;
                    }
                    if sub.was_repaired() {
                        any_repaired = true;
                    }
                    repaired_items.push(sub.value().to_string());
                }
                if any_repaired {
                    self.apply_repair(repaired_items.join("|"));
                }
                self.fields = Some(ValueFields {
                    list_len: Some(items.len()),
                    ..ValueFields::default()
                });
                true
            }
            KgtkDatatype::Number | KgtkDatatype::Quantity => {
                self.accept(fields::parse_number_or_quantity(&self.value, &self.options.clone()))
            }
            KgtkDatatype::String => {
                self.accept(fields::parse_string(&self.value, &self.options.clone()))
            }
            KgtkDatatype::LanguageQualifiedString => self.accept(
                fields::parse_language_qualified_string(&self.value, &self.options.clone()),
            ),
            KgtkDatatype::DateAndTimes => {
                self.accept(fields::parse_date_and_times(&self.value, &self.options.clone()))
            }
            KgtkDatatype::LocationCoordinates => self.accept(
                fields::parse_location_coordinates(&self.value, &self.options.clone()),
            ),
        }
    }

    fn accept(&mut self, parsed: Option<fields::ParsedValue>) -> bool {
        match parsed {
            Some(parsed) => {
                if let Some(repaired) = parsed.repaired {
                    self.apply_repair(repaired);
                }
                self.fields = Some(parsed.fields);
                true
            }
            None => false,
        }
    }

    fn apply_repair(&mut self, repaired: String) {
        if repaired != self.value {
            self.value = repaired;
            self.repaired = true;
            // Re-derive the classification from the repaired text.
            self.datatype = Some(datatype::classify(&self.value));
        }
    }

    /// The parsed sub-fields. Only meaningful after a successful
    /// [`Self::validate`]; an unparseable value yields an all-empty record.
    pub fn fields(&mut self) -> ValueFields {
        self.validate();
        self.fields.clone().unwrap_or_default()
    }

    /// Decompose a list value into its member values. A non-list value
    /// yields itself as the single member.
    pub fn list_items(&self) -> Vec<KgtkValue> {
        if datatype::classify(&self.value) == KgtkDatatype::List {
            datatype::split_list(&self.value)
                .into_iter()
                .map(|item| KgtkValue::new(item, &self.options))
                .collect()
        } else {
            vec![KgtkValue::new(self.value.clone(), &self.options)]
        }
    }

    /// Add two numeric values, failing when their unit forms differ.
    /// Two quantities are compatible only when both carry the same SI-unit
    /// suffix, the same unit-node reference, or no units at all.
    pub fn checked_add(&mut self, other: &mut KgtkValue) -> Result<f64> {
        let left = self.numeric_fields()?;
        let right = other.numeric_fields()?;
        if !units_compatible(&left, &right) {
            return Err(KgtkError::IncompatibleUnits {
                left: describe_units(&left),
                right: describe_units(&right),
            });
        }
        // numeric_fields guarantees the magnitudes are present.
        Ok(left.number.unwrap_or(0.0) + right.number.unwrap_or(0.0))
    }

    fn numeric_fields(&mut self) -> Result<ValueFields> {
        let dt = self.classify();
        if !dt.is_numeric() || !self.validate() {
            return Err(KgtkError::IncompatibleUnits {
                left: format!("non-numeric value '{}'", self.value),
                right: String::new(),
            });
        }
        Ok(self.fields())
    }
}

/// True when arithmetic over the two quantities is meaningful.
pub fn units_compatible(left: &ValueFields, right: &ValueFields) -> bool {
    left.si_units == right.si_units && left.units_node == right.units_node
}

fn describe_units(fields: &ValueFields) -> String {
    fields
        .si_units
        .clone()
        .or_else(|| fields.units_node.clone())
        .unwrap_or_else(|| "(unitless)".to_string())
}

/// One-shot validation of a cell: returns whether the cell is valid and,
/// when repair produced a different string, the repaired form.
pub fn validate_cell(cell: &str, options: &ValueOptions) -> (bool, Option<String>) {
    let mut value = KgtkValue::new(cell, options);
    let valid = value.validate();
    let repaired = if value.was_repaired() {
        Some(value.value().to_string())
    } else {
        None
    };
    (valid, repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_symbol_and_empty() {
        let opts = ValueOptions::default();
        assert!(KgtkValue::new("Q42", &opts).validate());
        assert!(KgtkValue::new("", &opts).validate());
    }

    #[test]
    fn test_validate_malformed_never_panics() {
        let opts = ValueOptions::default();
        for bad in ["\"unterminated", "^налог", "@x/y", "'no-lang'", "12[3m"] {
            let mut value = KgtkValue::new(bad, &opts);
            assert!(!value.validate(), "expected invalid: {bad}");
        }
    }

    #[test]
    fn test_repair_is_observable() {
        let opts = ValueOptions::default();
        let (valid, repaired) = validate_cell(" 12 ", &opts);
        assert!(valid);
        assert_eq!(repaired.as_deref(), Some("12"));

        let (valid, repaired) = validate_cell("12", &opts);
        assert!(valid);
        assert!(repaired.is_none());
    }

    #[test]
    fn test_repair_idempotent() {
        let opts = ValueOptions {
            repair_month_or_day_zero: true,
            ..ValueOptions::default()
        };
        let (_, once) = validate_cell("^1960-00-05", &opts);
        let (_, twice) = validate_cell(once.as_deref().unwrap(), &opts);
        assert!(twice.is_none());
    }

    #[test]
    fn test_list_decomposition() {
        let opts = ValueOptions::default();
        let value = KgtkValue::new("a|\"b\"|12", &opts);
        let mut items = value.list_items();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].classify(), KgtkDatatype::String);
        assert!(KgtkValue::new("a||b", &opts).validate() == false);
    }

    #[test]
    fn test_incompatible_units() {
        let opts = ValueOptions::default();
        let mut metres = KgtkValue::new("12m", &opts);
        let mut feet = KgtkValue::new("3ft", &opts);
        let mut more_metres = KgtkValue::new("5m", &opts);

        assert!(metres.checked_add(&mut feet).is_err());
        assert_eq!(metres.checked_add(&mut more_metres).unwrap(), 17.0);

        let mut node_unit = KgtkValue::new("5Q11573", &opts);
        assert!(metres.checked_add(&mut node_unit).is_err());
    }
}
