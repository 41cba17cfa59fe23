//! The closed set of property-pattern actions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KgtkError;

/// One constraint kind a pattern row may declare. The `label` cell of a
/// pattern row must parse to exactly one of these symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternAction {
    Node1Type,
    Node1IsValid,
    Node1AllowList,
    Node1Values,
    Node1Pattern,
    LabelPattern,
    LabelAllowList,
    Reject,
    Node2Column,
    Node2AllowList,
    Node2Type,
    Node2NotType,
    Node2IsValid,
    Node2Values,
    Node2NotValues,
    Node2Pattern,
    Node2NotPattern,
    Node2Blank,
    Node2NotBlank,
    Node2Chain,
    Minval,
    Maxval,
    GreaterThan,
    LessThan,
    EqualTo,
    NotEqualTo,
    Mindate,
    Maxdate,
    GreaterThanDate,
    LessThanDate,
    EqualToDate,
    NotEqualToDate,
    IdAllowList,
    IdPattern,
    IdNotPattern,
    IdBlank,
    IdNotBlank,
    IdChain,
    FieldName,
    FieldValues,
    FieldNotValues,
    FieldPattern,
    FieldNotPattern,
    FieldBlank,
    FieldNotBlank,
    Minoccurs,
    Maxoccurs,
    Mustoccur,
    Mindistinct,
    Maxdistinct,
    Requires,
    Prohibits,
    Isa,
    Switch,
    Nextcase,
    Matches,
    Unknown,
    Groupbyprop,
}

/// What shape of payload the `node2` cell of a pattern row must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Exactly one number; repeated rows are a load error.
    SingleNumber,
    /// A mergeable set of numbers.
    Numbers,
    /// Regular expressions, compiled at load.
    Patterns,
    /// Type / datatype / column names.
    Names,
    /// Literal string values.
    Values,
    /// A truth value.
    Boolean,
    /// Dates, parsed at load.
    Dates,
}

impl PatternAction {
    pub const ALL: &'static [PatternAction] = &[
        PatternAction::Node1Type,
        PatternAction::Node1IsValid,
        PatternAction::Node1AllowList,
        PatternAction::Node1Values,
        PatternAction::Node1Pattern,
        PatternAction::LabelPattern,
        PatternAction::LabelAllowList,
        PatternAction::Reject,
        PatternAction::Node2Column,
        PatternAction::Node2AllowList,
        PatternAction::Node2Type,
        PatternAction::Node2NotType,
        PatternAction::Node2IsValid,
        PatternAction::Node2Values,
        PatternAction::Node2NotValues,
        PatternAction::Node2Pattern,
        PatternAction::Node2NotPattern,
        PatternAction::Node2Blank,
        PatternAction::Node2NotBlank,
        PatternAction::Node2Chain,
        PatternAction::Minval,
        PatternAction::Maxval,
        PatternAction::GreaterThan,
        PatternAction::LessThan,
        PatternAction::EqualTo,
        PatternAction::NotEqualTo,
        PatternAction::Mindate,
        PatternAction::Maxdate,
        PatternAction::GreaterThanDate,
        PatternAction::LessThanDate,
        PatternAction::EqualToDate,
        PatternAction::NotEqualToDate,
        PatternAction::IdAllowList,
        PatternAction::IdPattern,
        PatternAction::IdNotPattern,
        PatternAction::IdBlank,
        PatternAction::IdNotBlank,
        PatternAction::IdChain,
        PatternAction::FieldName,
        PatternAction::FieldValues,
        PatternAction::FieldNotValues,
        PatternAction::FieldPattern,
        PatternAction::FieldNotPattern,
        PatternAction::FieldBlank,
        PatternAction::FieldNotBlank,
        PatternAction::Minoccurs,
        PatternAction::Maxoccurs,
        PatternAction::Mustoccur,
        PatternAction::Mindistinct,
        PatternAction::Maxdistinct,
        PatternAction::Requires,
        PatternAction::Prohibits,
        PatternAction::Isa,
        PatternAction::Switch,
        PatternAction::Nextcase,
        PatternAction::Matches,
        PatternAction::Unknown,
        PatternAction::Groupbyprop,
    ];

    /// The canonical lowercase symbol used in pattern files.
    pub fn as_symbol(&self) -> &'static str {
        match self {
            PatternAction::Node1Type => "node1_type",
            PatternAction::Node1IsValid => "node1_is_valid",
            PatternAction::Node1AllowList => "node1_allow_list",
            PatternAction::Node1Values => "node1_values",
            PatternAction::Node1Pattern => "node1_pattern",
            PatternAction::LabelPattern => "label_pattern",
            PatternAction::LabelAllowList => "label_allow_list",
            PatternAction::Reject => "reject",
            PatternAction::Node2Column => "node2_column",
            PatternAction::Node2AllowList => "node2_allow_list",
            PatternAction::Node2Type => "node2_type",
            PatternAction::Node2NotType => "node2_not_type",
            PatternAction::Node2IsValid => "node2_is_valid",
            PatternAction::Node2Values => "node2_values",
            PatternAction::Node2NotValues => "node2_not_values",
            PatternAction::Node2Pattern => "node2_pattern",
            PatternAction::Node2NotPattern => "node2_not_pattern",
            PatternAction::Node2Blank => "node2_blank",
            PatternAction::Node2NotBlank => "node2_not_blank",
            PatternAction::Node2Chain => "node2_chain",
            PatternAction::Minval => "minval",
            PatternAction::Maxval => "maxval",
            PatternAction::GreaterThan => "greater_than",
            PatternAction::LessThan => "less_than",
            PatternAction::EqualTo => "equal_to",
            PatternAction::NotEqualTo => "not_equal_to",
            PatternAction::Mindate => "mindate",
            PatternAction::Maxdate => "maxdate",
            PatternAction::GreaterThanDate => "greater_than_date",
            PatternAction::LessThanDate => "less_than_date",
            PatternAction::EqualToDate => "equal_to_date",
            PatternAction::NotEqualToDate => "not_equal_to_date",
            PatternAction::IdAllowList => "id_allow_list",
            PatternAction::IdPattern => "id_pattern",
            PatternAction::IdNotPattern => "id_not_pattern",
            PatternAction::IdBlank => "id_blank",
            PatternAction::IdNotBlank => "id_not_blank",
            PatternAction::IdChain => "id_chain",
            PatternAction::FieldName => "field_name",
            PatternAction::FieldValues => "field_values",
            PatternAction::FieldNotValues => "field_not_values",
            PatternAction::FieldPattern => "field_pattern",
            PatternAction::FieldNotPattern => "field_not_pattern",
            PatternAction::FieldBlank => "field_blank",
            PatternAction::FieldNotBlank => "field_not_blank",
            PatternAction::Minoccurs => "minoccurs",
            PatternAction::Maxoccurs => "maxoccurs",
            PatternAction::Mustoccur => "mustoccur",
            PatternAction::Mindistinct => "mindistinct",
            PatternAction::Maxdistinct => "maxdistinct",
            PatternAction::Requires => "requires",
            PatternAction::Prohibits => "prohibits",
            PatternAction::Isa => "isa",
            PatternAction::Switch => "switch",
            PatternAction::Nextcase => "nextcase",
            PatternAction::Matches => "matches",
            PatternAction::Unknown => "unknown",
            PatternAction::Groupbyprop => "groupbyprop",
        }
    }

    /// The payload shape this action requires in `node2`.
    pub fn payload_kind(&self) -> PayloadKind {
        use PatternAction::*;
        match self {
            Minval | Maxval | GreaterThan | LessThan | Minoccurs | Maxoccurs | Mindistinct
            | Maxdistinct => PayloadKind::SingleNumber,
            EqualTo | NotEqualTo => PayloadKind::Numbers,
            Node1Pattern | LabelPattern | Node2Pattern | Node2NotPattern | IdPattern
            | IdNotPattern | FieldPattern | FieldNotPattern | Matches => PayloadKind::Patterns,
            Node1Type | Node2Type | Node2NotType | Node2Column | FieldName | Requires
            | Prohibits | Isa | Switch | Nextcase | Node2Chain | IdChain => PayloadKind::Names,
            Node1Values | Node2Values | Node2NotValues | FieldValues | FieldNotValues => {
                PayloadKind::Values
            }
            Node1IsValid | Node1AllowList | LabelAllowList | Reject | Node2AllowList
            | Node2IsValid | Node2Blank | Node2NotBlank | IdAllowList | IdBlank | IdNotBlank
            | FieldBlank | FieldNotBlank | Mustoccur | Unknown | Groupbyprop => {
                PayloadKind::Boolean
            }
            Mindate | Maxdate | GreaterThanDate | LessThanDate | EqualToDate
            | NotEqualToDate => PayloadKind::Dates,
        }
    }
}

impl fmt::Display for PatternAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

impl FromStr for PatternAction {
    type Err = KgtkError;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        let lowered = symbol.to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|action| action.as_symbol() == lowered)
            .copied()
            .ok_or_else(|| KgtkError::UnknownAction(symbol.to_string()))
    }
}
