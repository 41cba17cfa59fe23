//! Loading property-pattern rule sets.
//!
//! A pattern file is itself an edge file: node1 names the property or
//! datatype being constrained, label is the action symbol, node2 the
//! payload. Repeated (key, action) rows merge; actions with a single-value
//! payload reject repetition at load time.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use regex::Regex;

use crate::error::{KgtkError, Result};
use crate::io::columns::KgtkColumns;
use crate::io::reader::KgtkReader;
use crate::pattern::action::{PatternAction, PayloadKind};
use crate::value::{KgtkValue, ValueOptions};

/// A date payload bound, kept with its source text for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct DateBound {
    pub raw: String,
    pub key: (i32, u32, u32, u32, u32, u32),
}

/// The typed payload of one accumulated pattern.
#[derive(Debug, Clone)]
pub enum PatternPayload {
    Number(f64),
    Numbers(Vec<f64>),
    Patterns(Vec<Regex>),
    /// Insertion-ordered: SWITCH candidates try in declaration order.
    Names(IndexSet<String>),
    Values(HashSet<String>),
    Boolean(bool),
    Dates(Vec<DateBound>),
}

impl PatternPayload {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PatternPayload::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            PatternPayload::Numbers(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn as_patterns(&self) -> Option<&[Regex]> {
        match self {
            PatternPayload::Patterns(ps) => Some(ps),
            _ => None,
        }
    }

    pub fn as_names(&self) -> Option<&IndexSet<String>> {
        match self {
            PatternPayload::Names(ns) => Some(ns),
            _ => None,
        }
    }

    pub fn as_values(&self) -> Option<&HashSet<String>> {
        match self {
            PatternPayload::Values(vs) => Some(vs),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PatternPayload::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_dates(&self) -> Option<&[DateBound]> {
        match self {
            PatternPayload::Dates(ds) => Some(ds),
            _ => None,
        }
    }
}

/// One key's patterns, bucketed by the column each action inspects.
#[derive(Debug, Clone, Default)]
pub struct PropertyPatternLists {
    pub actions: IndexMap<PatternAction, PatternPayload>,
    pub node1_actions: Vec<PatternAction>,
    pub label_actions: Vec<PatternAction>,
    pub node2_actions: Vec<PatternAction>,
    pub id_actions: Vec<PatternAction>,
    pub field_actions: Vec<PatternAction>,
    pub tree_actions: Vec<PatternAction>,
    /// Redirect target when this key fails as a SWITCH candidate.
    pub nextcase: Option<String>,
    /// Alternate column standing in for node2 under this key.
    pub node2_column: Option<String>,
}

impl PropertyPatternLists {
    pub fn get(&self, action: PatternAction) -> Option<&PatternPayload> {
        self.actions.get(&action)
    }

    pub fn boolean(&self, action: PatternAction) -> bool {
        self.get(action).and_then(|p| p.as_boolean()).unwrap_or(false)
    }

    fn compile(actions: IndexMap<PatternAction, PatternPayload>) -> PropertyPatternLists {
        use PatternAction::*;
        let mut lists = PropertyPatternLists {
            nextcase: actions
                .get(&Nextcase)
                .and_then(|p| p.as_names())
                .and_then(|names| names.iter().next().cloned()),
            node2_column: actions
                .get(&Node2Column)
                .and_then(|p| p.as_names())
                .and_then(|names| names.iter().next().cloned()),
            ..Default::default()
        };
        for action in actions.keys() {
            match action {
                Node1Type | Node1IsValid | Node1AllowList | Node1Values | Node1Pattern => {
                    lists.node1_actions.push(*action)
                }
                LabelPattern | LabelAllowList | Reject => lists.label_actions.push(*action),
                Node2AllowList | Node2Type | Node2NotType | Node2IsValid | Node2Values
                | Node2NotValues | Node2Pattern | Node2NotPattern | Node2Blank
                | Node2NotBlank | Node2Chain | Minval | Maxval | GreaterThan | LessThan
                | EqualTo | NotEqualTo | Mindate | Maxdate | GreaterThanDate
                | LessThanDate | EqualToDate | NotEqualToDate => {
                    lists.node2_actions.push(*action)
                }
                IdAllowList | IdPattern | IdNotPattern | IdBlank | IdNotBlank | IdChain => {
                    lists.id_actions.push(*action)
                }
                FieldName | FieldValues | FieldNotValues | FieldPattern | FieldNotPattern
                | FieldBlank | FieldNotBlank => lists.field_actions.push(*action),
                Isa | Switch => lists.tree_actions.push(*action),
                Node2Column | Nextcase | Minoccurs | Maxoccurs | Mustoccur | Mindistinct
                | Maxdistinct | Requires | Prohibits | Matches | Unknown | Groupbyprop => {}
            }
        }
        lists.actions = actions;
        lists
    }
}

/// A fully loaded and compiled rule set.
#[derive(Debug, Clone, Default)]
pub struct PropertyPatterns {
    pub keys: HashMap<String, PropertyPatternLists>,
    /// Keys carrying MUSTOCCUR / MINOCCURS / MAXOCCURS.
    pub occurs: HashSet<String>,
    /// Keys carrying MINDISTINCT / MAXDISTINCT.
    pub distinct: HashSet<String>,
    /// Keys flagged UNKNOWN=true (fallback for unmatched properties).
    pub unknown: HashSet<String>,
    /// Keys flagged GROUPBYPROP=true (count by literal property name).
    pub groupbyprop: HashSet<String>,
    /// Keys with MATCHES patterns, tested against every property string.
    pub matches: Vec<(String, Vec<Regex>)>,
    /// Keys that participate in REQUIRES / PROHIBITS / CHAIN bookkeeping.
    pub interesting: HashSet<String>,
}

impl PropertyPatterns {
    /// Load a rule set from an already-open pattern file reader.
    pub fn load(reader: &mut KgtkReader) -> Result<PropertyPatterns> {
        let columns = reader.columns.clone();
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row()? {
            rows.push(row);
        }
        Self::load_rows(&columns, rows)
    }

    /// Load a rule set from buffered rows.
    pub fn load_rows(
        columns: &KgtkColumns,
        rows: impl IntoIterator<Item = Vec<String>>,
    ) -> Result<PropertyPatterns> {
        let node1_idx = columns.node1_idx.ok_or_else(|| {
            KgtkError::Header("pattern file must have a node1 column".to_string())
        })?;
        let label_idx = columns.label_idx.ok_or_else(|| {
            KgtkError::Header("pattern file must have a label column".to_string())
        })?;
        let node2_idx = columns.node2_idx.ok_or_else(|| {
            KgtkError::Header("pattern file must have a node2 column".to_string())
        })?;

        let mut accumulated: IndexMap<String, IndexMap<PatternAction, PatternPayload>> =
            IndexMap::new();
        for (offset, row) in rows.into_iter().enumerate() {
            let row_number = offset + 1;
            let key = row.get(node1_idx).cloned().unwrap_or_default();
            let symbol = row.get(label_idx).cloned().unwrap_or_default();
            let payload_text = row.get(node2_idx).cloned().unwrap_or_default();

            let action: PatternAction = symbol.parse()?;
            let payload = parse_payload(action, &payload_text, row_number)?;

            let entry = accumulated.entry(key).or_default();
            merge_payload(entry, action, payload, row_number)?;
        }

        let mut patterns = PropertyPatterns::default();
        for (key, actions) in accumulated {
            if let Some(PatternPayload::Patterns(regexes)) =
                actions.get(&PatternAction::Matches)
            {
                patterns.matches.push((key.clone(), regexes.clone()));
            }
            if actions.contains_key(&PatternAction::Mustoccur)
                || actions.contains_key(&PatternAction::Minoccurs)
                || actions.contains_key(&PatternAction::Maxoccurs)
            {
                patterns.occurs.insert(key.clone());
            }
            if actions.contains_key(&PatternAction::Mindistinct)
                || actions.contains_key(&PatternAction::Maxdistinct)
            {
                patterns.distinct.insert(key.clone());
            }
            if actions
                .get(&PatternAction::Unknown)
                .and_then(|p| p.as_boolean())
                .unwrap_or(false)
            {
                patterns.unknown.insert(key.clone());
            }
            if actions
                .get(&PatternAction::Groupbyprop)
                .and_then(|p| p.as_boolean())
                .unwrap_or(false)
            {
                patterns.groupbyprop.insert(key.clone());
            }
            for action in [PatternAction::Requires, PatternAction::Prohibits] {
                if let Some(names) = actions.get(&action).and_then(|p| p.as_names()) {
                    patterns.interesting.insert(key.clone());
                    patterns.interesting.extend(names.iter().cloned());
                }
            }
            patterns
                .keys
                .insert(key, PropertyPatternLists::compile(actions));
        }
        Ok(patterns)
    }

    pub fn lists(&self, key: &str) -> Option<&PropertyPatternLists> {
        self.keys.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn load_error(row: usize, message: String) -> KgtkError {
    KgtkError::PatternLoad { row, message }
}

/// Strip a KGTK string sigil so quoted payloads compare against raw cells.
fn unquote(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

fn split_payload_list(text: &str) -> Vec<&str> {
    text.split('|').filter(|item| !item.is_empty()).collect()
}

fn parse_payload(
    action: PatternAction,
    text: &str,
    row_number: usize,
) -> Result<PatternPayload> {
    match action.payload_kind() {
        PayloadKind::SingleNumber => {
            let number: f64 = text.trim().parse().map_err(|_| {
                load_error(
                    row_number,
                    format!("action {action} requires a number, got '{text}'"),
                )
            })?;
            Ok(PatternPayload::Number(number))
        }
        PayloadKind::Numbers => {
            let mut numbers = Vec::new();
            for item in split_payload_list(text) {
                let number: f64 = item.trim().parse().map_err(|_| {
                    load_error(
                        row_number,
                        format!("action {action} requires numbers, got '{item}'"),
                    )
                })?;
                numbers.push(number);
            }
            Ok(PatternPayload::Numbers(numbers))
        }
        PayloadKind::Patterns => {
            let mut regexes = Vec::new();
            for item in split_payload_list(text) {
                let regex = Regex::new(unquote(item)).map_err(|e| {
                    load_error(
                        row_number,
                        format!("action {action} has an invalid pattern '{item}': {e}"),
                    )
                })?;
                regexes.push(regex);
            }
            Ok(PatternPayload::Patterns(regexes))
        }
        PayloadKind::Names => Ok(PatternPayload::Names(
            split_payload_list(text)
                .into_iter()
                .map(|item| item.to_string())
                .collect(),
        )),
        PayloadKind::Values => Ok(PatternPayload::Values(
            split_payload_list(text)
                .into_iter()
                .map(|item| unquote(item).to_string())
                .collect(),
        )),
        PayloadKind::Boolean => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(PatternPayload::Boolean(true)),
            "false" => Ok(PatternPayload::Boolean(false)),
            _ => Err(load_error(
                row_number,
                format!("action {action} requires True or False, got '{text}'"),
            )),
        },
        PayloadKind::Dates => {
            let mut dates = Vec::new();
            for item in split_payload_list(text) {
                let options = ValueOptions::default();
                let mut value = KgtkValue::new(item, &options);
                let key = value.fields().date_sort_key().ok_or_else(|| {
                        load_error(
                            row_number,
                        format!("action {action} requires dates, got '{item}'"),
                    )
                })?;
                dates.push(DateBound {
                    raw: item.to_string(),
                    key,
                });
            }
            Ok(PatternPayload::Dates(dates))
        }
    }
}

fn merge_payload(
    entry: &mut IndexMap<PatternAction, PatternPayload>,
    action: PatternAction,
    payload: PatternPayload,
    row_number: usize,
) -> Result<()> {
    match entry.get_mut(&action) {
        None => {
            entry.insert(action, payload);
            Ok(())
        }
        Some(existing) => match (existing, payload) {
            (PatternPayload::Number(_), PatternPayload::Number(_)) => Err(load_error(
                row_number,
                format!("action {action} admits exactly one value"),
            )),
            (PatternPayload::Numbers(old), PatternPayload::Numbers(new)) => {
                old.extend(new);
                Ok(())
            }
            (PatternPayload::Patterns(old), PatternPayload::Patterns(new)) => {
                old.extend(new);
                Ok(())
            }
            (PatternPayload::Names(old), PatternPayload::Names(new)) => {
                old.extend(new);
                Ok(())
            }
            (PatternPayload::Values(old), PatternPayload::Values(new)) => {
                old.extend(new);
                Ok(())
            }
            (PatternPayload::Boolean(old), PatternPayload::Boolean(new)) => {
                *old = new;
                Ok(())
            }
            (PatternPayload::Dates(old), PatternPayload::Dates(new)) => {
                old.extend(new);
                Ok(())
            }
            _ => Err(load_error(
                row_number,
                format!("action {action} has a mismatched payload"),
            )),
        },
    }
}
