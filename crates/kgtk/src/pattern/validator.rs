//! Property-pattern validation over a row stream.
//!
//! Rows are grouped by node1. Each row is evaluated against the rule set
//! under its matched key(s); group-scoped bounds (occurrence, distinct,
//! REQUIRES/PROHIBITS) are checked when the group completes. Groups whose
//! chain rules reference a node1 not yet processed suspend and are retried
//! until a fixed point.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;

use crate::error::{KgtkError, Result};
use crate::group::{GroupBuffer, KeyBy};
use crate::io::columns::KgtkColumns;
use crate::io::writer::KgtkWriter;
use crate::pattern::action::PatternAction;
use crate::pattern::model::{PropertyPatternLists, PropertyPatterns};
use crate::value::{classify, split_list, KgtkDatatype, KgtkValue, ValueOptions};

/// Destination for accepted or rejected rows.
pub trait RowSink {
    fn write(&mut self, row: &[String]) -> Result<()>;
}

impl RowSink for KgtkWriter {
    fn write(&mut self, row: &[String]) -> Result<()> {
        KgtkWriter::write(self, row)
    }
}

impl RowSink for Vec<Vec<String>> {
    fn write(&mut self, row: &[String]) -> Result<()> {
        self.push(row.to_vec());
        Ok(())
    }
}

/// Validator configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidatorOptions {
    /// Input is already contiguous by node1; groups form in arrival order.
    pub grouped_input: bool,
    /// Route whole node1 groups all-or-nothing instead of per row.
    pub reject_node1_groups: bool,
    /// Suppress diagnostics (expected-rejection test runs).
    pub no_complaints: bool,
    /// Emit each diagnostic as it happens instead of only batching.
    pub complain_immediately: bool,
    /// Column to receive the textual ISA traversal trace.
    pub isa_column: Option<String>,
}

/// Counters and collected diagnostics for one `process` call.
#[derive(Debug, Clone, Default)]
pub struct ValidationSummary {
    pub rows_passed: usize,
    pub rows_rejected: usize,
    pub groups_passed: usize,
    pub groups_rejected: usize,
    /// Groups force-failed because their chain rules never resolved.
    pub groups_unresolved: usize,
    pub complaints: Vec<String>,
}

/// Mutable working state. Cloned wholesale for SWITCH rollback and for
/// chain-suspension unwinding.
#[derive(Debug, Clone, Default)]
struct Scoreboards {
    /// node1 -> counting key -> occurrence count.
    occurs: HashMap<String, HashMap<String, usize>>,
    /// counting key -> distinct node2 values.
    distinct: HashMap<String, HashSet<String>>,
    /// counting key -> pattern key that owns its bounds.
    count_owner: HashMap<String, String>,
    /// node1 -> keys seen, for REQUIRES/PROHIBITS.
    interesting: HashMap<String, HashSet<String>>,
    /// Datatypes the current group has validated under.
    satisfied: HashSet<String>,
    complaints: Vec<String>,
}

/// Raised when a chain rule references a node1 group not yet processed.
struct Suspended;

type Eval<T> = std::result::Result<T, Suspended>;

struct GroupOutcome {
    row_valid: Vec<bool>,
    isa_traces: Vec<String>,
    /// Group-scoped checks (occurrence bounds, REQUIRES/PROHIBITS) passed.
    group_end_ok: bool,
    group_valid: bool,
}

pub struct PatternValidator<'p> {
    patterns: &'p PropertyPatterns,
    options: ValidatorOptions,
    value_options: ValueOptions,
    columns: KgtkColumns,
    node1_idx: usize,
    label_idx: usize,
    node2_idx: usize,
    id_idx: Option<usize>,
    /// Index of the ISA output column, when it names an existing column.
    isa_idx: Option<usize>,
    board: Scoreboards,
    /// node1 -> datatypes its completed group satisfied. Persists across
    /// groups for the whole run.
    chain_targets: HashMap<String, HashSet<String>>,
    known_node1s: HashSet<String>,
    summary: ValidationSummary,
}

impl<'p> PatternValidator<'p> {
    pub fn new(
        patterns: &'p PropertyPatterns,
        columns: &KgtkColumns,
        options: ValidatorOptions,
        value_options: ValueOptions,
    ) -> Result<PatternValidator<'p>> {
        let node1_idx = columns.node1_idx.ok_or_else(|| {
            KgtkError::Header("validation requires a node1 column".to_string())
        })?;
        let label_idx = columns.label_idx.ok_or_else(|| {
            KgtkError::Header("validation requires a label column".to_string())
        })?;
        let node2_idx = columns.node2_idx.ok_or_else(|| {
            KgtkError::Header("validation requires a node2 column".to_string())
        })?;
        let isa_idx = options
            .isa_column
            .as_ref()
            .and_then(|name| columns.column_name_map.get(name).copied());
        Ok(PatternValidator {
            patterns,
            options,
            value_options,
            columns: columns.clone(),
            node1_idx,
            label_idx,
            node2_idx,
            id_idx: columns.id_idx,
            isa_idx,
            board: Scoreboards::default(),
            chain_targets: HashMap::new(),
            known_node1s: HashSet::new(),
            summary: ValidationSummary::default(),
        })
    }

    /// Column names of the routed output, including an appended ISA
    /// column when one was requested but absent from the input.
    pub fn output_column_names(&self) -> Vec<String> {
        let mut names = self.columns.column_names.clone();
        if let Some(isa_column) = &self.options.isa_column {
            if self.isa_idx.is_none() {
                names.push(isa_column.clone());
            }
        }
        names
    }

    /// Validate a full row stream, routing rows to the sinks.
    pub fn process(
        &mut self,
        rows: impl IntoIterator<Item = Result<Vec<String>>>,
        mut accepted: Option<&mut dyn RowSink>,
        mut rejected: Option<&mut dyn RowSink>,
    ) -> Result<ValidationSummary> {
        let mut all_rows: Vec<Vec<String>> = Vec::new();
        for row in rows {
            let row = row?;
            if let Some(node1) = row.get(self.node1_idx) {
                self.known_node1s.insert(node1.clone());
            }
            all_rows.push(row);
        }

        let groups = self.assemble_groups(all_rows);
        let outcomes = self.resolve_groups(&groups);

        for (index, (_, rows)) in groups.iter().enumerate() {
            let outcome = &outcomes[index];
            if outcome.group_valid {
                self.summary.groups_passed += 1;
            } else {
                self.summary.groups_rejected += 1;
            }
            for (row_index, row) in rows.iter().enumerate() {
                let row_ok = if self.options.reject_node1_groups {
                    outcome.group_valid
                } else {
                    outcome.row_valid[row_index] && outcome.group_end_ok
                };
                let routed = self.apply_isa_column(row, &outcome.isa_traces[row_index]);
                if row_ok {
                    self.summary.rows_passed += 1;
                    if let Some(sink) = accepted.as_deref_mut() {
                        sink.write(&routed)?;
                    }
                } else {
                    self.summary.rows_rejected += 1;
                    if let Some(sink) = rejected.as_deref_mut() {
                        sink.write(&routed)?;
                    }
                }
            }
        }

        self.summary.complaints = std::mem::take(&mut self.board.complaints);
        Ok(self.summary.clone())
    }

    fn assemble_groups(&self, all_rows: Vec<Vec<String>>) -> Vec<(String, Vec<Vec<String>>)> {
        if self.options.grouped_input {
            let mut groups: Vec<(String, Vec<Vec<String>>)> = Vec::new();
            for row in all_rows {
                let node1 = row.get(self.node1_idx).cloned().unwrap_or_default();
                match groups.last_mut() {
                    Some((current, rows)) if *current == node1 => rows.push(row),
                    _ => groups.push((node1, vec![row])),
                }
            }
            groups
        } else {
            let mut buffer = GroupBuffer::new(KeyBy::Node1, &self.columns, true);
            for row in all_rows {
                buffer.add(row);
            }
            buffer.into_groups().collect()
        }
    }

    /// Evaluate groups with a chain-suspension retry loop. Terminates when
    /// all groups resolve or a full pass makes no progress; leftovers are
    /// force-failed.
    fn resolve_groups(&mut self, groups: &[(String, Vec<Vec<String>>)]) -> Vec<GroupOutcome> {
        let mut outcomes: Vec<Option<GroupOutcome>> =
            (0..groups.len()).map(|_| None).collect();
        let mut pending: Vec<usize> = (0..groups.len()).collect();

        loop {
            let mut still_pending = Vec::new();
            let mut progressed = false;
            for index in pending {
                let (node1, rows) = &groups[index];
                match self.eval_group(node1, rows) {
                    Ok(outcome) => {
                        let satisfied = if outcome.group_valid {
                            std::mem::take(&mut self.board.satisfied)
                        } else {
                            self.board.satisfied.clear();
                            HashSet::new()
                        };
                        self.chain_targets.insert(node1.clone(), satisfied);
                        outcomes[index] = Some(outcome);
                        progressed = true;
                    }
                    Err(Suspended) => still_pending.push(index),
                }
            }
            if still_pending.is_empty() {
                break;
            }
            if !progressed {
                for index in still_pending {
                    let (node1, rows) = &groups[index];
                    self.complain(format!(
                        "node1 '{node1}': chain rules never resolved; group rejected"
                    ));
                    self.chain_targets.insert(node1.clone(), HashSet::new());
                    self.summary.groups_unresolved += 1;
                    outcomes[index] = Some(GroupOutcome {
                        row_valid: vec![false; rows.len()],
                        isa_traces: vec![String::new(); rows.len()],
                        group_end_ok: false,
                        group_valid: false,
                    });
                }
                break;
            }
            pending = still_pending;
        }

        outcomes.into_iter().flatten().collect()
    }

    fn eval_group(&mut self, node1: &str, rows: &[Vec<String>]) -> Eval<GroupOutcome> {
        let snapshot = self.board.clone();
        match self.eval_group_inner(node1, rows) {
            Ok(outcome) => Ok(outcome),
            Err(Suspended) => {
                self.board = snapshot;
                Err(Suspended)
            }
        }
    }

    fn eval_group_inner(&mut self, node1: &str, rows: &[Vec<String>]) -> Eval<GroupOutcome> {
        self.board.satisfied.clear();

        // MUSTOCCUR establishes a zero baseline so total absence is
        // detectable at group end.
        let patterns = self.patterns;
        for key in &patterns.occurs {
            if let Some(lists) = patterns.lists(key) {
                if lists.boolean(PatternAction::Mustoccur) {
                    self.board
                        .occurs
                        .entry(node1.to_string())
                        .or_default()
                        .entry(key.clone())
                        .or_insert(0);
                    self.board
                        .count_owner
                        .entry(key.clone())
                        .or_insert_with(|| key.clone());
                }
            }
        }

        let mut row_valid = Vec::with_capacity(rows.len());
        let mut isa_traces = Vec::with_capacity(rows.len());
        for row in rows {
            let (ok, trace) = self.validate_row(node1, row)?;
            row_valid.push(ok);
            isa_traces.push(trace);
        }

        let group_end_ok = self.check_group_end(node1);
        let group_valid = group_end_ok && row_valid.iter().all(|ok| *ok);
        Ok(GroupOutcome {
            row_valid,
            isa_traces,
            group_end_ok,
            group_valid,
        })
    }

    /// Resolve a row's property to its matched key(s) and evaluate under
    /// each; all matched keys must pass.
    fn validate_row(&mut self, node1: &str, row: &[String]) -> Eval<(bool, String)> {
        let patterns = self.patterns;
        let prop = row.get(self.label_idx).cloned().unwrap_or_default();

        let mut matched: Vec<String> = Vec::new();
        if patterns.keys.contains_key(&prop) {
            matched.push(prop.clone());
        }
        for (key, regexes) in &patterns.matches {
            if key != &prop && regexes.iter().any(|regex| regex.is_match(&prop)) {
                matched.push(key.clone());
            }
        }
        if matched.is_empty() {
            for key in &patterns.unknown {
                matched.push(key.clone());
            }
        }
        if matched.is_empty() {
            return Ok((true, String::new()));
        }

        let mut ok = true;
        let mut traces = Vec::new();
        for key in matched {
            let mut stack = Vec::new();
            let (key_ok, trace) = self.evaluate_under(&key, node1, &prop, row, &mut stack)?;
            if key_ok {
                self.board.satisfied.insert(key.clone());
            } else {
                ok = false;
            }
            if !trace.is_empty() {
                traces.push(trace);
            }
        }
        Ok((ok, traces.join(";")))
    }

    /// Evaluate one row under one key, with ISA cycle detection via the
    /// in-progress stack. Returns validity plus the ISA descent trace.
    fn evaluate_under(
        &mut self,
        key: &str,
        node1: &str,
        prop: &str,
        row: &[String],
        stack: &mut Vec<String>,
    ) -> Eval<(bool, String)> {
        if stack.iter().any(|entry| entry == key) {
            self.complain(format!(
                "node1 '{node1}': isa loop detected re-entering '{key}'"
            ));
            return Ok((false, key.to_string()));
        }
        stack.push(key.to_string());
        let result = self.evaluate_under_inner(key, node1, prop, row, stack);
        stack.pop();
        result
    }

    fn evaluate_under_inner(
        &mut self,
        key: &str,
        node1: &str,
        prop: &str,
        row: &[String],
        stack: &mut Vec<String>,
    ) -> Eval<(bool, String)> {
        let patterns = self.patterns;
        let Some(lists) = patterns.lists(key) else {
            // An ISA/SWITCH target with no rules of its own is vacuous.
            return Ok((true, key.to_string()));
        };

        let node2_cell = self.node2_cell(lists, row);
        self.record_row(key, node1, prop, &node2_cell);

        let mut ok = true;
        if !self.check_label_rules(key, node1, prop, lists) {
            ok = false;
        }
        if !self.check_node1_rules(key, node1, row, lists) {
            ok = false;
        }

        let node2_items: Vec<String> = if lists.boolean(PatternAction::Node2AllowList)
            && classify(&node2_cell) == KgtkDatatype::List
        {
            split_list(&node2_cell)
        } else {
            vec![node2_cell.clone()]
        };
        for item in &node2_items {
            if !self.check_node2_item(key, node1, item, lists)? {
                ok = false;
            }
        }

        if !self.check_id_rules(key, node1, row, lists)? {
            ok = false;
        }
        if !self.check_field_rules(key, node1, &node2_cell, lists) {
            ok = false;
        }

        let mut trace = key.to_string();
        if let Some(parents) = lists.get(PatternAction::Isa).and_then(|p| p.as_names()) {
            let mut parent_traces = Vec::new();
            for parent in parents {
                let (parent_ok, parent_trace) =
                    self.evaluate_under(parent, node1, prop, row, stack)?;
                if parent_ok {
                    self.board.satisfied.insert(parent.clone());
                } else {
                    ok = false;
                }
                parent_traces.push(parent_trace);
            }
            if parent_traces.len() == 1 {
                trace.push_str("->");
                trace.push_str(&parent_traces[0]);
            } else if !parent_traces.is_empty() {
                trace.push_str("->(");
                trace.push_str(&parent_traces.join(","));
                trace.push(')');
            }
        }

        if let Some(candidates) = lists.get(PatternAction::Switch).and_then(|p| p.as_names())
        {
            match self.eval_switch(key, node1, prop, row, stack, candidates)? {
                Some(winner_trace) => {
                    trace.push_str("->");
                    trace.push_str(&winner_trace);
                }
                None => ok = false,
            }
        }

        Ok((ok, trace))
    }

    /// Try SWITCH candidates in order, following NEXTCASE redirects,
    /// rolling scoreboards back after each failed attempt. On total
    /// failure every buffered attempt complaint is surfaced.
    fn eval_switch(
        &mut self,
        key: &str,
        node1: &str,
        prop: &str,
        row: &[String],
        stack: &mut Vec<String>,
        candidates: &IndexSet<String>,
    ) -> Eval<Option<String>> {
        let mut attempt_complaints: Vec<String> = Vec::new();
        for candidate in candidates {
            let mut current = candidate.clone();
            let mut visited: HashSet<String> = HashSet::new();
            loop {
                if !visited.insert(current.clone()) {
                    break;
                }
                let before = self.board.clone();
                let (candidate_ok, candidate_trace) =
                    self.evaluate_under(&current, node1, prop, row, stack)?;
                if candidate_ok {
                    self.board.satisfied.insert(current.clone());
                    return Ok(Some(candidate_trace));
                }
                let fresh = self.board.complaints[before.complaints.len()..].to_vec();
                attempt_complaints.extend(fresh);
                self.board = before;
                match self.patterns.lists(&current).and_then(|l| l.nextcase.clone()) {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
        for complaint in attempt_complaints {
            self.board.complaints.push(complaint);
        }
        self.complain(format!(
            "node1 '{node1}': no switch case of '{key}' matched"
        ));
        Ok(None)
    }

    /// Occurrence, distinct, and interesting-set bookkeeping for one row
    /// evaluated under one key.
    fn record_row(
        &mut self,
        key: &str,
        node1: &str,
        prop: &str,
        node2_cell: &str,
    ) {
        let patterns = self.patterns;
        let counting_key = if patterns.groupbyprop.contains(key) {
            prop.to_string()
        } else {
            key.to_string()
        };
        if patterns.occurs.contains(key) {
            *self
                .board
                .occurs
                .entry(node1.to_string())
                .or_default()
                .entry(counting_key.clone())
                .or_insert(0) += 1;
            self.board
                .count_owner
                .entry(counting_key.clone())
                .or_insert_with(|| key.to_string());
        }
        if patterns.distinct.contains(key) {
            self.board
                .distinct
                .entry(counting_key.clone())
                .or_default()
                .insert(node2_cell.to_string());
            self.board
                .count_owner
                .entry(counting_key)
                .or_insert_with(|| key.to_string());
        }
        if patterns.interesting.contains(key) {
            self.board
                .interesting
                .entry(node1.to_string())
                .or_default()
                .insert(key.to_string());
        }
    }

    fn node2_cell(&self, lists: &PropertyPatternLists, row: &[String]) -> String {
        let idx = lists
            .node2_column
            .as_ref()
            .and_then(|name| self.columns.column_name_map.get(name).copied())
            .unwrap_or(self.node2_idx);
        row.get(idx).cloned().unwrap_or_default()
    }

    fn check_label_rules(
        &mut self,
        key: &str,
        node1: &str,
        prop: &str,
        lists: &PropertyPatternLists,
    ) -> bool {
        let mut ok = true;
        if lists.boolean(PatternAction::Reject) {
            self.complain(format!(
                "node1 '{node1}': property '{prop}' is rejected by '{key}'"
            ));
            ok = false;
        }
        if let Some(regexes) = lists
            .get(PatternAction::LabelPattern)
            .and_then(|p| p.as_patterns())
        {
            if !regexes.iter().any(|regex| regex.is_match(prop)) {
                self.complain(format!(
                    "node1 '{node1}': label '{prop}' does not match label_pattern of '{key}'"
                ));
                ok = false;
            }
        }
        ok
    }

    fn check_node1_rules(
        &mut self,
        key: &str,
        node1: &str,
        row: &[String],
        lists: &PropertyPatternLists,
    ) -> bool {
        let cell = row.get(self.node1_idx).cloned().unwrap_or_default();
        let items: Vec<String> = if lists.boolean(PatternAction::Node1AllowList)
            && classify(&cell) == KgtkDatatype::List
        {
            split_list(&cell)
        } else {
            vec![cell]
        };

        let mut ok = true;
        for item in &items {
            if let Some(types) = lists
                .get(PatternAction::Node1Type)
                .and_then(|p| p.as_names())
            {
                let datatype = classify(item);
                if !types.contains(datatype.as_str()) {
                    self.complain(format!(
                        "node1 '{node1}': '{item}' has type {datatype} not allowed by '{key}'"
                    ));
                    ok = false;
                }
            }
            if lists.boolean(PatternAction::Node1IsValid) {
                let mut value = KgtkValue::new(item, &self.value_options);
                if !value.validate() {
                    self.complain(format!("node1 '{node1}': '{item}' is not valid"));
                    ok = false;
                }
            }
            if let Some(values) = lists
                .get(PatternAction::Node1Values)
                .and_then(|p| p.as_values())
            {
                if !values.contains(item.as_str()) {
                    self.complain(format!(
                        "node1 '{node1}': '{item}' is not in node1_values of '{key}'"
                    ));
                    ok = false;
                }
            }
            if let Some(regexes) = lists
                .get(PatternAction::Node1Pattern)
                .and_then(|p| p.as_patterns())
            {
                if !regexes.iter().any(|regex| regex.is_match(item)) {
                    self.complain(format!(
                        "node1 '{node1}': '{item}' does not match node1_pattern of '{key}'"
                    ));
                    ok = false;
                }
            }
        }
        ok
    }

    fn check_node2_item(
        &mut self,
        key: &str,
        node1: &str,
        item: &str,
        lists: &PropertyPatternLists,
    ) -> Eval<bool> {
        let mut ok = true;
        let datatype = classify(item);

        if let Some(types) = lists
            .get(PatternAction::Node2Type)
            .and_then(|p| p.as_names())
        {
            if !types.contains(datatype.as_str()) {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' has type {datatype} not allowed by '{key}'"
                ));
                ok = false;
            }
        }
        if let Some(types) = lists
            .get(PatternAction::Node2NotType)
            .and_then(|p| p.as_names())
        {
            if types.contains(datatype.as_str()) {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' has forbidden type {datatype} under '{key}'"
                ));
                ok = false;
            }
        }
        if lists.boolean(PatternAction::Node2IsValid) {
            let mut value = KgtkValue::new(item, &self.value_options);
            if !value.validate() {
                self.complain(format!("node1 '{node1}': node2 '{item}' is not valid"));
                ok = false;
            }
        }
        if let Some(values) = lists
            .get(PatternAction::Node2Values)
            .and_then(|p| p.as_values())
        {
            if !values.contains(item) {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' is not in node2_values of '{key}'"
                ));
                ok = false;
            }
        }
        if let Some(values) = lists
            .get(PatternAction::Node2NotValues)
            .and_then(|p| p.as_values())
        {
            if values.contains(item) {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' is a forbidden value under '{key}'"
                ));
                ok = false;
            }
        }
        if let Some(regexes) = lists
            .get(PatternAction::Node2Pattern)
            .and_then(|p| p.as_patterns())
        {
            if !regexes.iter().any(|regex| regex.is_match(item)) {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' does not match node2_pattern of '{key}'"
                ));
                ok = false;
            }
        }
        if let Some(regexes) = lists
            .get(PatternAction::Node2NotPattern)
            .and_then(|p| p.as_patterns())
        {
            if regexes.iter().any(|regex| regex.is_match(item)) {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' matches node2_not_pattern of '{key}'"
                ));
                ok = false;
            }
        }
        if lists.boolean(PatternAction::Node2Blank) && !item.is_empty() {
            self.complain(format!(
                "node1 '{node1}': node2 '{item}' is not blank under '{key}'"
            ));
            ok = false;
        }
        if lists.boolean(PatternAction::Node2NotBlank) && item.is_empty() {
            self.complain(format!("node1 '{node1}': node2 is blank under '{key}'"));
            ok = false;
        }

        if !self.check_numeric_rules(key, node1, item, lists) {
            ok = false;
        }
        if !self.check_date_rules(key, node1, item, lists) {
            ok = false;
        }
        if let Some(targets) = lists
            .get(PatternAction::Node2Chain)
            .and_then(|p| p.as_names())
        {
            if !self.check_chain(key, node1, item, targets)? {
                ok = false;
            }
        }
        Ok(ok)
    }

    fn check_numeric_rules(
        &mut self,
        key: &str,
        node1: &str,
        item: &str,
        lists: &PropertyPatternLists,
    ) -> bool {
        use PatternAction::*;
        let has_rule = [Minval, Maxval, GreaterThan, LessThan, EqualTo, NotEqualTo]
            .iter()
            .any(|action| lists.get(*action).is_some());
        if !has_rule {
            return true;
        }

        let mut value = KgtkValue::new(item, &self.value_options);
        let Some(number) = value.fields().number else {
            self.complain(format!(
                "node1 '{node1}': node2 '{item}' is not numeric under '{key}'"
            ));
            return false;
        };

        let mut ok = true;
        if let Some(min) = lists.get(Minval).and_then(|p| p.as_number()) {
            if number < min {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' is less than minval {min:.6}"
                ));
                ok = false;
            }
        }
        if let Some(max) = lists.get(Maxval).and_then(|p| p.as_number()) {
            if number > max {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' is greater than maxval {max:.6}"
                ));
                ok = false;
            }
        }
        if let Some(bound) = lists.get(GreaterThan).and_then(|p| p.as_number()) {
            if number <= bound {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' is not greater than {bound:.6}"
                ));
                ok = false;
            }
        }
        if let Some(bound) = lists.get(LessThan).and_then(|p| p.as_number()) {
            if number >= bound {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' is not less than {bound:.6}"
                ));
                ok = false;
            }
        }
        if let Some(allowed) = lists.get(EqualTo).and_then(|p| p.as_numbers()) {
            if !allowed.iter().any(|candidate| *candidate == number) {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' is not equal to any allowed value of '{key}'"
                ));
                ok = false;
            }
        }
        if let Some(forbidden) = lists.get(NotEqualTo).and_then(|p| p.as_numbers()) {
            if forbidden.iter().any(|candidate| *candidate == number) {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' equals a forbidden value of '{key}'"
                ));
                ok = false;
            }
        }
        ok
    }

    fn check_date_rules(
        &mut self,
        key: &str,
        node1: &str,
        item: &str,
        lists: &PropertyPatternLists,
    ) -> bool {
        use PatternAction::*;
        let has_rule = [
            Mindate,
            Maxdate,
            GreaterThanDate,
            LessThanDate,
            EqualToDate,
            NotEqualToDate,
        ]
        .iter()
        .any(|action| lists.get(*action).is_some());
        if !has_rule {
            return true;
        }

        let mut value = KgtkValue::new(item, &self.value_options);
        let Some(date_key) = value.fields().date_sort_key() else {
            self.complain(format!(
                "node1 '{node1}': node2 '{item}' is not a date under '{key}'"
            ));
            return false;
        };

        let mut ok = true;
        if let Some(bounds) = lists.get(Mindate).and_then(|p| p.as_dates()) {
            for bound in bounds {
                if date_key < bound.key {
                    self.complain(format!(
                        "node1 '{node1}': node2 '{item}' is earlier than mindate {}",
                        bound.raw
                    ));
                    ok = false;
                }
            }
        }
        if let Some(bounds) = lists.get(Maxdate).and_then(|p| p.as_dates()) {
            for bound in bounds {
                if date_key > bound.key {
                    self.complain(format!(
                        "node1 '{node1}': node2 '{item}' is later than maxdate {}",
                        bound.raw
                    ));
                    ok = false;
                }
            }
        }
        if let Some(bounds) = lists.get(GreaterThanDate).and_then(|p| p.as_dates()) {
            for bound in bounds {
                if date_key <= bound.key {
                    self.complain(format!(
                        "node1 '{node1}': node2 '{item}' is not after {}",
                        bound.raw
                    ));
                    ok = false;
                }
            }
        }
        if let Some(bounds) = lists.get(LessThanDate).and_then(|p| p.as_dates()) {
            for bound in bounds {
                if date_key >= bound.key {
                    self.complain(format!(
                        "node1 '{node1}': node2 '{item}' is not before {}",
                        bound.raw
                    ));
                    ok = false;
                }
            }
        }
        if let Some(bounds) = lists.get(EqualToDate).and_then(|p| p.as_dates()) {
            if !bounds.iter().any(|bound| date_key == bound.key) {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' does not equal any allowed date of '{key}'"
                ));
                ok = false;
            }
        }
        if let Some(bounds) = lists.get(NotEqualToDate).and_then(|p| p.as_dates()) {
            if bounds.iter().any(|bound| date_key == bound.key) {
                self.complain(format!(
                    "node1 '{node1}': node2 '{item}' equals a forbidden date of '{key}'"
                ));
                ok = false;
            }
        }
        ok
    }

    /// Chain rules: the referenced cell must name another node1 whose
    /// completed group satisfied one of the target datatypes. Referencing
    /// an unprocessed group suspends; referencing a node1 absent from the
    /// file fails outright.
    fn check_chain(
        &mut self,
        key: &str,
        node1: &str,
        target: &str,
        datatypes: &IndexSet<String>,
    ) -> Eval<bool> {
        match self.chain_targets.get(target) {
            Some(satisfied) => {
                if datatypes.iter().any(|datatype| satisfied.contains(datatype)) {
                    Ok(true)
                } else {
                    self.complain(format!(
                        "node1 '{node1}': chain target '{target}' satisfies none of the \
                         datatypes required by '{key}'"
                    ));
                    Ok(false)
                }
            }
            None => {
                if self.known_node1s.contains(target) {
                    Err(Suspended)
                } else {
                    self.complain(format!(
                        "node1 '{node1}': chain target '{target}' does not appear in the file"
                    ));
                    Ok(false)
                }
            }
        }
    }

    fn check_id_rules(
        &mut self,
        key: &str,
        node1: &str,
        row: &[String],
        lists: &PropertyPatternLists,
    ) -> Eval<bool> {
        if lists.id_actions.is_empty() {
            return Ok(true);
        }
        let cell = self
            .id_idx
            .and_then(|idx| row.get(idx))
            .cloned()
            .unwrap_or_default();
        let items: Vec<String> = if lists.boolean(PatternAction::IdAllowList)
            && classify(&cell) == KgtkDatatype::List
        {
            split_list(&cell)
        } else {
            vec![cell]
        };

        let mut ok = true;
        for item in &items {
            if let Some(regexes) = lists
                .get(PatternAction::IdPattern)
                .and_then(|p| p.as_patterns())
            {
                if !regexes.iter().any(|regex| regex.is_match(item)) {
                    self.complain(format!(
                        "node1 '{node1}': id '{item}' does not match id_pattern of '{key}'"
                    ));
                    ok = false;
                }
            }
            if let Some(regexes) = lists
                .get(PatternAction::IdNotPattern)
                .and_then(|p| p.as_patterns())
            {
                if regexes.iter().any(|regex| regex.is_match(item)) {
                    self.complain(format!(
                        "node1 '{node1}': id '{item}' matches id_not_pattern of '{key}'"
                    ));
                    ok = false;
                }
            }
            if lists.boolean(PatternAction::IdBlank) && !item.is_empty() {
                self.complain(format!(
                    "node1 '{node1}': id '{item}' is not blank under '{key}'"
                ));
                ok = false;
            }
            if lists.boolean(PatternAction::IdNotBlank) && item.is_empty() {
                self.complain(format!("node1 '{node1}': id is blank under '{key}'"));
                ok = false;
            }
            if let Some(targets) = lists
                .get(PatternAction::IdChain)
                .and_then(|p| p.as_names())
            {
                if !self.check_chain(key, node1, item, targets)? {
                    ok = false;
                }
            }
        }
        Ok(ok)
    }

    /// Field-level sub-tests over the parsed components of the node2 value.
    fn check_field_rules(
        &mut self,
        key: &str,
        node1: &str,
        node2_cell: &str,
        lists: &PropertyPatternLists,
    ) -> bool {
        let Some(field_names) = lists
            .get(PatternAction::FieldName)
            .and_then(|p| p.as_names())
        else {
            return true;
        };

        let mut value = KgtkValue::new(node2_cell, &self.value_options);
        let fields = value.fields();

        let mut ok = true;
        for name in field_names {
            let field_value = fields.get(name).unwrap_or_default();
            if let Some(values) = lists
                .get(PatternAction::FieldValues)
                .and_then(|p| p.as_values())
            {
                if !values.contains(&field_value) {
                    self.complain(format!(
                        "node1 '{node1}': field {name} value '{field_value}' is not allowed by '{key}'"
                    ));
                    ok = false;
                }
            }
            if let Some(values) = lists
                .get(PatternAction::FieldNotValues)
                .and_then(|p| p.as_values())
            {
                if values.contains(&field_value) {
                    self.complain(format!(
                        "node1 '{node1}': field {name} value '{field_value}' is forbidden by '{key}'"
                    ));
                    ok = false;
                }
            }
            if let Some(regexes) = lists
                .get(PatternAction::FieldPattern)
                .and_then(|p| p.as_patterns())
            {
                if !regexes.iter().any(|regex| regex.is_match(&field_value)) {
                    self.complain(format!(
                        "node1 '{node1}': field {name} value '{field_value}' does not match \
                         field_pattern of '{key}'"
                    ));
                    ok = false;
                }
            }
            if let Some(regexes) = lists
                .get(PatternAction::FieldNotPattern)
                .and_then(|p| p.as_patterns())
            {
                if regexes.iter().any(|regex| regex.is_match(&field_value)) {
                    self.complain(format!(
                        "node1 '{node1}': field {name} value '{field_value}' matches \
                         field_not_pattern of '{key}'"
                    ));
                    ok = false;
                }
            }
            if lists.boolean(PatternAction::FieldBlank) && !field_value.is_empty() {
                self.complain(format!(
                    "node1 '{node1}': field {name} is not blank under '{key}'"
                ));
                ok = false;
            }
            if lists.boolean(PatternAction::FieldNotBlank) && field_value.is_empty() {
                self.complain(format!(
                    "node1 '{node1}': field {name} is blank under '{key}'"
                ));
                ok = false;
            }
        }
        ok
    }

    /// Occurrence, distinct, and REQUIRES/PROHIBITS checks once the whole
    /// node1 group has been seen.
    fn check_group_end(&mut self, node1: &str) -> bool {
        use PatternAction::*;
        let patterns = self.patterns;
        let mut ok = true;

        // Group-scoped entries are consumed here; only the chain-target map
        // outlives the group.
        let counts = self.board.occurs.remove(node1).unwrap_or_default();
        for (counting_key, count) in counts {
            let owner = self
                .board
                .count_owner
                .get(&counting_key)
                .cloned()
                .unwrap_or_else(|| counting_key.clone());
            let Some(lists) = patterns.lists(&owner) else {
                continue;
            };
            let minoccurs = lists.get(Minoccurs).and_then(|p| p.as_number());
            if let Some(min) = minoccurs {
                if (count as f64) < min {
                    self.complain(format!(
                        "node1 '{node1}': '{counting_key}' occurs {count} times, minimum is {min}"
                    ));
                    ok = false;
                }
            } else if lists.boolean(Mustoccur) && count == 0 {
                self.complain(format!(
                    "node1 '{node1}': required property '{counting_key}' does not occur"
                ));
                ok = false;
            }
            if let Some(max) = lists.get(Maxoccurs).and_then(|p| p.as_number()) {
                if (count as f64) > max {
                    self.complain(format!(
                        "node1 '{node1}': '{counting_key}' occurs {count} times, maximum is {max}"
                    ));
                    ok = false;
                }
            }
        }

        let distinct = std::mem::take(&mut self.board.distinct);
        for (counting_key, values) in &distinct {
            let owner = self
                .board
                .count_owner
                .get(counting_key)
                .cloned()
                .unwrap_or_else(|| counting_key.clone());
            let Some(lists) = patterns.lists(&owner) else {
                continue;
            };
            let seen = values.len();
            if let Some(min) = lists.get(Mindistinct).and_then(|p| p.as_number()) {
                if (seen as f64) < min {
                    self.complain(format!(
                        "node1 '{node1}': '{counting_key}' has {seen} distinct values, \
                         minimum is {min}"
                    ));
                    ok = false;
                }
            }
            if let Some(max) = lists.get(Maxdistinct).and_then(|p| p.as_number()) {
                if (seen as f64) > max {
                    self.complain(format!(
                        "node1 '{node1}': '{counting_key}' has {seen} distinct values, \
                         maximum is {max}"
                    ));
                    ok = false;
                }
            }
        }

        let present = self.board.interesting.remove(node1).unwrap_or_default();
        for key in &present {
            let Some(lists) = patterns.lists(key) else {
                continue;
            };
            if let Some(required) = lists.get(Requires).and_then(|p| p.as_names()) {
                for needed in required {
                    if !present.contains(needed) {
                        self.complain(format!(
                            "node1 '{node1}': '{key}' requires '{needed}', which is absent"
                        ));
                        ok = false;
                    }
                }
            }
            if let Some(prohibited) = lists.get(Prohibits).and_then(|p| p.as_names()) {
                for banned in prohibited {
                    if present.contains(banned) {
                        self.complain(format!(
                            "node1 '{node1}': '{key}' prohibits '{banned}', which is present"
                        ));
                        ok = false;
                    }
                }
            }
        }

        ok
    }

    fn complain(&mut self, message: String) {
        if self.options.no_complaints {
            return;
        }
        if self.options.complain_immediately {
            tracing::warn!("{message}");
        }
        self.board.complaints.push(message);
    }

    fn apply_isa_column(&self, row: &[String], trace: &str) -> Vec<String> {
        let mut routed = row.to_vec();
        if self.options.isa_column.is_some() {
            match self.isa_idx {
                Some(idx) => {
                    if let Some(cell) = routed.get_mut(idx) {
                        *cell = trace.to_string();
                    }
                }
                None => routed.push(trace.to_string()),
            }
        }
        routed
    }
}
