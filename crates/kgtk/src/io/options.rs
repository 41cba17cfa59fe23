//! Reader configuration: validation actions, file modes, sampling.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::compression::CompressionType;

/// Policy for one class of row-level violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationAction {
    /// Silently keep the line as-is.
    Pass,
    /// Keep the line but emit a diagnostic.
    Report,
    /// Silently drop the line and count it.
    Exclude,
    /// Drop the line, emit a diagnostic, and count it.
    Complain,
    /// Raise immediately, aborting the read.
    Error,
    /// Emit a diagnostic naming the line and terminate the process.
    Exit,
}

/// How a table's special columns are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KgtkFileMode {
    /// Detect edge vs. node from the header.
    Auto,
    /// Require node1/label/node2.
    Edge,
    /// Require (or tolerate a missing) id column without node1.
    Node,
    /// No role enforcement.
    None,
}

/// Input serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// Native tab-separated KGTK.
    Kgtk,
    /// Comma-separated alternate, parsed with the csv crate.
    Csv,
}

/// Location of a SQLite graph cache and the table backing one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphCacheConfig {
    /// Path to the SQLite database.
    pub path: PathBuf,
    /// Table holding the materialized rows of the requested file.
    pub table: String,
}

/// Immutable configuration for one reader. Options are read-only once the
/// reader is constructed; changing them requires reopening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderOptions {
    /// Field separator for the native format.
    pub column_separator: char,
    /// Input serialization format.
    pub input_format: InputFormat,
    /// Requested file mode.
    pub mode: KgtkFileMode,
    /// Supply these column names instead of reading a header line.
    pub force_column_names: Option<Vec<String>>,
    /// The input has no header line; names come from `force_column_names`
    /// or are generated as `column_1..column_N` from the first data row.
    pub no_input_header: bool,
    /// Fail at open unless the header has exactly this many columns.
    pub expected_column_count: Option<usize>,

    /// Skip this many data lines before yielding any.
    pub initial_skip_count: usize,
    /// Keep only every Nth data line (0 or 1 = keep all).
    pub every_nth_record: usize,
    /// Stop considering data lines after this many.
    pub record_limit: Option<usize>,
    /// Keep only the final N of the considered data lines.
    pub tail_count: Option<usize>,

    pub empty_line_action: ValidationAction,
    pub comment_line_action: ValidationAction,
    pub whitespace_line_action: ValidationAction,
    pub blank_required_field_action: ValidationAction,
    pub short_line_action: ValidationAction,
    pub long_line_action: ValidationAction,
    pub header_error_action: ValidationAction,
    pub unsafe_column_name_action: ValidationAction,
    pub invalid_value_action: ValidationAction,
    pub prohibited_list_action: ValidationAction,

    /// Pad short lines with empty cells instead of applying
    /// `short_line_action`.
    pub fill_short_lines: bool,
    /// Drop extra cells instead of applying `long_line_action`.
    pub truncate_long_lines: bool,
    /// Try to repair invalid values in place before judging them.
    pub repair_invalid_values: bool,

    /// Inject this constant label value for label-less edge inputs.
    pub implied_label: Option<String>,
    /// Cell values that must not appear anywhere in the file.
    pub prohibited_list: HashSet<String>,

    /// Explicit compression type (None = sniff from the file extension).
    pub compression_type: Option<CompressionType>,
    /// Decompress gzip on a separate worker thread.
    pub parallel_gzip: bool,
    /// Serve rows from this graph cache when the table is materialized.
    pub graph_cache: Option<GraphCacheConfig>,

    /// Abort after this many COMPLAIN/REPORT diagnostics.
    pub error_limit: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            column_separator: '\t',
            input_format: InputFormat::Kgtk,
            mode: KgtkFileMode::Auto,
            force_column_names: None,
            no_input_header: false,
            expected_column_count: None,
            initial_skip_count: 0,
            every_nth_record: 0,
            record_limit: None,
            tail_count: None,
            empty_line_action: ValidationAction::Exclude,
            comment_line_action: ValidationAction::Exclude,
            whitespace_line_action: ValidationAction::Exclude,
            blank_required_field_action: ValidationAction::Complain,
            short_line_action: ValidationAction::Complain,
            long_line_action: ValidationAction::Complain,
            header_error_action: ValidationAction::Error,
            unsafe_column_name_action: ValidationAction::Report,
            invalid_value_action: ValidationAction::Pass,
            prohibited_list_action: ValidationAction::Complain,
            fill_short_lines: false,
            truncate_long_lines: false,
            repair_invalid_values: false,
            implied_label: None,
            prohibited_list: HashSet::new(),
            compression_type: None,
            parallel_gzip: false,
            graph_cache: None,
            error_limit: 1000,
        }
    }
}

impl ReaderOptions {
    /// True when any sampling option is in effect.
    pub fn is_sampling(&self) -> bool {
        self.initial_skip_count > 0
            || self.every_nth_record > 1
            || self.record_limit.is_some()
            || self.tail_count.is_some()
    }

    /// True when per-cell repair or validation work is requested, which
    /// disqualifies the minimal read paths. Line-level checks (empty,
    /// comment, short, long) are cheap enough for every path.
    pub fn needs_row_processing(&self) -> bool {
        self.is_sampling()
            || self.fill_short_lines
            || self.truncate_long_lines
            || self.repair_invalid_values
            || self.implied_label.is_some()
            || !self.prohibited_list.is_empty()
            || self.invalid_value_action != ValidationAction::Pass
            || self.blank_required_field_action != ValidationAction::Pass
    }
}
