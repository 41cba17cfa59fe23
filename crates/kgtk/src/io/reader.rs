//! Streaming row reader for KGTK files.
//!
//! `KgtkReader::open` parses the header, classifies the file, and picks one
//! of three read strategies that stays fixed for the reader's lifetime:
//!
//! - *cached*: rows served from a materialized graph-cache table, with
//!   filter pushdown;
//! - *fast*: minimal split-on-separator with only line-level checks;
//! - *general*: the full pipeline (sampling, repair, per-cell validation,
//!   prohibited values, blank required fields).
//!
//! All strategies deliver the same rows for the same options; they differ
//! only in cost.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::BufRead;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{KgtkError, Result};
use crate::value::{validate_cell, ValueOptions};

use super::cache::GraphCache;
use super::columns::{self, FileClass, KgtkColumns};
use super::compression::open_line_source;
use super::options::{InputFormat, ReaderOptions, ValidationAction};

/// Monotonic counters accumulated while reading. Exact by construction:
/// every considered line lands in exactly one bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadSummary {
    pub lines_read: usize,
    pub data_lines_passed: usize,
    pub data_lines_skipped: usize,
    pub data_lines_ignored: usize,
    pub data_lines_filled: usize,
    pub data_lines_truncated: usize,
    pub data_lines_excluded_short: usize,
    pub data_lines_excluded_long: usize,
    pub data_lines_excluded_blank: usize,
    pub data_lines_excluded_invalid_value: usize,
    pub data_lines_excluded_prohibited: usize,
    pub data_lines_excluded_by_filter: usize,
    pub repaired_values: usize,
    pub diagnostics: usize,
}

/// Where rows come from once the header is consumed.
enum ReadStrategy {
    /// Minimal split path. No per-cell work.
    Fast,
    /// Full validation/repair/sampling pipeline.
    General,
    /// Materialized rows from a graph cache. The query runs lazily on the
    /// first row request so later-registered filters can be pushed down.
    Cached {
        cache: GraphCache,
        table: String,
        rows: Option<std::vec::IntoIter<Vec<String>>>,
    },
}

enum LineSource {
    Lines(Box<dyn BufRead + Send>),
    Csv(csv::Reader<Box<dyn BufRead + Send>>),
    /// The cache strategy needs no line source.
    None,
}

/// One unit pulled from a line source.
enum Fetched {
    Line(String),
    Cells(Vec<String>),
    End,
}

/// A streaming reader over one KGTK file.
pub struct KgtkReader {
    options: ReaderOptions,
    value_options: ValueOptions,
    /// The resolved column schema; fixed after open.
    pub columns: KgtkColumns,
    strategy: ReadStrategy,
    source: LineSource,
    summary: ReadSummary,
    filters: HashMap<usize, HashSet<String>>,
    /// A record consumed during open to size generated column names.
    pending: Option<Vec<String>>,
    line_number: usize,
    data_lines_considered: usize,
    tail: Option<VecDeque<Vec<String>>>,
    tail_drained: bool,
    finished: bool,
}

impl KgtkReader {
    /// Open a file for reading. Fails on open-time structural errors:
    /// missing file, absent header, header errors, missing required
    /// columns, or a declared column count mismatch.
    pub fn open(
        path: impl AsRef<Path>,
        options: ReaderOptions,
        value_options: ValueOptions,
    ) -> Result<KgtkReader> {
        let path = path.as_ref();

        // Cache-backed path: only when the table is materialized and no
        // sampling or per-cell processing is requested.
        if let Some(cache_config) = &options.graph_cache {
            if !options.needs_row_processing() {
                let cache = GraphCache::open(&cache_config.path)?;
                if cache.table_exists(&cache_config.table)? {
                    let column_names = cache.column_names(&cache_config.table)?;
                    let columns = KgtkColumns::build(
                        column_names,
                        options.mode,
                        options.unsafe_column_name_action,
                    )?;
                    Self::check_expected_count(&options, columns.len())?;
                    tracing::debug!(table = %cache_config.table, "cache-backed read path");
                    let table = cache_config.table.clone();
                    return Ok(KgtkReader {
                        options,
                        value_options,
                        columns,
                        strategy: ReadStrategy::Cached {
                            cache,
                            table,
                            rows: None,
                        },
                        source: LineSource::None,
                        summary: ReadSummary::default(),
                        filters: HashMap::new(),
                        pending: None,
                        line_number: 0,
                        data_lines_considered: 0,
                        tail: None,
                        tail_drained: false,
                        finished: false,
                    });
                }
                tracing::debug!(table = %cache_config.table, "table not in cache, reading file");
            }
        }

        let raw = open_line_source(path, options.compression_type, options.parallel_gzip)?;
        let mut source = match options.input_format {
            InputFormat::Kgtk => LineSource::Lines(raw),
            InputFormat::Csv => LineSource::Csv(
                csv::ReaderBuilder::new()
                    .delimiter(b',')
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(raw),
            ),
        };

        // Header.
        let mut line_number = 0;
        let mut pending = None;
        let mut column_names = if options.no_input_header {
            match &options.force_column_names {
                Some(names) => names.clone(),
                None => {
                    // Size generated names from the first record, then hold
                    // that record back for the row pipeline.
                    let first = Self::next_raw_line(&mut source, options.column_separator)?
                        .ok_or_else(|| {
                            KgtkError::Header("empty input, no rows to size columns".to_string())
                        })?;
                    let names = columns::generated_column_names(first.len());
                    pending = Some(first);
                    names
                }
            }
        } else {
            line_number += 1;
            match Self::next_raw_line(&mut source, options.column_separator)? {
                Some(cells) => cells,
                None => return Err(KgtkError::Header("empty input, no header line".to_string())),
            }
        };

        if let Some(label) = &options.implied_label {
            if !column_names.iter().any(|name| name == "label") {
                tracing::debug!(label = %label, "appending implied label column");
                column_names.push("label".to_string());
            }
        }

        Self::check_expected_count(&options, column_names.len())?;

        let columns = match KgtkColumns::build(
            column_names,
            options.mode,
            options.unsafe_column_name_action,
        ) {
            Ok(columns) => columns,
            Err(e) => match options.header_error_action {
                ValidationAction::Pass
                | ValidationAction::Report
                | ValidationAction::Exclude
                | ValidationAction::Complain
                | ValidationAction::Error => return Err(e),
                ValidationAction::Exit => {
                    eprintln!("header error: {e}");
                    std::process::exit(1);
                }
            },
        };

        let strategy = if options.needs_row_processing() {
            tracing::debug!("general read path");
            ReadStrategy::General
        } else {
            tracing::debug!("fast read path");
            ReadStrategy::Fast
        };

        Ok(KgtkReader {
            tail: options.tail_count.map(|n| VecDeque::with_capacity(n + 1)),
            options,
            value_options,
            columns,
            strategy,
            source,
            summary: ReadSummary::default(),
            filters: HashMap::new(),
            pending,
            line_number,
            data_lines_considered: 0,
            tail_drained: false,
            finished: false,
        })
    }

    fn check_expected_count(options: &ReaderOptions, actual: usize) -> Result<()> {
        if let Some(expected) = options.expected_column_count {
            if actual != expected {
                return Err(KgtkError::Header(format!(
                    "expected {expected} columns, found {actual}"
                )));
            }
        }
        Ok(())
    }

    /// Restrict a column to a set of allowed values. On the cache path the
    /// filter is pushed down into the query; elsewhere it is an in-memory
    /// set check. Filters must be registered before the first row is read.
    pub fn add_input_filter(&mut self, column: &str, values: HashSet<String>) -> Result<()> {
        let idx = self
            .columns
            .index_of(column)
            .ok_or_else(|| KgtkError::MissingColumn(column.to_string()))?;
        self.filters.entry(idx).or_default().extend(values);
        Ok(())
    }

    /// The resolved file classification.
    pub fn file_class(&self) -> FileClass {
        self.columns.class
    }

    /// Counter snapshot for a post-run summary.
    pub fn summary(&self) -> ReadSummary {
        self.summary.clone()
    }

    /// Read one raw line/record as unprocessed cells.
    fn next_raw_line(source: &mut LineSource, separator: char) -> Result<Option<Vec<String>>> {
        match source {
            LineSource::Lines(reader) => {
                let mut line = String::new();
                let n = reader.read_line(&mut line).map_err(|e| KgtkError::Io {
                    path: "<input>".into(),
                    source: e,
                })?;
                if n == 0 {
                    return Ok(None);
                }
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(Some(columns::parse_header(&line, separator)))
            }
            LineSource::Csv(reader) => {
                let mut record = csv::StringRecord::new();
                if reader.read_record(&mut record)? {
                    Ok(Some(record.iter().map(|s| s.to_string()).collect()))
                } else {
                    Ok(None)
                }
            }
            LineSource::None => Ok(None),
        }
    }

    /// Apply one validation action to a detected violation. Returns true
    /// when the row should be kept.
    fn apply_action(
        &mut self,
        action: ValidationAction,
        line: usize,
        message: &str,
    ) -> Result<bool> {
        match action {
            ValidationAction::Pass => Ok(true),
            ValidationAction::Report => {
                self.diagnose(line, message)?;
                Ok(true)
            }
            ValidationAction::Exclude => Ok(false),
            ValidationAction::Complain => {
                self.diagnose(line, message)?;
                Ok(false)
            }
            ValidationAction::Error => Err(KgtkError::Row {
                line,
                message: message.to_string(),
            }),
            ValidationAction::Exit => {
                eprintln!("line {line}: {message}");
                std::process::exit(1);
            }
        }
    }

    fn diagnose(&mut self, line: usize, message: &str) -> Result<()> {
        tracing::warn!(line, "{message}");
        self.summary.diagnostics += 1;
        if self.summary.diagnostics >= self.options.error_limit {
            return Err(KgtkError::ErrorBudgetExhausted {
                count: self.summary.diagnostics,
            });
        }
        Ok(())
    }

    /// Produce the next delivered row, or `None` at end of input.
    pub fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }
        let result = self.next_row_inner();
        if matches!(result, Err(_) | Ok(None)) {
            self.finished = true;
        }
        result
    }

    fn next_row_inner(&mut self) -> Result<Option<Vec<String>>> {
        // Cached strategy: run the query lazily, then drain it.
        if let ReadStrategy::Cached { cache, table, rows } = &mut self.strategy {
            if rows.is_none() {
                let fetched = if self.filters.is_empty() {
                    cache.fetch_all(table, &self.columns.column_names)?
                } else {
                    let mut filters: IndexMap<String, Vec<String>> = IndexMap::new();
                    for (idx, values) in &self.filters {
                        let mut sorted: Vec<String> = values.iter().cloned().collect();
                        sorted.sort();
                        filters.insert(self.columns.column_names[*idx].clone(), sorted);
                    }
                    cache.fetch_filtered(table, &self.columns.column_names, &filters)?
                };
                self.summary.lines_read = fetched.len();
                self.summary.data_lines_passed = fetched.len();
                *rows = Some(fetched.into_iter());
            }
            return Ok(rows.as_mut().and_then(|iter| iter.next()));
        }

        if matches!(self.strategy, ReadStrategy::Fast) {
            return self.fast_next();
        }

        // Tail window: materialize everything once, then serve the back.
        if self.tail.is_some() && !self.tail_drained {
            let limit = self.options.tail_count.unwrap_or(0);
            while let Some(row) = self.pipeline_next()? {
                if let Some(window) = self.tail.as_mut() {
                    window.push_back(row);
                    if window.len() > limit {
                        window.pop_front();
                    }
                }
            }
            self.tail_drained = true;
        }
        if let Some(window) = &mut self.tail {
            return Ok(window.pop_front());
        }

        self.pipeline_next()
    }

    /// Fetch the next line or record, draining the held-back first record
    /// first. The source borrow is released before any policy dispatch.
    fn fetch_unit(&mut self) -> Result<Fetched> {
        if let Some(cells) = self.pending.take() {
            return Ok(Fetched::Cells(cells));
        }
        match &mut self.source {
            LineSource::Lines(reader) => {
                let mut raw = String::new();
                let n = reader.read_line(&mut raw).map_err(|e| KgtkError::Io {
                    path: "<input>".into(),
                    source: e,
                })?;
                if n == 0 {
                    Ok(Fetched::End)
                } else {
                    while raw.ends_with('\n') || raw.ends_with('\r') {
                        raw.pop();
                    }
                    Ok(Fetched::Line(raw))
                }
            }
            LineSource::Csv(reader) => {
                let mut record = csv::StringRecord::new();
                if reader.read_record(&mut record)? {
                    Ok(Fetched::Cells(record.iter().map(|s| s.to_string()).collect()))
                } else {
                    Ok(Fetched::End)
                }
            }
            LineSource::None => Ok(Fetched::End),
        }
    }

    /// Line-level checks for the native format: empty, whitespace-only, and
    /// comment lines. Returns false when the line's action consumed it.
    fn line_level_keep(&mut self, raw: &str, line: usize) -> Result<bool> {
        if raw.is_empty() {
            let action = self.options.empty_line_action;
            if !self.apply_action(action, line, "empty line")? {
                self.summary.data_lines_ignored += 1;
                return Ok(false);
            }
        } else if raw.chars().all(char::is_whitespace) {
            let action = self.options.whitespace_line_action;
            if !self.apply_action(action, line, "whitespace line")? {
                self.summary.data_lines_ignored += 1;
                return Ok(false);
            }
        } else if raw.starts_with('#') {
            let action = self.options.comment_line_action;
            if !self.apply_action(action, line, "comment line")? {
                self.summary.data_lines_ignored += 1;
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The minimal read loop: split, shape-check, filter. None of the
    /// per-cell machinery is configured when this strategy is selected, so
    /// repair, blank-field, prohibited-list, and sampling work is skipped
    /// wholesale.
    fn fast_next(&mut self) -> Result<Option<Vec<String>>> {
        loop {
            let fetched = self.fetch_unit()?;
            if matches!(fetched, Fetched::End) {
                return Ok(None);
            }
            self.line_number += 1;
            let line = self.line_number;
            self.summary.lines_read += 1;

            let cells = match fetched {
                Fetched::End => return Ok(None),
                Fetched::Cells(cells) => cells,
                Fetched::Line(raw) => {
                    if !self.line_level_keep(&raw, line)? {
                        continue;
                    }
                    columns::parse_header(&raw, self.options.column_separator)
                }
            };

            let expected = self.columns.len();
            if cells.len() < expected {
                let action = self.options.short_line_action;
                let message =
                    format!("short line: {} columns, expected {expected}", cells.len());
                if !self.apply_action(action, line, &message)? {
                    self.summary.data_lines_excluded_short += 1;
                    continue;
                }
            } else if cells.len() > expected {
                let action = self.options.long_line_action;
                let message =
                    format!("long line: {} columns, expected {expected}", cells.len());
                if !self.apply_action(action, line, &message)? {
                    self.summary.data_lines_excluded_long += 1;
                    continue;
                }
            }

            let filtered_out = self.filters.iter().any(|(idx, allowed)| {
                !cells
                    .get(*idx)
                    .map(|cell| allowed.contains(cell))
                    .unwrap_or(false)
            });
            if filtered_out {
                self.summary.data_lines_excluded_by_filter += 1;
                continue;
            }

            self.summary.data_lines_passed += 1;
            return Ok(Some(cells));
        }
    }

    /// One trip through the row pipeline. Loops until a row survives every
    /// configured check or the input ends.
    fn pipeline_next(&mut self) -> Result<Option<Vec<String>>> {
        loop {
            let fetched = self.fetch_unit()?;
            if matches!(fetched, Fetched::End) {
                return Ok(None);
            }
            self.line_number += 1;
            let line = self.line_number;
            self.summary.lines_read += 1;

            // Line-level checks apply to the native format only; the csv
            // crate has already consumed blank lines.
            let cells = match fetched {
                Fetched::End => return Ok(None),
                Fetched::Cells(cells) => cells,
                Fetched::Line(raw) => {
                    if !self.line_level_keep(&raw, line)? {
                        continue;
                    }
                    columns::parse_header(&raw, self.options.column_separator)
                }
            };

            // Sampling happens on considered data lines, before repair.
            self.data_lines_considered += 1;
            if let Some(limit) = self.options.record_limit {
                if self.data_lines_considered > limit {
                    return Ok(None);
                }
            }
            if self.data_lines_considered <= self.options.initial_skip_count {
                self.summary.data_lines_skipped += 1;
                continue;
            }
            if self.options.every_nth_record > 1 {
                let since_skip = self.data_lines_considered - self.options.initial_skip_count;
                if since_skip % self.options.every_nth_record != 0 {
                    self.summary.data_lines_skipped += 1;
                    continue;
                }
            }

            match self.process_cells(cells, line)? {
                Some(row) => return Ok(Some(row)),
                None => continue,
            }
        }
    }

    /// Shape, repair, validate, and filter one row. `None` = dropped.
    fn process_cells(&mut self, mut cells: Vec<String>, line: usize) -> Result<Option<Vec<String>>> {
        if let Some(label) = self.options.implied_label.clone() {
            // The implied label column was appended to the schema at open.
            if cells.len() == self.columns.len() - 1 {
                cells.push(label);
            }
        }

        let expected = self.columns.len();
        if cells.len() < expected {
            if self.options.fill_short_lines {
                cells.resize(expected, String::new());
                self.summary.data_lines_filled += 1;
            } else {
                let action = self.options.short_line_action;
                let message =
                    format!("short line: {} columns, expected {expected}", cells.len());
                if !self.apply_action(action, line, &message)? {
                    self.summary.data_lines_excluded_short += 1;
                    return Ok(None);
                }
            }
        } else if cells.len() > expected {
            if self.options.truncate_long_lines {
                cells.truncate(expected);
                self.summary.data_lines_truncated += 1;
            } else {
                let action = self.options.long_line_action;
                let message =
                    format!("long line: {} columns, expected {expected}", cells.len());
                if !self.apply_action(action, line, &message)? {
                    self.summary.data_lines_excluded_long += 1;
                    return Ok(None);
                }
            }
        }

        // Blank required fields.
        if self.options.blank_required_field_action != ValidationAction::Pass {
            for idx in self.columns.required_indices() {
                if cells.get(idx).map(|c| c.is_empty()).unwrap_or(true) {
                    let action = self.options.blank_required_field_action;
                    let name = self.columns.column_names[idx].clone();
                    let message = format!("blank required field '{name}'");
                    if !self.apply_action(action, line, &message)? {
                        self.summary.data_lines_excluded_blank += 1;
                        return Ok(None);
                    }
                }
            }
        }

        // Per-cell validation with optional repair.
        if self.options.invalid_value_action != ValidationAction::Pass
            || self.options.repair_invalid_values
        {
            for idx in 0..cells.len() {
                let (valid, repaired) = validate_cell(&cells[idx], &self.value_options);
                if let Some(fixed) = repaired {
                    if self.options.repair_invalid_values {
                        cells[idx] = fixed;
                        self.summary.repaired_values += 1;
                    }
                }
                if !valid && self.options.invalid_value_action != ValidationAction::Pass {
                    let action = self.options.invalid_value_action;
                    let name = self
                        .columns
                        .column_names
                        .get(idx)
                        .cloned()
                        .unwrap_or_default();
                    let message = format!("invalid value '{}' in column '{name}'", cells[idx]);
                    if !self.apply_action(action, line, &message)? {
                        self.summary.data_lines_excluded_invalid_value += 1;
                        return Ok(None);
                    }
                }
            }
        }

        // Prohibited values.
        if !self.options.prohibited_list.is_empty() {
            if let Some(bad) = cells
                .iter()
                .find(|cell| self.options.prohibited_list.contains(*cell))
            {
                let action = self.options.prohibited_list_action;
                let message = format!("prohibited value '{bad}'");
                if !self.apply_action(action, line, &message)? {
                    self.summary.data_lines_excluded_prohibited += 1;
                    return Ok(None);
                }
            }
        }

        // Input filters (silent exclusion, counted separately).
        let filtered_out = self.filters.iter().any(|(idx, allowed)| {
            !cells
                .get(*idx)
                .map(|cell| allowed.contains(cell))
                .unwrap_or(false)
        });
        if filtered_out {
            self.summary.data_lines_excluded_by_filter += 1;
            return Ok(None);
        }

        self.summary.data_lines_passed += 1;
        Ok(Some(cells))
    }
}

impl Iterator for KgtkReader {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn read_all(reader: KgtkReader) -> Vec<Vec<String>> {
        reader.map(|row| row.unwrap()).collect()
    }

    #[test]
    fn test_open_and_classify_edge_file() {
        let file = write_file("node1\tlabel\tnode2\na\tP31\tQ5\nb\tP31\tQ5\n");
        let reader = KgtkReader::open(
            file.path(),
            ReaderOptions::default(),
            ValueOptions::default(),
        )
        .unwrap();
        assert_eq!(reader.file_class(), FileClass::Edge);
        let rows = read_all(reader);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["a", "P31", "Q5"]);
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let result = KgtkReader::open(
            "/nonexistent/file.tsv",
            ReaderOptions::default(),
            ValueOptions::default(),
        );
        assert!(matches!(result, Err(KgtkError::Io { .. })));
    }

    #[test]
    fn test_empty_and_comment_lines_excluded() {
        let file = write_file("node1\tlabel\tnode2\n\n# comment\na\tP31\tQ5\n   \n");
        let reader = KgtkReader::open(
            file.path(),
            ReaderOptions::default(),
            ValueOptions::default(),
        )
        .unwrap();
        let mut reader = reader;
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().unwrap() {
            rows.push(row);
        }
        assert_eq!(rows.len(), 1);
        assert_eq!(reader.summary().data_lines_ignored, 3);
    }

    #[test]
    fn test_fill_and_truncate() {
        let file = write_file("node1\tlabel\tnode2\na\tP31\nb\tP31\tQ5\textra\n");
        let options = ReaderOptions {
            fill_short_lines: true,
            truncate_long_lines: true,
            blank_required_field_action: ValidationAction::Pass,
            ..ReaderOptions::default()
        };
        let mut reader =
            KgtkReader::open(file.path(), options, ValueOptions::default()).unwrap();
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().unwrap() {
            rows.push(row);
        }
        assert_eq!(rows[0], vec!["a", "P31", ""]);
        assert_eq!(rows[1], vec!["b", "P31", "Q5"]);
        assert_eq!(reader.summary().data_lines_filled, 1);
        assert_eq!(reader.summary().data_lines_truncated, 1);
    }

    #[test]
    fn test_short_line_error_action() {
        let file = write_file("node1\tlabel\tnode2\na\tP31\n");
        let options = ReaderOptions {
            short_line_action: ValidationAction::Error,
            ..ReaderOptions::default()
        };
        let mut reader =
            KgtkReader::open(file.path(), options, ValueOptions::default()).unwrap();
        assert!(matches!(reader.next_row(), Err(KgtkError::Row { .. })));
    }

    #[test]
    fn test_blank_required_field_excluded() {
        let file = write_file("node1\tlabel\tnode2\n\tP31\tQ5\na\tP31\tQ5\n");
        let mut reader = KgtkReader::open(
            file.path(),
            ReaderOptions::default(),
            ValueOptions::default(),
        )
        .unwrap();
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().unwrap() {
            rows.push(row);
        }
        assert_eq!(rows.len(), 1);
        assert_eq!(reader.summary().data_lines_excluded_blank, 1);
    }

    #[test]
    fn test_sampling_skip_every_nth_limit() {
        let body: String = (0..10).map(|i| format!("n{i}\tP1\tv{i}\n")).collect();
        let file = write_file(&format!("node1\tlabel\tnode2\n{body}"));
        let options = ReaderOptions {
            initial_skip_count: 2,
            every_nth_record: 2,
            record_limit: Some(8),
            ..ReaderOptions::default()
        };
        let reader = KgtkReader::open(file.path(), options, ValueOptions::default()).unwrap();
        let rows = read_all(reader);
        // Considered lines 1..=8; skip 2; then every 2nd of the rest.
        let names: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["n3", "n5", "n7"]);
    }

    #[test]
    fn test_tail_window() {
        let body: String = (0..10).map(|i| format!("n{i}\tP1\tv{i}\n")).collect();
        let file = write_file(&format!("node1\tlabel\tnode2\n{body}"));
        let options = ReaderOptions {
            tail_count: Some(3),
            ..ReaderOptions::default()
        };
        let reader = KgtkReader::open(file.path(), options, ValueOptions::default()).unwrap();
        let rows = read_all(reader);
        let names: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, vec!["n7", "n8", "n9"]);
    }

    #[test]
    fn test_implied_label() {
        let file = write_file("node1\tnode2\na\tQ5\n");
        let options = ReaderOptions {
            implied_label: Some("P31".to_string()),
            ..ReaderOptions::default()
        };
        let reader = KgtkReader::open(file.path(), options, ValueOptions::default()).unwrap();
        assert_eq!(reader.file_class(), FileClass::Edge);
        let rows = read_all(reader);
        assert_eq!(rows[0], vec!["a", "Q5", "P31"]);
    }

    #[test]
    fn test_prohibited_list() {
        let file = write_file("node1\tlabel\tnode2\na\tP31\tQ5\nb\tP31\tBAD\n");
        let options = ReaderOptions {
            prohibited_list: ["BAD".to_string()].into_iter().collect(),
            ..ReaderOptions::default()
        };
        let mut reader =
            KgtkReader::open(file.path(), options, ValueOptions::default()).unwrap();
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().unwrap() {
            rows.push(row);
        }
        assert_eq!(rows.len(), 1);
        assert_eq!(reader.summary().data_lines_excluded_prohibited, 1);
    }

    #[test]
    fn test_invalid_value_action() {
        let file = write_file("node1\tlabel\tnode2\na\tP31\t\"bad \" quote\"\nb\tP31\tQ5\n");
        let options = ReaderOptions {
            invalid_value_action: ValidationAction::Exclude,
            ..ReaderOptions::default()
        };
        let mut reader =
            KgtkReader::open(file.path(), options, ValueOptions::default()).unwrap();
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().unwrap() {
            rows.push(row);
        }
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "b");
        assert_eq!(reader.summary().data_lines_excluded_invalid_value, 1);
    }

    #[test]
    fn test_input_filter() {
        let file = write_file("node1\tlabel\tnode2\na\tP31\tQ5\nb\tP31\tQ6\nc\tP31\tQ5\n");
        let mut reader = KgtkReader::open(
            file.path(),
            ReaderOptions::default(),
            ValueOptions::default(),
        )
        .unwrap();
        reader
            .add_input_filter("node2", ["Q5".to_string()].into_iter().collect())
            .unwrap();
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().unwrap() {
            rows.push(row);
        }
        assert_eq!(rows.len(), 2);
        assert_eq!(reader.summary().data_lines_excluded_by_filter, 1);
    }

    #[test]
    fn test_counters_partition_lines() {
        let file = write_file("node1\tlabel\tnode2\n\na\tP31\tQ5\n# c\n\tP31\tQ5\n");
        let mut reader = KgtkReader::open(
            file.path(),
            ReaderOptions::default(),
            ValueOptions::default(),
        )
        .unwrap();
        while let Some(_row) = reader.next_row().unwrap() {}
        let summary = reader.summary();
        assert_eq!(summary.lines_read, 4);
        assert_eq!(
            summary.data_lines_passed
                + summary.data_lines_ignored
                + summary.data_lines_excluded_blank,
            summary.lines_read
        );
    }

    #[test]
    fn test_csv_input_format() {
        let file = write_file("node1,label,node2\na,P31,Q5\n");
        let options = ReaderOptions {
            input_format: InputFormat::Csv,
            column_separator: ',',
            ..ReaderOptions::default()
        };
        let reader = KgtkReader::open(file.path(), options, ValueOptions::default()).unwrap();
        let rows = read_all(reader);
        assert_eq!(rows[0], vec!["a", "P31", "Q5"]);
    }
}
