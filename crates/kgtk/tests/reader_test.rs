//! Integration tests for the row reader's three read paths.

use std::collections::HashSet;
use std::io::Write;

use tempfile::NamedTempFile;

use kgtk::io::{
    GraphCache, GraphCacheConfig, KgtkFileMode, KgtkReader, ReaderOptions, ValidationAction,
};
use kgtk::value::ValueOptions;

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn edge_content() -> &'static str {
    "node1\tlabel\tnode2\n\
     a\tP31\tQ5\n\
     b\tP31\tQ5\n\
     c\tP279\tQ2\n\
     d\tP31\tQ6\n"
}

fn read_all(path: &std::path::Path, options: ReaderOptions) -> Vec<Vec<String>> {
    let mut reader = KgtkReader::open(path, options, ValueOptions::default())
        .expect("Failed to open reader");
    let mut rows = Vec::new();
    while let Some(row) = reader.next_row().expect("read failed") {
        rows.push(row);
    }
    rows
}

// =============================================================================
// Path Equivalence
// =============================================================================

#[test]
fn test_fast_and_general_paths_agree() {
    let file = create_test_file(edge_content());

    let mut fast = ReaderOptions::default();
    fast.blank_required_field_action = ValidationAction::Pass;

    // Any per-cell option forces the general path; REPORT keeps all rows.
    let mut general = ReaderOptions::default();
    general.blank_required_field_action = ValidationAction::Pass;
    general.invalid_value_action = ValidationAction::Report;

    let fast_rows = read_all(file.path(), fast);
    let general_rows = read_all(file.path(), general);
    assert_eq!(fast_rows.len(), 4);
    assert_eq!(fast_rows, general_rows);
}

#[test]
fn test_fast_path_applies_line_and_shape_checks() {
    // Comment, empty, and short lines must land in the same counter
    // buckets on both file paths, leaving identical delivered rows.
    let content = "node1\tlabel\tnode2\n\
                   a\tP31\tQ5\n\
                   # comment\n\
                   \n\
                   b\tP31\n\
                   c\tP279\tQ2\n";
    let file = create_test_file(content);

    let mut fast = ReaderOptions::default();
    fast.blank_required_field_action = ValidationAction::Pass;
    fast.short_line_action = ValidationAction::Exclude;

    let mut general = fast.clone();
    general.invalid_value_action = ValidationAction::Report;

    let mut summaries = Vec::new();
    let mut row_sets = Vec::new();
    for options in [fast, general] {
        let mut reader = KgtkReader::open(file.path(), options, ValueOptions::default())
            .expect("Failed to open reader");
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().expect("read failed") {
            rows.push(row);
        }
        summaries.push(reader.summary());
        row_sets.push(rows);
    }

    assert_eq!(row_sets[0], row_sets[1]);
    assert_eq!(row_sets[0].len(), 2);
    for summary in &summaries {
        assert_eq!(summary.lines_read, 5);
        assert_eq!(summary.data_lines_ignored, 2);
        assert_eq!(summary.data_lines_excluded_short, 1);
        assert_eq!(summary.data_lines_passed, 2);
    }
}

#[test]
fn test_cached_path_agrees_with_file_paths() {
    let file = create_test_file(edge_content());
    let db = NamedTempFile::new().expect("Failed to create temp db");

    let mut plain = ReaderOptions::default();
    plain.blank_required_field_action = ValidationAction::Pass;
    let file_rows = read_all(file.path(), plain.clone());

    let column_names: Vec<String> = ["node1", "label", "node2"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut cache = GraphCache::open(db.path()).expect("Failed to open cache");
    cache
        .import("edges", &column_names, &file_rows)
        .expect("import failed");
    drop(cache);

    let mut cached = plain;
    cached.graph_cache = Some(GraphCacheConfig {
        path: db.path().to_path_buf(),
        table: "edges".to_string(),
    });
    let cached_rows = read_all(file.path(), cached);
    assert_eq!(file_rows, cached_rows);
}

#[test]
fn test_cached_path_filter_pushdown() {
    let file = create_test_file(edge_content());
    let db = NamedTempFile::new().expect("Failed to create temp db");

    let mut plain = ReaderOptions::default();
    plain.blank_required_field_action = ValidationAction::Pass;
    let file_rows = read_all(file.path(), plain.clone());

    let column_names: Vec<String> = ["node1", "label", "node2"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut cache = GraphCache::open(db.path()).expect("Failed to open cache");
    cache
        .import("edges", &column_names, &file_rows)
        .expect("import failed");
    drop(cache);

    let mut cached = plain.clone();
    cached.graph_cache = Some(GraphCacheConfig {
        path: db.path().to_path_buf(),
        table: "edges".to_string(),
    });
    let mut reader = KgtkReader::open(file.path(), cached, ValueOptions::default())
        .expect("Failed to open reader");
    reader
        .add_input_filter("label", HashSet::from(["P31".to_string()]))
        .expect("filter failed");
    let mut cached_rows = Vec::new();
    while let Some(row) = reader.next_row().expect("read failed") {
        cached_rows.push(row.clone());
    }

    // The general path applies the same filter in-process.
    let mut reader = KgtkReader::open(file.path(), plain, ValueOptions::default())
        .expect("Failed to open reader");
    reader
        .add_input_filter("label", HashSet::from(["P31".to_string()]))
        .expect("filter failed");
    let mut general_rows = Vec::new();
    while let Some(row) = reader.next_row().expect("read failed") {
        general_rows.push(row.clone());
    }

    assert_eq!(general_rows.len(), 3);
    assert_eq!(cached_rows, general_rows);
}

// =============================================================================
// ValidationAction Partition
// =============================================================================

#[test]
fn test_action_partition_accounts_for_every_line() {
    let content = "node1\tlabel\tnode2\n\
                   a\tP31\tQ5\n\
                   \n\
                   # comment\n\
                   \tP31\tQ5\n\
                   b\tP31\tQ5\n";
    let file = create_test_file(content);

    let mut reader = KgtkReader::open(
        file.path(),
        ReaderOptions::default(),
        ValueOptions::default(),
    )
    .expect("Failed to open reader");
    let mut passed = 0;
    while let Some(_row) = reader.next_row().expect("read failed") {
        passed += 1;
    }
    let summary = reader.summary();

    assert_eq!(passed, 2);
    assert_eq!(summary.data_lines_passed, 2);
    // Empty + comment excluded silently, blank node1 complained about.
    assert_eq!(summary.data_lines_ignored, 2);
    assert_eq!(summary.data_lines_excluded_blank, 1);
    assert_eq!(
        summary.lines_read,
        summary.data_lines_passed
            + summary.data_lines_ignored
            + summary.data_lines_excluded_blank
    );
}

#[test]
fn test_error_action_aborts() {
    let content = "node1\tlabel\tnode2\n\tP31\tQ5\n";
    let file = create_test_file(content);

    let mut options = ReaderOptions::default();
    options.blank_required_field_action = ValidationAction::Error;
    let mut reader = KgtkReader::open(file.path(), options, ValueOptions::default())
        .expect("Failed to open reader");
    assert!(reader.next_row().is_err());
}

#[test]
fn test_headerless_input_generates_column_names() {
    let file = create_test_file("a\tP31\tQ5\nb\tP279\tQ2\n");

    let mut options = ReaderOptions::default();
    options.blank_required_field_action = ValidationAction::Pass;
    options.no_input_header = true;
    options.mode = KgtkFileMode::None;

    let mut reader = KgtkReader::open(file.path(), options, ValueOptions::default())
        .expect("Failed to open reader");
    assert_eq!(
        reader.columns.column_names,
        vec!["column_1", "column_2", "column_3"]
    );

    // The record consumed to size the names is still delivered.
    let mut rows = Vec::new();
    while let Some(row) = reader.next_row().expect("read failed") {
        rows.push(row);
    }
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "a");
    assert_eq!(rows[1][0], "b");
}

#[test]
fn test_sampling_composes_with_cache_fallback() {
    // Sampling disqualifies the cache path; the reader must silently fall
    // back to the file even when a cache is configured.
    let file = create_test_file(edge_content());
    let db = NamedTempFile::new().expect("Failed to create temp db");

    let mut options = ReaderOptions::default();
    options.blank_required_field_action = ValidationAction::Pass;
    options.record_limit = Some(2);
    options.graph_cache = Some(GraphCacheConfig {
        path: db.path().to_path_buf(),
        table: "missing".to_string(),
    });
    let rows = read_all(file.path(), options);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "a");
    assert_eq!(rows[1][0], "b");
}
