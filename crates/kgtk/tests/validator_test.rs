//! End-to-end property-pattern validation: pattern file and data file go
//! through the reader, rows route through writers, and the accepted output
//! is read back.

use std::io::Write;

use tempfile::NamedTempFile;

use kgtk::io::{
    KgtkReader, KgtkWriter, ReaderOptions, ShapePolicy, ValidationAction, WriterFormat,
};
use kgtk::pattern::{PatternValidator, PropertyPatterns, ValidatorOptions};
use kgtk::value::ValueOptions;

fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn open_reader(path: &std::path::Path) -> KgtkReader {
    let mut options = ReaderOptions::default();
    options.blank_required_field_action = ValidationAction::Pass;
    KgtkReader::open(path, options, ValueOptions::default()).expect("Failed to open reader")
}

fn load_patterns(content: &str) -> PropertyPatterns {
    let file = create_test_file(content);
    let mut reader = open_reader(file.path());
    PropertyPatterns::load(&mut reader).expect("Failed to load patterns")
}

fn read_back(path: &std::path::Path) -> Vec<Vec<String>> {
    let mut reader = open_reader(path);
    let mut rows = Vec::new();
    while let Some(row) = reader.next_row().expect("read failed") {
        rows.push(row);
    }
    rows
}

#[test]
fn test_end_to_end_routing_through_writers() {
    let patterns = load_patterns(
        "node1\tlabel\tnode2\n\
         P31\tnode2_pattern\t\"^Q[0-9]+$\"\n\
         P31\tmustoccur\tTrue\n\
         P31\tminoccurs\t1\n",
    );
    let data = create_test_file(
        "node1\tlabel\tnode2\n\
         a\tP31\tQ5\n\
         b\tP31\tfoo\n\
         c\tP31\tQ7\n",
    );
    let accepted_file = NamedTempFile::new().expect("Failed to create temp file");
    let rejected_file = NamedTempFile::new().expect("Failed to create temp file");

    let mut reader = open_reader(data.path());
    let columns = reader.columns.clone();
    let mut validator = PatternValidator::new(
        &patterns,
        &columns,
        ValidatorOptions::default(),
        ValueOptions::default(),
    )
    .expect("Failed to build validator");

    let mut accepted = KgtkWriter::open_path(
        validator.output_column_names(),
        accepted_file.path(),
        WriterFormat::Kgtk,
        ShapePolicy::Exact,
    )
    .expect("Failed to open writer");
    let mut rejected = KgtkWriter::open_path(
        validator.output_column_names(),
        rejected_file.path(),
        WriterFormat::Kgtk,
        ShapePolicy::Exact,
    )
    .expect("Failed to open writer");

    let summary = validator
        .process(&mut reader, Some(&mut accepted), Some(&mut rejected))
        .expect("process failed");
    accepted.close().expect("close failed");
    rejected.close().expect("close failed");

    assert_eq!(summary.rows_passed, 2);
    assert_eq!(summary.rows_rejected, 1);

    let accepted_rows = read_back(accepted_file.path());
    assert_eq!(accepted_rows.len(), 2);
    assert!(accepted_rows.iter().all(|row| row[2].starts_with('Q')));

    let rejected_rows = read_back(rejected_file.path());
    assert_eq!(rejected_rows.len(), 1);
    assert_eq!(rejected_rows[0][0], "b");
}

#[test]
fn test_maxoccurs_zero_diagnostic() {
    let patterns = load_patterns(
        "node1\tlabel\tnode2\n\
         P31\tmaxoccurs\t0\n",
    );
    let data = create_test_file(
        "node1\tlabel\tnode2\n\
         a\tP31\tQ5\n\
         b\tP31\tQ5\n",
    );
    let mut reader = open_reader(data.path());
    let columns = reader.columns.clone();
    let mut validator = PatternValidator::new(
        &patterns,
        &columns,
        ValidatorOptions::default(),
        ValueOptions::default(),
    )
    .expect("Failed to build validator");
    let mut rejected: Vec<Vec<String>> = Vec::new();
    let summary = validator
        .process(&mut reader, None, Some(&mut rejected))
        .expect("process failed");

    assert_eq!(rejected.len(), 2);
    assert!(summary
        .complaints
        .iter()
        .any(|complaint| complaint.contains("maximum is 0")));
}

#[test]
fn test_minval_boundary() {
    let patterns = load_patterns(
        "node1\tlabel\tnode2\n\
         height\tminval\t0\n",
    );
    let data = create_test_file(
        "node1\tlabel\tnode2\n\
         a\theight\t-5\n\
         b\theight\t5\n\
         c\theight\t0\n",
    );
    let mut reader = open_reader(data.path());
    let columns = reader.columns.clone();
    let mut validator = PatternValidator::new(
        &patterns,
        &columns,
        ValidatorOptions::default(),
        ValueOptions::default(),
    )
    .expect("Failed to build validator");
    let mut accepted: Vec<Vec<String>> = Vec::new();
    let mut rejected: Vec<Vec<String>> = Vec::new();
    let summary = validator
        .process(&mut reader, Some(&mut accepted), Some(&mut rejected))
        .expect("process failed");

    // Zero itself satisfies minval 0.
    assert_eq!(accepted.len(), 2);
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0][0], "a");
    assert!(summary
        .complaints
        .iter()
        .any(|complaint| complaint.contains("less than minval 0.000000")));
}

#[test]
fn test_switch_and_chain_against_files() {
    // Every node2 of P1 must be either a number or a reference to a human.
    let patterns = load_patterns(
        "node1\tlabel\tnode2\n\
         P1\tswitch\tnum|ref\n\
         num\tnode2_type\tnumber\n\
         ref\tnode2_chain\thuman\n\
         human\tnode2_pattern\t\"^Q[0-9]+$\"\n",
    );
    let data = create_test_file(
        "node1\tlabel\tnode2\n\
         a\tP1\t42\n\
         b\tP1\tc\n\
         c\thuman\tQ5\n",
    );
    let mut reader = open_reader(data.path());
    let columns = reader.columns.clone();
    let mut validator = PatternValidator::new(
        &patterns,
        &columns,
        ValidatorOptions::default(),
        ValueOptions::default(),
    )
    .expect("Failed to build validator");
    let mut accepted: Vec<Vec<String>> = Vec::new();
    let mut rejected: Vec<Vec<String>> = Vec::new();
    validator
        .process(&mut reader, Some(&mut accepted), Some(&mut rejected))
        .expect("process failed");

    assert_eq!(accepted.len(), 3);
    assert!(rejected.is_empty());
}

#[test]
fn test_pattern_load_error_is_fatal() {
    let file = create_test_file(
        "node1\tlabel\tnode2\n\
         P31\tnot_a_real_action\tTrue\n",
    );
    let mut reader = open_reader(file.path());
    assert!(PropertyPatterns::load(&mut reader).is_err());
}
