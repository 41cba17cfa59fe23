//! KGTK: a streaming engine for knowledge-graph tabular files.
//!
//! KGTK files are UTF-8 tab-separated tables with a one-line header. Edge
//! files carry `node1`/`label`/`node2` (plus optional `id`); node files
//! carry `id`. Cells encode typed values through leading sigils: `"` for
//! strings, `'...'@lang` for language-qualified strings, `^` for dates,
//! `@` for coordinates, and `|` separates list items.
//!
//! # Core pieces
//!
//! - **Values**: classify, validate, and optionally repair single cells
//!   ([`value::KgtkValue`]).
//! - **Reader/Writer**: streaming row I/O with per-violation policies,
//!   sampling, compression, and a cache-backed read path
//!   ([`io::KgtkReader`], [`io::KgtkWriter`]).
//! - **Property patterns**: a rule language over edge files, loaded from
//!   a pattern file and enforced per node1 group
//!   ([`pattern::PropertyPatterns`], [`pattern::PatternValidator`]).
//!
//! # Example
//!
//! ```no_run
//! use kgtk::io::{KgtkReader, ReaderOptions};
//! use kgtk::value::ValueOptions;
//!
//! let mut reader =
//!     KgtkReader::open("edges.tsv", ReaderOptions::default(), ValueOptions::default())
//!         .unwrap();
//! while let Some(row) = reader.next_row().unwrap() {
//!     println!("{}", row.join("\t"));
//! }
//! ```

pub mod error;
pub mod group;
pub mod io;
pub mod pattern;
pub mod value;

pub use error::{KgtkError, Result};
pub use group::{GroupBuffer, KeyBy};
pub use io::{KgtkReader, KgtkWriter, ReaderOptions, ValidationAction};
pub use pattern::{PatternValidator, PropertyPatterns, ValidatorOptions};
pub use value::{KgtkDatatype, KgtkValue, ValueOptions};
