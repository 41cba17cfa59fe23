//! Row writer: the dual of the reader.
//!
//! A writer takes column names up front and streams rows to a sink in one
//! of several serialization formats, enforcing a shape policy on every row.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{KgtkError, Result};

/// Output serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterFormat {
    /// Native tab-separated KGTK.
    Kgtk,
    /// Comma-separated.
    Csv,
    /// Markdown table.
    Md,
    /// HTML table.
    Html,
}

/// How strictly a row's length must match the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapePolicy {
    /// Row length must equal the column count.
    Exact,
    /// Short rows are padded with empty cells.
    Fill,
    /// Extra trailing cells are dropped; short rows are still errors.
    TolerateExtra,
}

enum Sink {
    Delimited {
        out: Box<dyn Write + Send>,
        separator: char,
    },
    Csv(csv::Writer<Box<dyn Write + Send>>),
    Md(Box<dyn Write + Send>),
    Html(Box<dyn Write + Send>),
}

/// A streaming row writer.
pub struct KgtkWriter {
    column_names: Vec<String>,
    column_name_map: IndexMap<String, usize>,
    shape: ShapePolicy,
    sink: Sink,
    rows_written: usize,
    closed: bool,
}

impl KgtkWriter {
    /// Open a writer over an arbitrary sink, emitting the header
    /// immediately.
    pub fn from_writer(
        column_names: Vec<String>,
        sink: Box<dyn Write + Send>,
        format: WriterFormat,
        shape: ShapePolicy,
    ) -> Result<KgtkWriter> {
        let mut column_name_map = IndexMap::new();
        for (idx, name) in column_names.iter().enumerate() {
            column_name_map.insert(name.clone(), idx);
        }

        let mut sink = match format {
            WriterFormat::Kgtk => Sink::Delimited {
                out: sink,
                separator: '\t',
            },
            WriterFormat::Csv => Sink::Csv(csv::WriterBuilder::new().from_writer(sink)),
            WriterFormat::Md => Sink::Md(sink),
            WriterFormat::Html => Sink::Html(sink),
        };
        write_header(&mut sink, &column_names)?;

        Ok(KgtkWriter {
            column_names,
            column_name_map,
            shape,
            sink,
            rows_written: 0,
            closed: false,
        })
    }

    /// Open a writer backed by a file.
    pub fn open_path(
        column_names: Vec<String>,
        path: impl AsRef<Path>,
        format: WriterFormat,
        shape: ShapePolicy,
    ) -> Result<KgtkWriter> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| KgtkError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_writer(column_names, Box::new(BufWriter::new(file)), format, shape)
    }

    /// Append one row, enforcing the shape policy.
    pub fn write(&mut self, row: &[String]) -> Result<()> {
        let expected = self.column_names.len();
        let shaped: Vec<&str> = match row.len().cmp(&expected) {
            std::cmp::Ordering::Equal => row.iter().map(|s| s.as_str()).collect(),
            std::cmp::Ordering::Less => match self.shape {
                ShapePolicy::Fill => {
                    let mut shaped: Vec<&str> = row.iter().map(|s| s.as_str()).collect();
                    shaped.resize(expected, "");
                    shaped
                }
                _ => {
                    return Err(KgtkError::Row {
                        line: self.rows_written + 1,
                        message: format!(
                            "row has {} cells, schema has {expected}",
                            row.len()
                        ),
                    })
                }
            },
            std::cmp::Ordering::Greater => match self.shape {
                ShapePolicy::TolerateExtra => {
                    row.iter().take(expected).map(|s| s.as_str()).collect()
                }
                _ => {
                    return Err(KgtkError::Row {
                        line: self.rows_written + 1,
                        message: format!(
                            "row has {} cells, schema has {expected}",
                            row.len()
                        ),
                    })
                }
            },
        };
        write_cells(&mut self.sink, &shaped)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Write a row assembled by column-name lookup; unset columns default
    /// to the empty string. Unknown names are ignored.
    pub fn write_map(&mut self, values: &HashMap<String, String>) -> Result<()> {
        let mut row = vec![String::new(); self.column_names.len()];
        for (name, value) in values {
            if let Some(&idx) = self.column_name_map.get(name) {
                row[idx] = value.clone();
            }
        }
        self.write(&row)
    }

    /// Rows written so far (header excluded).
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Flush and release the sink. Formats with footers emit them here.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match &mut self.sink {
            Sink::Delimited { out, .. } => out.flush().map_err(io_error)?,
            Sink::Csv(writer) => writer.flush().map_err(|e| KgtkError::Io {
                path: "<output>".into(),
                source: e,
            })?,
            Sink::Md(out) => out.flush().map_err(io_error)?,
            Sink::Html(out) => {
                out.write_all(b"</table>\n").map_err(io_error)?;
                out.flush().map_err(io_error)?;
            }
        }
        Ok(())
    }
}

fn io_error(e: std::io::Error) -> KgtkError {
    KgtkError::Io {
        path: "<output>".into(),
        source: e,
    }
}

fn write_header(sink: &mut Sink, column_names: &[String]) -> Result<()> {
    match sink {
        Sink::Delimited { out, separator } => {
            let line = column_names.join(&separator.to_string());
            writeln!(out, "{line}").map_err(io_error)?;
        }
        Sink::Csv(writer) => writer.write_record(column_names)?,
        Sink::Md(out) => {
            writeln!(out, "| {} |", column_names.join(" | ")).map_err(io_error)?;
            let rule: Vec<&str> = column_names.iter().map(|_| "--").collect();
            writeln!(out, "| {} |", rule.join(" | ")).map_err(io_error)?;
        }
        Sink::Html(out) => {
            writeln!(out, "<table>").map_err(io_error)?;
            let cells: String = column_names
                .iter()
                .map(|name| format!("<th>{}</th>", escape_html(name)))
                .collect();
            writeln!(out, "<tr>{cells}</tr>").map_err(io_error)?;
        }
    }
    Ok(())
}

fn write_cells(sink: &mut Sink, cells: &[&str]) -> Result<()> {
    match sink {
        Sink::Delimited { out, separator } => {
            let line = cells.join(&separator.to_string());
            writeln!(out, "{line}").map_err(io_error)?;
        }
        Sink::Csv(writer) => writer.write_record(cells)?,
        Sink::Md(out) => {
            let escaped: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|")).collect();
            writeln!(out, "| {} |", escaped.join(" | ")).map_err(io_error)?;
        }
        Sink::Html(out) => {
            let rendered: String = cells
                .iter()
                .map(|cell| format!("<td>{}</td>", escape_html(cell)))
                .collect();
            writeln!(out, "<tr>{rendered}</tr>").map_err(io_error)?;
        }
    }
    Ok(())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
