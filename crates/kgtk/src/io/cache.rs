//! SQLite-backed graph cache.
//!
//! A graph cache holds previously-imported files as materialized tables.
//! When a reader's requested file is present, rows are served by query
//! instead of re-parsing the source, with equality/IN filters pushed down.
//! Large filter sets are batched with a bounded per-column batch size and
//! the batches are iterated combinatorially across filtered columns.

use std::path::Path;

use indexmap::IndexMap;
use rusqlite::Connection;

use crate::error::Result;

/// Maximum number of values bound per column per query.
pub const FILTER_BATCH_SIZE: usize = 300;

/// An open graph cache database.
pub struct GraphCache {
    conn: Connection,
}

impl GraphCache {
    /// Open (or create) a cache database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// An in-memory cache, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// True when the named table is materialized in this cache.
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let count: usize = self.conn.query_row(
            "select count(*) from sqlite_master where type = 'table' and name = ?",
            [table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Column names of a materialized table, in declaration order.
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let mut statement = self
            .conn
            .prepare(&format!("pragma table_info({})", quote_identifier(table)))?;
        let names = statement
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Materialize a table from a header and rows. Any existing table of
    /// the same name is replaced.
    pub fn import(&mut self, table: &str, column_names: &[String], rows: &[Vec<String>]) -> Result<()> {
        let quoted_table = quote_identifier(table);
        self.conn
            .execute(&format!("drop table if exists {quoted_table}"), [])?;
        let column_defs = column_names
            .iter()
            .map(|name| format!("{} text", quote_identifier(name)))
            .collect::<Vec<_>>()
            .join(", ");
        self.conn
            .execute(&format!("create table {quoted_table} ({column_defs})"), [])?;

        let placeholders = vec!["?"; column_names.len()].join(", ");
        let transaction = self.conn.transaction()?;
        {
            let mut insert = transaction.prepare(&format!(
                "insert into {quoted_table} values ({placeholders})"
            ))?;
            for row in rows {
                insert.execute(rusqlite::params_from_iter(row.iter()))?;
            }
        }
        transaction.commit()?;
        Ok(())
    }

    /// All rows of a table, in import (rowid) order.
    pub fn fetch_all(&self, table: &str, column_names: &[String]) -> Result<Vec<Vec<String>>> {
        let select_list = quoted_list(column_names);
        let mut statement = self.conn.prepare(&format!(
            "select {select_list} from {} order by rowid",
            quote_identifier(table)
        ))?;
        let rows = statement
            .query_map([], |row| read_row(row, column_names.len()))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Rows matching per-column value-set filters. Each column's values are
    /// split into batches of at most [`FILTER_BATCH_SIZE`] and every batch
    /// combination is queried, keeping parameter lists bounded.
    pub fn fetch_filtered(
        &self,
        table: &str,
        column_names: &[String],
        filters: &IndexMap<String, Vec<String>>,
    ) -> Result<Vec<Vec<String>>> {
        if filters.is_empty() {
            return self.fetch_all(table, column_names);
        }

        let filter_columns: Vec<&String> = filters.keys().collect();
        let batches: Vec<Vec<&[String]>> = filters
            .values()
            .map(|values| values.chunks(FILTER_BATCH_SIZE).collect())
            .collect();

        let mut results: Vec<(i64, Vec<String>)> = Vec::new();
        // Odometer over one batch index per filtered column.
        let mut cursor = vec![0usize; batches.len()];
        'combinations: loop {
            let selected: Vec<&[String]> = cursor
                .iter()
                .zip(&batches)
                .map(|(&i, column_batches)| column_batches[i])
                .collect();
            results.extend(self.fetch_batch(table, column_names, &filter_columns, &selected)?);

            let mut position = 0;
            loop {
                if position == cursor.len() {
                    break 'combinations;
                }
                cursor[position] += 1;
                if cursor[position] < batches[position].len() {
                    break;
                }
                cursor[position] = 0;
                position += 1;
            }
        }

        // Batch combinations return disjoint row sets; a rowid merge
        // restores the table's import order across them.
        results.sort_by_key(|(rowid, _)| *rowid);
        Ok(results.into_iter().map(|(_, row)| row).collect())
    }

    fn fetch_batch(
        &self,
        table: &str,
        column_names: &[String],
        filter_columns: &[&String],
        batches: &[&[String]],
    ) -> Result<Vec<(i64, Vec<String>)>> {
        let select_list = quoted_list(column_names);
        let predicates = filter_columns
            .iter()
            .zip(batches)
            .map(|(column, batch)| {
                let placeholders = vec!["?"; batch.len()].join(", ");
                format!("{} in ({placeholders})", quote_identifier(column))
            })
            .collect::<Vec<_>>()
            .join(" and ");
        let mut statement = self.conn.prepare(&format!(
            "select rowid, {select_list} from {} where {predicates} order by rowid",
            quote_identifier(table)
        ))?;
        let params: Vec<&String> = batches.iter().flat_map(|batch| batch.iter()).collect();
        let rows = statement
            .query_map(rusqlite::params_from_iter(params), |row| {
                let rowid: i64 = row.get(0)?;
                Ok((rowid, read_row_from(row, 1, column_names.len())?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn read_row(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Vec<String>> {
    read_row_from(row, 0, width)
}

fn read_row_from(row: &rusqlite::Row<'_>, start: usize, width: usize) -> rusqlite::Result<Vec<String>> {
    (start..start + width)
        .map(|i| {
            row.get::<_, Option<String>>(i)
                .map(|cell| cell.unwrap_or_default())
        })
        .collect()
}

fn quoted_list(column_names: &[String]) -> String {
    column_names
        .iter()
        .map(|name| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cache() -> GraphCache {
        let mut cache = GraphCache::open_in_memory().unwrap();
        let columns: Vec<String> = ["node1", "label", "node2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows: Vec<Vec<String>> = (0..10)
            .map(|i| {
                vec![
                    format!("n{i}"),
                    "P31".to_string(),
                    format!("Q{}", i % 3),
                ]
            })
            .collect();
        cache.import("edges", &columns, &rows).unwrap();
        cache
    }

    #[test]
    fn test_table_exists_and_columns() {
        let cache = sample_cache();
        assert!(cache.table_exists("edges").unwrap());
        assert!(!cache.table_exists("missing").unwrap());
        assert_eq!(
            cache.column_names("edges").unwrap(),
            vec!["node1", "label", "node2"]
        );
    }

    #[test]
    fn test_fetch_all_preserves_import_order() {
        let cache = sample_cache();
        let columns = cache.column_names("edges").unwrap();
        let rows = cache.fetch_all("edges", &columns).unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0][0], "n0");
        assert_eq!(rows[9][0], "n9");
    }

    #[test]
    fn test_filter_pushdown() {
        let cache = sample_cache();
        let columns = cache.column_names("edges").unwrap();
        let mut filters = IndexMap::new();
        filters.insert("node2".to_string(), vec!["Q0".to_string()]);
        let rows = cache.fetch_filtered("edges", &columns, &filters).unwrap();
        assert_eq!(rows.len(), 4); // n0, n3, n6, n9
        assert!(rows.iter().all(|row| row[2] == "Q0"));
    }

    #[test]
    fn test_filter_batching_covers_all_values() {
        let mut cache = GraphCache::open_in_memory().unwrap();
        let columns: Vec<String> = ["node1", "node2"].iter().map(|s| s.to_string()).collect();
        let rows: Vec<Vec<String>> = (0..1000)
            .map(|i| vec![format!("n{i}"), format!("v{}", i % 2)])
            .collect();
        cache.import("big", &columns, &rows).unwrap();

        // More filter values than one batch can hold.
        let mut filters = IndexMap::new();
        filters.insert(
            "node1".to_string(),
            (0..700).map(|i| format!("n{i}")).collect(),
        );
        filters.insert("node2".to_string(), vec!["v0".to_string()]);
        let fetched = cache.fetch_filtered("big", &columns, &filters).unwrap();
        assert_eq!(fetched.len(), 350);
    }

    #[test]
    fn test_filter_batching_preserves_import_order() {
        let mut cache = GraphCache::open_in_memory().unwrap();
        let columns: Vec<String> = ["node1", "node2"].iter().map(|s| s.to_string()).collect();
        let rows: Vec<Vec<String>> = (0..400)
            .map(|i| vec![format!("n{i:04}"), "v".to_string()])
            .collect();
        cache.import("big", &columns, &rows).unwrap();

        // Two batches; the merged result must still follow import order.
        let mut filters = IndexMap::new();
        filters.insert(
            "node1".to_string(),
            (0..400).map(|i| format!("n{i:04}")).collect(),
        );
        let fetched = cache.fetch_filtered("big", &columns, &filters).unwrap();
        let expected: Vec<String> = (0..400).map(|i| format!("n{i:04}")).collect();
        let names: Vec<String> = fetched.into_iter().map(|mut row| row.remove(0)).collect();
        assert_eq!(names, expected);
    }
}
