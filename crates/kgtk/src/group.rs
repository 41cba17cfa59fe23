//! In-memory sort/group buffer.
//!
//! Rows are keyed by one or more of the core edge columns and replayed in
//! sorted key order. The whole input is materialized in memory, so this is
//! a bounded-scale utility rather than an external sort; callers with
//! inputs larger than memory should pre-sort upstream instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::io::columns::KgtkColumns;

/// Which columns contribute to the grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyBy {
    Node1,
    Label,
    Node2,
    Id,
    Node1LabelNode2,
    Node1LabelNode2Id,
}

impl KeyBy {
    fn indices(self, columns: &KgtkColumns) -> Vec<Option<usize>> {
        match self {
            KeyBy::Node1 => vec![columns.node1_idx],
            KeyBy::Label => vec![columns.label_idx],
            KeyBy::Node2 => vec![columns.node2_idx],
            KeyBy::Id => vec![columns.id_idx],
            KeyBy::Node1LabelNode2 => {
                vec![columns.node1_idx, columns.label_idx, columns.node2_idx]
            }
            KeyBy::Node1LabelNode2Id => vec![
                columns.node1_idx,
                columns.label_idx,
                columns.node2_idx,
                columns.id_idx,
            ],
        }
    }
}

/// Buffers rows and replays them in sorted key order.
///
/// In grouped mode rows sharing a key form one group, preserving arrival
/// order within the group. In list mode every row gets a unique key
/// (the group key plus a zero-padded sequence number) so iteration is a
/// stable total order.
pub struct GroupBuffer {
    key_indices: Vec<Option<usize>>,
    grouped: bool,
    rows: BTreeMap<String, Vec<Vec<String>>>,
    sequence: usize,
}

impl GroupBuffer {
    pub fn new(key_by: KeyBy, columns: &KgtkColumns, grouped: bool) -> GroupBuffer {
        GroupBuffer {
            key_indices: key_by.indices(columns),
            grouped,
            rows: BTreeMap::new(),
            sequence: 0,
        }
    }

    fn key_for(&self, row: &[String]) -> String {
        let parts: Vec<&str> = self
            .key_indices
            .iter()
            .map(|idx| {
                idx.and_then(|i| row.get(i))
                    .map(|cell| cell.as_str())
                    .unwrap_or("")
            })
            .collect();
        parts.join("\t")
    }

    /// Buffer one row.
    pub fn add(&mut self, row: Vec<String>) {
        let mut key = self.key_for(&row);
        if !self.grouped {
            // Zero-padded suffix keeps lexicographic order equal to
            // arrival order within a key.
            key.push_str(&format!("\t{:010}", self.sequence));
        }
        self.sequence += 1;
        self.rows.entry(key).or_default().push(row);
    }

    pub fn len(&self) -> usize {
        self.sequence
    }

    pub fn is_empty(&self) -> bool {
        self.sequence == 0
    }

    /// Yield groups in ascending key order, each with its member rows in
    /// arrival order.
    pub fn group_iterate(&self) -> impl Iterator<Item = (&str, &[Vec<String>])> {
        self.rows
            .iter()
            .map(|(key, rows)| (key.as_str(), rows.as_slice()))
    }

    /// Yield individual rows in ascending key order.
    pub fn iterate(&self) -> impl Iterator<Item = &Vec<String>> {
        self.rows.values().flatten()
    }

    /// Drain all buffered groups in ascending key order.
    pub fn into_groups(self) -> impl Iterator<Item = (String, Vec<Vec<String>>)> {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::options::{KgtkFileMode, ValidationAction};

    fn edge_columns() -> KgtkColumns {
        KgtkColumns::build(
            vec![
                "node1".to_string(),
                "label".to_string(),
                "node2".to_string(),
            ],
            KgtkFileMode::Auto,
            ValidationAction::Report,
        )
        .unwrap()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_grouped_sorted_keys_arrival_order_within() {
        let columns = edge_columns();
        let mut buffer = GroupBuffer::new(KeyBy::Node1, &columns, true);
        buffer.add(row(&["b", "P31", "Q5"]));
        buffer.add(row(&["a", "P31", "Q5"]));
        buffer.add(row(&["b", "P279", "Q2"]));

        let groups: Vec<_> = buffer.group_iterate().collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "a");
        assert_eq!(groups[1].0, "b");
        assert_eq!(groups[1].1.len(), 2);
        assert_eq!(groups[1].1[0][1], "P31");
        assert_eq!(groups[1].1[1][1], "P279");
    }

    #[test]
    fn test_list_mode_total_order() {
        let columns = edge_columns();
        let mut buffer = GroupBuffer::new(KeyBy::Node1, &columns, false);
        buffer.add(row(&["b", "P31", "Q5"]));
        buffer.add(row(&["a", "P31", "Q5"]));
        buffer.add(row(&["a", "P279", "Q2"]));

        let rows: Vec<_> = buffer.iterate().collect();
        assert_eq!(rows.len(), 3);
        // Sorted by node1, then by arrival within equal keys.
        assert_eq!(rows[0][1], "P31");
        assert_eq!(rows[0][0], "a");
        assert_eq!(rows[1][1], "P279");
        assert_eq!(rows[2][0], "b");
    }

    #[test]
    fn test_compound_key() {
        let columns = edge_columns();
        let mut buffer = GroupBuffer::new(KeyBy::Node1LabelNode2, &columns, true);
        buffer.add(row(&["a", "P31", "Q5"]));
        buffer.add(row(&["a", "P31", "Q5"]));
        buffer.add(row(&["a", "P31", "Q6"]));
        assert_eq!(buffer.group_iterate().count(), 2);
        assert_eq!(buffer.len(), 3);
    }
}
