//! Column schema: header parsing, alias resolution, file classification.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{KgtkError, Result};

use super::options::{KgtkFileMode, ValidationAction};

/// Recognized aliases for the node1 role.
pub const NODE1_ALIASES: &[&str] = &["node1", "from", "subject"];
/// Recognized aliases for the label role.
pub const LABEL_ALIASES: &[&str] = &["label", "predicate", "relation", "relationship"];
/// Recognized aliases for the node2 role.
pub const NODE2_ALIASES: &[&str] = &["node2", "to", "object"];
/// Recognized aliases for the id role.
pub const ID_ALIASES: &[&str] = &["id", "ID"];

/// The resolved file classification. Exactly one of these holds for an
/// open table for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileClass {
    Edge,
    Node,
    Neither,
}

/// An ordered column schema with resolved special-column indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KgtkColumns {
    /// Column names in header order.
    pub column_names: Vec<String>,
    /// Name to index map (insertion-ordered).
    pub column_name_map: IndexMap<String, usize>,
    pub node1_idx: Option<usize>,
    pub label_idx: Option<usize>,
    pub node2_idx: Option<usize>,
    pub id_idx: Option<usize>,
    /// The resolved classification.
    pub class: FileClass,
}

impl KgtkColumns {
    /// Build a schema from header names, resolving aliases and classifying
    /// the file per the requested mode.
    pub fn build(
        column_names: Vec<String>,
        mode: KgtkFileMode,
        unsafe_name_action: ValidationAction,
    ) -> Result<Self> {
        if column_names.is_empty() {
            return Err(KgtkError::Header("no columns in header".to_string()));
        }

        let mut column_name_map: IndexMap<String, usize> = IndexMap::new();
        for (idx, name) in column_names.iter().enumerate() {
            if column_name_map.insert(name.clone(), idx).is_some() {
                return Err(KgtkError::Header(format!(
                    "duplicate column name '{name}' at position {idx}"
                )));
            }
            if is_unsafe_column_name(name) {
                match unsafe_name_action {
                    ValidationAction::Pass | ValidationAction::Exclude => {}
                    ValidationAction::Report | ValidationAction::Complain => {
                        tracing::warn!(column = %name, "unsafe column name");
                    }
                    ValidationAction::Error => {
                        return Err(KgtkError::UnsafeColumnName(name.clone()));
                    }
                    ValidationAction::Exit => {
                        eprintln!("unsafe column name: '{name}'");
                        std::process::exit(1);
                    }
                }
            }
        }

        let node1_idx = resolve_alias(&column_name_map, NODE1_ALIASES)?;
        let label_idx = resolve_alias(&column_name_map, LABEL_ALIASES)?;
        let node2_idx = resolve_alias(&column_name_map, NODE2_ALIASES)?;
        let id_idx = resolve_alias(&column_name_map, ID_ALIASES)?;

        let class = match mode {
            KgtkFileMode::Edge => {
                if node1_idx.is_none() {
                    return Err(KgtkError::MissingColumn("node1".to_string()));
                }
                if label_idx.is_none() {
                    return Err(KgtkError::MissingColumn("label".to_string()));
                }
                if node2_idx.is_none() {
                    return Err(KgtkError::MissingColumn("node2".to_string()));
                }
                FileClass::Edge
            }
            KgtkFileMode::Node => {
                if node1_idx.is_some() {
                    return Err(KgtkError::Header(
                        "node file must not have a node1 column".to_string(),
                    ));
                }
                if id_idx.is_none() {
                    return Err(KgtkError::MissingColumn("id".to_string()));
                }
                FileClass::Node
            }
            KgtkFileMode::None => FileClass::Neither,
            KgtkFileMode::Auto => {
                if node1_idx.is_some() {
                    FileClass::Edge
                } else {
                    // No node1 role: treat as a node file, tolerating a
                    // missing id column.
                    FileClass::Node
                }
            }
        };

        Ok(Self {
            column_names,
            column_name_map,
            node1_idx,
            label_idx,
            node2_idx,
            id_idx,
            class,
        })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.column_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column_names.is_empty()
    }

    /// Index of a column by exact name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.column_name_map.get(name).copied()
    }

    /// Indices of required (never-blank) columns for this file class.
    pub fn required_indices(&self) -> Vec<usize> {
        match self.class {
            FileClass::Edge => [self.node1_idx, self.node2_idx]
                .into_iter()
                .flatten()
                .collect(),
            FileClass::Node => self.id_idx.into_iter().collect(),
            FileClass::Neither => Vec::new(),
        }
    }
}

/// Parse a header line into column names.
pub fn parse_header(line: &str, separator: char) -> Vec<String> {
    line.split(separator).map(|s| s.to_string()).collect()
}

/// Generate `column_1..column_N` names for a headerless file.
pub fn generated_column_names(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("column_{i}")).collect()
}

/// Resolve one role's aliases to a column index. More than one alias
/// present is a header error.
fn resolve_alias(map: &IndexMap<String, usize>, aliases: &[&str]) -> Result<Option<usize>> {
    let mut found: Option<(usize, &str)> = None;
    for alias in aliases {
        if let Some(&idx) = map.get(*alias) {
            if let Some((_, earlier)) = found {
                return Err(KgtkError::Header(format!(
                    "ambiguous columns: both '{earlier}' and '{alias}' present"
                )));
            }
            found = Some((idx, alias));
        }
    }
    Ok(found.map(|(idx, _)| idx))
}

/// A column name is unsafe when empty or carrying characters that break
/// downstream tooling (whitespace, quotes, separators, comment markers).
pub fn is_unsafe_column_name(name: &str) -> bool {
    name.is_empty()
        || name != name.trim()
        || name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '|' | ';' | '#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_generated_column_names() {
        assert_eq!(
            generated_column_names(3),
            vec!["column_1", "column_2", "column_3"]
        );
    }

    #[test]
    fn test_edge_classification() {
        let cols = KgtkColumns::build(
            names(&["node1", "label", "node2", "id"]),
            KgtkFileMode::Auto,
            ValidationAction::Report,
        )
        .unwrap();
        assert_eq!(cols.class, FileClass::Edge);
        assert_eq!(cols.node1_idx, Some(0));
        assert_eq!(cols.id_idx, Some(3));
    }

    #[test]
    fn test_alias_resolution() {
        let cols = KgtkColumns::build(
            names(&["from", "predicate", "to"]),
            KgtkFileMode::Edge,
            ValidationAction::Report,
        )
        .unwrap();
        assert_eq!(cols.class, FileClass::Edge);
        assert_eq!(cols.node1_idx, Some(0));
        assert_eq!(cols.label_idx, Some(1));
        assert_eq!(cols.node2_idx, Some(2));
    }

    #[test]
    fn test_ambiguous_alias_is_header_error() {
        let result = KgtkColumns::build(
            names(&["node1", "from", "label", "node2"]),
            KgtkFileMode::Auto,
            ValidationAction::Report,
        );
        assert!(matches!(result, Err(KgtkError::Header(_))));
    }

    #[test]
    fn test_node_classification() {
        let cols = KgtkColumns::build(
            names(&["id", "name"]),
            KgtkFileMode::Auto,
            ValidationAction::Report,
        )
        .unwrap();
        assert_eq!(cols.class, FileClass::Node);

        // Auto tolerates a missing id; forced node mode does not.
        let cols = KgtkColumns::build(
            names(&["name", "age"]),
            KgtkFileMode::Auto,
            ValidationAction::Report,
        )
        .unwrap();
        assert_eq!(cols.class, FileClass::Node);
        assert!(KgtkColumns::build(
            names(&["name", "age"]),
            KgtkFileMode::Node,
            ValidationAction::Report,
        )
        .is_err());
    }

    #[test]
    fn test_duplicate_column_is_header_error() {
        let result = KgtkColumns::build(
            names(&["node1", "label", "node1"]),
            KgtkFileMode::None,
            ValidationAction::Report,
        );
        assert!(matches!(result, Err(KgtkError::Header(_))));
    }

    #[test]
    fn test_missing_required_column() {
        let result = KgtkColumns::build(
            names(&["node1", "node2"]),
            KgtkFileMode::Edge,
            ValidationAction::Report,
        );
        assert!(matches!(result, Err(KgtkError::MissingColumn(_))));
    }

    #[test]
    fn test_unsafe_names() {
        assert!(is_unsafe_column_name(""));
        assert!(is_unsafe_column_name("bad name"));
        assert!(is_unsafe_column_name("bad|name"));
        assert!(!is_unsafe_column_name("node1_region"));
        assert!(!is_unsafe_column_name("P31_count"));

        let result = KgtkColumns::build(
            names(&["node1", "label", "node2", "bad name"]),
            KgtkFileMode::Auto,
            ValidationAction::Error,
        );
        assert!(matches!(result, Err(KgtkError::UnsafeColumnName(_))));
    }
}
