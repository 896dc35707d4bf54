//! Difference model produced by the comparator
//!
//! A [`SchemaDiff`] is built once per comparison run and never mutated in
//! place; filtering produces a new value (see [`crate::summary::apply_filters`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::snapshot::{Column, Constraint, ForeignKey, Index, Snapshot};

/// Which snapshot of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Source => Side::Target,
            Side::Target => Side::Source,
        }
    }
}

/// Reference to a table by schema and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn key(&self) -> String {
        Snapshot::key(&self.schema, &self.table)
    }
}

/// Result of comparing two snapshots
///
/// `tables_in_both` only lists tables with at least one difference; tables
/// identical on both sides are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub tables_only_in_source: Vec<TableRef>,
    pub tables_only_in_target: Vec<TableRef>,
    pub tables_in_both: Vec<TableDiff>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.tables_only_in_source.is_empty()
            && self.tables_only_in_target.is_empty()
            && self.tables_in_both.is_empty()
    }

    /// Tables absent from `side` (present only on the other one)
    pub fn tables_missing_from(&self, side: Side) -> &[TableRef] {
        match side {
            Side::Source => &self.tables_only_in_target,
            Side::Target => &self.tables_only_in_source,
        }
    }

    /// Tables present only on `side`
    pub fn tables_only_in(&self, side: Side) -> &[TableRef] {
        self.tables_missing_from(side.other())
    }

    /// Per-table differences keyed by `"schema.table"`
    pub fn tables_by_key(&self) -> HashMap<String, &TableDiff> {
        self.tables_in_both.iter().map(|t| (t.key(), t)).collect()
    }
}

/// Differences of one table present in both snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDiff {
    pub schema: String,
    pub table: String,
    pub columns_only_in_source: Vec<Column>,
    pub columns_only_in_target: Vec<Column>,
    pub columns_with_differences: Vec<ColumnDiff>,
    pub indexes_only_in_source: Vec<Index>,
    pub indexes_only_in_target: Vec<Index>,
    pub foreign_keys_only_in_source: Vec<ForeignKey>,
    pub foreign_keys_only_in_target: Vec<ForeignKey>,
    pub constraints_only_in_source: Vec<Constraint>,
    pub constraints_only_in_target: Vec<Constraint>,
}

impl TableDiff {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn key(&self) -> String {
        Snapshot::key(&self.schema, &self.table)
    }

    pub fn has_differences(&self) -> bool {
        self.difference_count() > 0
    }

    /// Total number of entries across all difference categories
    pub fn difference_count(&self) -> usize {
        self.columns_only_in_source.len()
            + self.columns_only_in_target.len()
            + self.columns_with_differences.len()
            + self.indexes_only_in_source.len()
            + self.indexes_only_in_target.len()
            + self.foreign_keys_only_in_source.len()
            + self.foreign_keys_only_in_target.len()
            + self.constraints_only_in_source.len()
            + self.constraints_only_in_target.len()
    }

    pub fn columns_only_in(&self, side: Side) -> &[Column] {
        match side {
            Side::Source => &self.columns_only_in_source,
            Side::Target => &self.columns_only_in_target,
        }
    }

    pub fn indexes_only_in(&self, side: Side) -> &[Index] {
        match side {
            Side::Source => &self.indexes_only_in_source,
            Side::Target => &self.indexes_only_in_target,
        }
    }

    pub fn foreign_keys_only_in(&self, side: Side) -> &[ForeignKey] {
        match side {
            Side::Source => &self.foreign_keys_only_in_source,
            Side::Target => &self.foreign_keys_only_in_target,
        }
    }

    pub fn constraints_only_in(&self, side: Side) -> &[Constraint] {
        match side {
            Side::Source => &self.constraints_only_in_source,
            Side::Target => &self.constraints_only_in_target,
        }
    }

    pub fn critical_column_count(&self) -> usize {
        self.columns_with_differences.iter().filter(|c| c.critical).count()
    }
}

/// A column present on both sides with differing attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDiff {
    pub name: String,
    pub source: Column,
    pub target: Column,
    pub changes: Vec<ColumnChange>,
    pub critical: bool,
}

/// One changed column attribute, source value first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "attribute", rename_all = "snake_case")]
pub enum ColumnChange {
    DataType { source: String, target: String },
    Nullability { source: bool, target: bool },
    Default { source: Option<String>, target: Option<String> },
    MaxLength { source: Option<i32>, target: Option<i32> },
    Precision { source: Option<i32>, target: Option<i32> },
    Scale { source: Option<i32>, target: Option<i32> },
}

impl ColumnChange {
    /// Short human-readable description used in review comments
    pub fn describe(&self) -> String {
        fn opt<T: std::fmt::Display>(value: &Option<T>) -> String {
            value.as_ref().map_or_else(|| "none".to_string(), |v| v.to_string())
        }
        fn nullability(nullable: bool) -> &'static str {
            if nullable {
                "NULL"
            } else {
                "NOT NULL"
            }
        }

        match self {
            ColumnChange::DataType { source, target } => format!("type {} vs {}", source, target),
            ColumnChange::Nullability { source, target } => {
                format!("{} vs {}", nullability(*source), nullability(*target))
            }
            ColumnChange::Default { source, target } => {
                format!("default {} vs {}", opt(source), opt(target))
            }
            ColumnChange::MaxLength { source, target } => {
                format!("length {} vs {}", opt(source), opt(target))
            }
            ColumnChange::Precision { source, target } => {
                format!("precision {} vs {}", opt(source), opt(target))
            }
            ColumnChange::Scale { source, target } => {
                format!("scale {} vs {}", opt(source), opt(target))
            }
        }
    }
}
