//! Column comparison and criticality

use std::collections::HashMap;

use crate::diff::{ColumnChange, ColumnDiff, TableDiff};
use crate::snapshot::{Column, TableInfo};

/// Fill the column categories of `table_diff`
pub(crate) fn diff_columns(source: &TableInfo, target: &TableInfo, table_diff: &mut TableDiff) {
    let source_columns: HashMap<&str, &Column> =
        source.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let target_columns: HashMap<&str, &Column> =
        target.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    // Walk in ordinal order so output follows the table definition
    for column in &source.columns {
        match target_columns.get(column.name.as_str()) {
            None => table_diff.columns_only_in_source.push(column.clone()),
            Some(target_column) => {
                if let Some(diff) = compare_column(column, target_column) {
                    table_diff.columns_with_differences.push(diff);
                }
            }
        }
    }

    for column in &target.columns {
        if !source_columns.contains_key(column.name.as_str()) {
            table_diff.columns_only_in_target.push(column.clone());
        }
    }
}

/// Compare two same-named columns, `None` when all six attributes match
pub fn compare_column(source: &Column, target: &Column) -> Option<ColumnDiff> {
    let mut changes = Vec::new();

    if source.data_type != target.data_type {
        changes.push(ColumnChange::DataType {
            source: source.data_type.clone(),
            target: target.data_type.clone(),
        });
    }
    if source.nullable != target.nullable {
        changes.push(ColumnChange::Nullability {
            source: source.nullable,
            target: target.nullable,
        });
    }
    if source.default != target.default {
        changes.push(ColumnChange::Default {
            source: source.default.clone(),
            target: target.default.clone(),
        });
    }
    if source.max_length != target.max_length {
        changes.push(ColumnChange::MaxLength {
            source: source.max_length,
            target: target.max_length,
        });
    }
    if source.precision != target.precision {
        changes.push(ColumnChange::Precision {
            source: source.precision,
            target: target.precision,
        });
    }
    if source.scale != target.scale {
        changes.push(ColumnChange::Scale {
            source: source.scale,
            target: target.scale,
        });
    }

    if changes.is_empty() {
        return None;
    }

    let critical = changes.iter().any(is_critical);
    Some(ColumnDiff {
        name: source.name.clone(),
        source: source.clone(),
        target: target.clone(),
        changes,
        critical,
    })
}

/// Type changes, nullable -> NOT NULL and length shrinks are critical
fn is_critical(change: &ColumnChange) -> bool {
    match change {
        ColumnChange::DataType { .. } => true,
        ColumnChange::Nullability { source, target } => *source && !*target,
        ColumnChange::MaxLength {
            source: Some(source),
            target: Some(target),
        } => target < source,
        ColumnChange::MaxLength { .. }
        | ColumnChange::Default { .. }
        | ColumnChange::Precision { .. }
        | ColumnChange::Scale { .. } => false,
    }
}
