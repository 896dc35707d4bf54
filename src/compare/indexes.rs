//! Index comparison
//!
//! Indexes match by name, except that a unique non-primary index missing on
//! one side is ignored when that side has a UNIQUE constraint on the same
//! column set. The database materializes every UNIQUE constraint as a unique
//! index, so the two are the same object seen from different catalogs.

use std::collections::HashSet;

use crate::diff::TableDiff;
use crate::snapshot::{ConstraintKind, Index, TableInfo};

pub(crate) fn diff_indexes(source: &TableInfo, target: &TableInfo, table_diff: &mut TableDiff) {
    table_diff.indexes_only_in_source = missing_indexes(source, target);
    table_diff.indexes_only_in_target = missing_indexes(target, source);
}

/// Indexes of `from` that `to` has neither by name nor as a UNIQUE constraint
fn missing_indexes(from: &TableInfo, to: &TableInfo) -> Vec<Index> {
    let names: HashSet<&str> = to.indexes.iter().map(|i| i.name.as_str()).collect();
    let unique_constraint_sets: HashSet<Vec<String>> = to
        .constraints
        .iter()
        .filter(|c| c.kind == ConstraintKind::Unique)
        .map(|c| c.sorted_columns())
        .collect();

    from.indexes
        .iter()
        .filter(|index| !names.contains(index.name.as_str()))
        .filter(|index| {
            let backs_constraint = index.unique
                && !index.primary
                && unique_constraint_sets.contains(&index.sorted_columns());
            !backs_constraint
        })
        .cloned()
        .collect()
}
