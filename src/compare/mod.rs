//! Structural comparator
//!
//! [`compare`] walks two snapshots with keyed lookups and records every
//! difference in a [`SchemaDiff`]:
//! - tables present on only one side, by reference
//! - per common table: columns, indexes, foreign keys and constraints
//!
//! Tables with no differences are left out of `tables_in_both`.

mod columns;
mod constraints;
mod indexes;
mod normalize;

pub use columns::compare_column;
pub use normalize::normalize_check_clause;

use crate::diff::{SchemaDiff, TableDiff, TableRef};
use crate::snapshot::{Snapshot, TableInfo};

/// Compare `source` against `target`
pub fn compare(source: &Snapshot, target: &Snapshot) -> SchemaDiff {
    let mut diff = SchemaDiff::default();

    for key in source.sorted_keys() {
        let source_table = &source.tables[key];
        match target.table(key) {
            None => diff.tables_only_in_source.push(source_table.table_ref()),
            Some(target_table) => {
                let table_diff = compare_tables(source_table, target_table);
                if table_diff.has_differences() {
                    log::trace!("{}: {} difference(s)", key, table_diff.difference_count());
                    diff.tables_in_both.push(table_diff);
                }
            }
        }
    }

    diff.tables_only_in_target = target
        .sorted_keys()
        .into_iter()
        .filter(|key| source.table(key).is_none())
        .map(|key| target.tables[key].table_ref())
        .collect::<Vec<TableRef>>();

    log::debug!(
        "Compared {} source and {} target table(s): {} only in source, {} only in target, {} changed",
        source.tables.len(),
        target.tables.len(),
        diff.tables_only_in_source.len(),
        diff.tables_only_in_target.len(),
        diff.tables_in_both.len()
    );

    diff
}

/// Compare two tables that share a key
pub fn compare_tables(source: &TableInfo, target: &TableInfo) -> TableDiff {
    let mut table_diff = TableDiff::new(source.schema.clone(), source.name.clone());
    columns::diff_columns(source, target, &mut table_diff);
    indexes::diff_indexes(source, target, &mut table_diff);
    constraints::diff_foreign_keys(source, target, &mut table_diff);
    constraints::diff_constraints(source, target, &mut table_diff);
    table_diff
}
