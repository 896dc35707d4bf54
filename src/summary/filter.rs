//! Diff narrowing

use serde::{Deserialize, Serialize};

use crate::diff::{SchemaDiff, TableDiff};

/// Which parts of a diff to keep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffFilters {
    /// Drop the per-table differences, keep the missing tables
    pub only_missing_tables: bool,
    /// Drop the missing tables, keep the per-table differences
    pub only_column_diffs: bool,
    /// Keep missing columns and critical column differences only
    pub critical_only: bool,
}

impl DiffFilters {
    pub fn is_noop(&self) -> bool {
        !self.only_missing_tables && !self.only_column_diffs && !self.critical_only
    }
}

/// Narrow `diff` to what `filters` select
///
/// Filters apply in a fixed order: missing-tables clear, column-diffs clear,
/// then critical-only narrowing. With `critical_only`, a table left without
/// missing columns or critical column differences is removed from
/// `tables_in_both`.
#[must_use]
pub fn apply_filters(diff: &SchemaDiff, filters: &DiffFilters) -> SchemaDiff {
    let mut filtered = diff.clone();

    if filters.only_missing_tables {
        filtered.tables_in_both.clear();
    }

    if filters.only_column_diffs {
        filtered.tables_only_in_source.clear();
        filtered.tables_only_in_target.clear();
    }

    if filters.critical_only {
        let before = filtered.tables_in_both.len();
        filtered.tables_in_both = filtered
            .tables_in_both
            .into_iter()
            .filter_map(critical_view)
            .collect();
        log::debug!(
            "critical-only filter kept {} of {} table(s)",
            filtered.tables_in_both.len(),
            before
        );
    }

    filtered
}

/// Drop non-critical column differences; `None` when no missing column or
/// critical difference is left. Index and constraint lists are kept as is.
fn critical_view(mut table: TableDiff) -> Option<TableDiff> {
    table.columns_with_differences.retain(|c| c.critical);
    let keep = !table.columns_only_in_source.is_empty()
        || !table.columns_only_in_target.is_empty()
        || !table.columns_with_differences.is_empty();
    keep.then_some(table)
}
