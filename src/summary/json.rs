//! Machine-readable difference summary

use std::collections::BTreeSet;

use serde::Serialize;

use crate::diff::{SchemaDiff, TableDiff};
use crate::snapshot::Snapshot;

/// Added/removed/modified names of one object kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeList {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modified: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub tables_added: usize,
    pub tables_removed: usize,
    pub tables_modified: usize,
    pub columns_added: usize,
    pub columns_removed: usize,
    pub columns_modified: usize,
    pub indexes_added: usize,
    pub indexes_removed: usize,
    pub foreign_keys_added: usize,
    pub foreign_keys_removed: usize,
    pub constraints_added: usize,
    pub constraints_removed: usize,
    pub functions_added: usize,
    pub functions_removed: usize,
}

/// Summary of moving a database from `source` to `target`
///
/// "Added" means present only in the target, "removed" only in the source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub tables: ChangeList,
    pub functions: ChangeList,
    pub counts: SummaryCounts,
    /// Removed tables, columns or foreign keys, or modified columns
    pub breaking: bool,
}

impl DiffSummary {
    pub fn build(diff: &SchemaDiff, source: &Snapshot, target: &Snapshot) -> Self {
        let tables = ChangeList {
            added: diff.tables_only_in_target.iter().map(|t| t.key()).collect(),
            removed: diff.tables_only_in_source.iter().map(|t| t.key()).collect(),
            modified: diff.tables_in_both.iter().map(|t| t.key()).collect(),
        };

        let source_functions: BTreeSet<String> = source.functions.iter().map(|f| f.signature()).collect();
        let target_functions: BTreeSet<String> = target.functions.iter().map(|f| f.signature()).collect();
        let functions = ChangeList {
            added: target_functions.difference(&source_functions).cloned().collect(),
            removed: source_functions.difference(&target_functions).cloned().collect(),
            modified: Vec::new(),
        };

        let sum = |count: fn(&TableDiff) -> usize| -> usize {
            diff.tables_in_both.iter().map(count).sum()
        };
        let counts = SummaryCounts {
            tables_added: tables.added.len(),
            tables_removed: tables.removed.len(),
            tables_modified: tables.modified.len(),
            columns_added: sum(|t| t.columns_only_in_target.len()),
            columns_removed: sum(|t| t.columns_only_in_source.len()),
            columns_modified: sum(|t| t.columns_with_differences.len()),
            indexes_added: sum(|t| t.indexes_only_in_target.len()),
            indexes_removed: sum(|t| t.indexes_only_in_source.len()),
            foreign_keys_added: sum(|t| t.foreign_keys_only_in_target.len()),
            foreign_keys_removed: sum(|t| t.foreign_keys_only_in_source.len()),
            constraints_added: sum(|t| t.constraints_only_in_target.len()),
            constraints_removed: sum(|t| t.constraints_only_in_source.len()),
            functions_added: functions.added.len(),
            functions_removed: functions.removed.len(),
        };

        let breaking = counts.tables_removed > 0
            || counts.columns_removed > 0
            || counts.columns_modified > 0
            || counts.foreign_keys_removed > 0;

        Self {
            tables,
            functions,
            counts,
            breaking,
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
