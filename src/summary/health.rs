//! Point-deduction health score

use serde::{Deserialize, Serialize};

use crate::diff::{SchemaDiff, Side, TableDiff};

const MISSING_TABLE_PENALTY: u32 = 10;
const CRITICAL_COLUMN_PENALTY: u32 = 8;
const MISSING_COLUMN_PENALTY: u32 = 5;
const COLUMN_DIFF_PENALTY: u32 = 3;

/// Severity band of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Healthy,
    Minor,
    Moderate,
    Critical,
}

impl Severity {
    pub fn from_score(score: u32) -> Self {
        if score >= 90 {
            Severity::Healthy
        } else if score >= 70 {
            Severity::Minor
        } else if score >= 40 {
            Severity::Moderate
        } else {
            Severity::Critical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Healthy => "healthy",
            Severity::Minor => "minor issues",
            Severity::Moderate => "moderate issues",
            Severity::Critical => "critical issues",
        }
    }
}

/// A categorical pass/fail check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub passed: bool,
}

impl HealthCheck {
    fn new(name: &str, passed: bool) -> Self {
        Self {
            name: name.to_string(),
            passed,
        }
    }
}

/// Counts, score and checks derived from a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub missing_tables: usize,
    pub missing_columns: usize,
    pub critical_column_diffs: usize,
    pub non_critical_column_diffs: usize,
    pub score: u32,
    pub severity: Severity,
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    /// Score the pair of databases as a whole
    pub fn from_diff(diff: &SchemaDiff) -> Self {
        let missing_tables = diff.tables_only_in_source.len() + diff.tables_only_in_target.len();
        let missing_columns = diff
            .tables_in_both
            .iter()
            .map(|t| t.columns_only_in_source.len() + t.columns_only_in_target.len())
            .sum();
        Self::build(diff, missing_tables, missing_columns, None)
    }

    /// Score one database: only what `side` lacks counts as missing
    pub fn for_side(diff: &SchemaDiff, side: Side) -> Self {
        let missing_tables = diff.tables_missing_from(side).len();
        let missing_columns = diff
            .tables_in_both
            .iter()
            .map(|t| t.columns_only_in(side.other()).len())
            .sum();
        Self::build(diff, missing_tables, missing_columns, Some(side))
    }

    fn build(
        diff: &SchemaDiff,
        missing_tables: usize,
        missing_columns: usize,
        side: Option<Side>,
    ) -> Self {
        let critical_column_diffs: usize = diff
            .tables_in_both
            .iter()
            .map(|t| t.critical_column_count())
            .sum();
        let total_column_diffs: usize = diff
            .tables_in_both
            .iter()
            .map(|t| t.columns_with_differences.len())
            .sum();
        let non_critical_column_diffs = total_column_diffs - critical_column_diffs;

        let penalty = MISSING_TABLE_PENALTY * missing_tables as u32
            + CRITICAL_COLUMN_PENALTY * critical_column_diffs as u32
            + MISSING_COLUMN_PENALTY * missing_columns as u32
            + COLUMN_DIFF_PENALTY * non_critical_column_diffs as u32;
        let score = 100u32.saturating_sub(penalty);

        let aligned = |pick: fn(&TableDiff, Side) -> usize| {
            diff.tables_in_both.iter().all(|t| match side {
                Some(side) => pick(t, side.other()) == 0,
                None => pick(t, Side::Source) + pick(t, Side::Target) == 0,
            })
        };
        let checks = vec![
            HealthCheck::new("tables aligned", missing_tables == 0),
            HealthCheck::new("columns aligned", missing_columns == 0 && total_column_diffs == 0),
            HealthCheck::new("no critical differences", critical_column_diffs == 0),
            HealthCheck::new("indexes aligned", aligned(|t, s| t.indexes_only_in(s).len())),
            HealthCheck::new("constraints aligned", aligned(|t, s| t.constraints_only_in(s).len())),
            HealthCheck::new("foreign keys aligned", aligned(|t, s| t.foreign_keys_only_in(s).len())),
        ];

        Self {
            missing_tables,
            missing_columns,
            critical_column_diffs,
            non_critical_column_diffs,
            score,
            severity: Severity::from_score(score),
            checks,
        }
    }

    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ColumnDiff, TableRef};
    use crate::snapshot::{Column, Index};

    fn column_diff(critical: bool) -> ColumnDiff {
        ColumnDiff {
            name: "c".to_string(),
            source: Column::new("c", "integer"),
            target: Column::new("c", "integer"),
            changes: Vec::new(),
            critical,
        }
    }

    #[test]
    fn test_empty_diff_is_healthy() {
        let report = HealthReport::from_diff(&SchemaDiff::default());
        assert_eq!(report.score, 100);
        assert_eq!(report.severity, Severity::Healthy);
        assert!(report.passed());
    }

    #[test]
    fn test_penalties() {
        let mut table = TableDiff::new("public", "orders");
        table.columns_only_in_source.push(Column::new("note", "text"));
        table.columns_with_differences = vec![column_diff(true), column_diff(false)];
        let diff = SchemaDiff {
            tables_only_in_source: vec![TableRef::new("public", "users")],
            tables_only_in_target: vec![TableRef::new("public", "audit_log")],
            tables_in_both: vec![table],
        };

        let report = HealthReport::from_diff(&diff);
        // 100 - (2*10 + 8 + 5 + 3)
        assert_eq!(report.score, 64);
        assert_eq!(report.severity, Severity::Moderate);
        assert!(!report.passed());
    }

    #[test]
    fn test_score_floors_at_zero() {
        let diff = SchemaDiff {
            tables_only_in_source: (0..11).map(|i| TableRef::new("public", format!("t{}", i))).collect(),
            ..Default::default()
        };
        let report = HealthReport::from_diff(&diff);
        assert_eq!(report.score, 0);
        assert_eq!(report.severity, Severity::Critical);
    }

    #[test]
    fn test_bands() {
        assert_eq!(Severity::from_score(90), Severity::Healthy);
        assert_eq!(Severity::from_score(89), Severity::Minor);
        assert_eq!(Severity::from_score(70), Severity::Minor);
        assert_eq!(Severity::from_score(69), Severity::Moderate);
        assert_eq!(Severity::from_score(40), Severity::Moderate);
        assert_eq!(Severity::from_score(39), Severity::Critical);
    }

    #[test]
    fn test_for_side_counts_only_what_side_lacks() {
        let mut table = TableDiff::new("public", "orders");
        table.columns_only_in_source.push(Column::new("note", "text"));
        table.indexes_only_in_source.push(Index::new("orders_note_idx", &["note"]));
        let diff = SchemaDiff {
            tables_only_in_source: vec![TableRef::new("public", "users")],
            tables_only_in_target: Vec::new(),
            tables_in_both: vec![table],
        };

        let source = HealthReport::for_side(&diff, Side::Source);
        assert_eq!(source.score, 100);
        assert!(source.passed());

        let target = HealthReport::for_side(&diff, Side::Target);
        assert_eq!(target.missing_tables, 1);
        assert_eq!(target.missing_columns, 1);
        assert_eq!(target.score, 85);
        let indexes = target.checks.iter().find(|c| c.name == "indexes aligned").unwrap();
        assert!(!indexes.passed);
    }
}
