//! Constraint and foreign key comparison
//!
//! Migration frameworks generate volatile constraint names, so CHECK and
//! UNIQUE constraints are matched by what they enforce rather than by name.
//! Every other kind, and every foreign key, is matched by name.

use std::collections::HashSet;

use super::normalize::normalize_check_clause;
use crate::diff::TableDiff;
use crate::snapshot::{Constraint, ConstraintKind, ForeignKey, TableInfo};

pub(crate) fn diff_constraints(source: &TableInfo, target: &TableInfo, table_diff: &mut TableDiff) {
    table_diff.constraints_only_in_source = missing_constraints(source, target);
    table_diff.constraints_only_in_target = missing_constraints(target, source);
}

pub(crate) fn diff_foreign_keys(source: &TableInfo, target: &TableInfo, table_diff: &mut TableDiff) {
    table_diff.foreign_keys_only_in_source = missing_foreign_keys(source, target);
    table_diff.foreign_keys_only_in_target = missing_foreign_keys(target, source);
}

/// Constraints of `from` with no equivalent in `to`
fn missing_constraints(from: &TableInfo, to: &TableInfo) -> Vec<Constraint> {
    let checks: HashSet<String> = to
        .constraints
        .iter()
        .filter(|c| c.kind == ConstraintKind::Check)
        .map(check_key)
        .collect();
    let unique_sets: HashSet<Vec<String>> = to
        .constraints
        .iter()
        .filter(|c| c.kind == ConstraintKind::Unique)
        .map(Constraint::sorted_columns)
        .chain(to.indexes.iter().filter(|i| i.unique).map(|i| i.sorted_columns()))
        .collect();
    let names: HashSet<&str> = to.constraints.iter().map(|c| c.name.as_str()).collect();

    from.constraints
        .iter()
        .filter(|constraint| match &constraint.kind {
            ConstraintKind::Check => !checks.contains(&check_key(constraint)),
            ConstraintKind::Unique => !unique_sets.contains(&constraint.sorted_columns()),
            ConstraintKind::Other(_) => !names.contains(constraint.name.as_str()),
        })
        .cloned()
        .collect()
}

fn check_key(constraint: &Constraint) -> String {
    constraint
        .check_clause
        .as_deref()
        .map(normalize_check_clause)
        .unwrap_or_default()
}

/// Foreign key rows of `from` whose constraint name `to` lacks
fn missing_foreign_keys(from: &TableInfo, to: &TableInfo) -> Vec<ForeignKey> {
    let names: HashSet<&str> = to.foreign_keys.iter().map(|fk| fk.name.as_str()).collect();
    from.foreign_keys
        .iter()
        .filter(|fk| !names.contains(fk.name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Index;

    #[test]
    fn test_check_matches_despite_name_and_formatting() {
        let source = TableInfo::new("public", "items")
            .with_constraint(Constraint::check("items_qty_check", "((qty > 0))"));
        let target = TableInfo::new("public", "items")
            .with_constraint(Constraint::check("ck_1f2e3d", "QTY  >  0"));

        assert!(missing_constraints(&source, &target).is_empty());
        assert!(missing_constraints(&target, &source).is_empty());
    }

    #[test]
    fn test_check_literal_difference_is_reported() {
        let source = TableInfo::new("public", "items")
            .with_constraint(Constraint::check("items_qty_check", "(qty > 0)"));
        let target = TableInfo::new("public", "items")
            .with_constraint(Constraint::check("items_qty_check", "(qty > 1)"));

        assert_eq!(missing_constraints(&source, &target).len(), 1);
        assert_eq!(missing_constraints(&target, &source).len(), 1);
    }

    #[test]
    fn test_unique_matches_regardless_of_order() {
        let source = TableInfo::new("public", "items")
            .with_constraint(Constraint::unique("uq_a", &["a", "b"]));
        let target = TableInfo::new("public", "items")
            .with_constraint(Constraint::unique("uq_b", &["b", "a"]));

        assert!(missing_constraints(&source, &target).is_empty());
    }

    #[test]
    fn test_unique_satisfied_by_unique_index() {
        let source = TableInfo::new("public", "items")
            .with_constraint(Constraint::unique("uq_a", &["a", "b"]));
        let target = TableInfo::new("public", "items")
            .with_index(Index::new("items_b_a_idx", &["b", "a"]).unique());

        assert!(missing_constraints(&source, &target).is_empty());
    }

    #[test]
    fn test_other_kinds_compare_by_name() {
        let mut exclusion = Constraint::unique("items_no_overlap", &[]);
        exclusion.kind = ConstraintKind::Other("EXCLUDE".to_string());
        let source = TableInfo::new("public", "items").with_constraint(exclusion.clone());
        let mut renamed = exclusion;
        renamed.name = "items_no_overlap_v2".to_string();
        let target = TableInfo::new("public", "items").with_constraint(renamed);

        assert_eq!(missing_constraints(&source, &target).len(), 1);
    }

    #[test]
    fn test_foreign_keys_compare_by_name() {
        let fk = ForeignKey::new("orders_customer_fk", "customer_id", "public", "customers", "id");
        let source = TableInfo::new("public", "orders").with_foreign_key(fk.clone());
        let mut renamed = fk;
        renamed.name = "fk_orders_customer".to_string();
        let target = TableInfo::new("public", "orders").with_foreign_key(renamed);

        assert_eq!(missing_foreign_keys(&source, &target)[0].name, "orders_customer_fk");
        assert_eq!(missing_foreign_keys(&target, &source)[0].name, "fk_orders_customer");
    }
}
