//! Tests for the structural comparator

use pgcompare::compare::compare;
use pgcompare::diff::{ColumnChange, SchemaDiff, Side, TableDiff};
use pgcompare::snapshot::{Column, Constraint, ForeignKey, Index, Snapshot, TableInfo};

fn table_diff<'a>(diff: &'a SchemaDiff, schema: &str, table: &str) -> Option<&'a TableDiff> {
    diff.tables_by_key().get(&Snapshot::key(schema, table)).copied()
}

fn orders(total_nullable: bool) -> TableInfo {
    let total = Column::new("total", "numeric").numeric(10, 2);
    let total = if total_nullable { total } else { total.not_null() };
    TableInfo::new("public", "orders")
        .with_column(Column::new("id", "integer").not_null())
        .with_column(total)
        .with_index(Index::new("orders_pkey", &["id"]).primary())
}

fn sample_source() -> Snapshot {
    Snapshot::empty()
        .with_table(
            TableInfo::new("public", "users")
                .with_column(Column::new("id", "integer").not_null())
                .with_column(Column::new("email", "character varying").max_length(255))
                .with_index(Index::new("users_pkey", &["id"]).primary()),
        )
        .with_table(orders(false))
        .with_table(
            TableInfo::new("public", "line_items")
                .with_column(Column::new("id", "integer").not_null())
                .with_column(Column::new("order_id", "integer"))
                .with_foreign_key(ForeignKey::new("line_items_order_id_fkey", "order_id", "public", "orders", "id")),
        )
}

fn sample_target() -> Snapshot {
    Snapshot::empty()
        .with_table(
            TableInfo::new("public", "users")
                .with_column(Column::new("id", "bigint").not_null())
                .with_column(Column::new("email", "character varying").max_length(100))
                .with_column(Column::new("created_at", "timestamp with time zone"))
                .with_index(Index::new("users_pkey", &["id"]).primary()),
        )
        .with_table(orders(true))
        .with_table(TableInfo::new("public", "audit_log").with_column(Column::new("id", "bigint")))
}

#[test]
fn test_self_comparison_is_empty() {
    let snapshot = sample_source();
    let diff = compare(&snapshot, &snapshot);
    assert!(diff.is_empty());
}

#[test]
fn test_direction_symmetry() {
    let source = sample_source();
    let target = sample_target();
    let forward = compare(&source, &target);
    let backward = compare(&target, &source);

    assert_eq!(forward.tables_only_in_source, backward.tables_only_in_target);
    assert_eq!(forward.tables_only_in_target, backward.tables_only_in_source);
    assert_eq!(forward.tables_in_both.len(), backward.tables_in_both.len());

    for table in &forward.tables_in_both {
        let by_key = backward.tables_by_key();
        let mirrored = by_key[table.key().as_str()];
        assert_eq!(table.columns_only_in(Side::Source), mirrored.columns_only_in(Side::Target));
        assert_eq!(table.columns_only_in(Side::Target), mirrored.columns_only_in(Side::Source));
        assert_eq!(table.columns_with_differences.len(), mirrored.columns_with_differences.len());
    }
}

#[test]
fn test_tables_only_on_one_side() {
    let diff = compare(&sample_source(), &sample_target());
    let only_source: Vec<String> = diff.tables_only_in_source.iter().map(|t| t.key()).collect();
    let only_target: Vec<String> = diff.tables_only_in_target.iter().map(|t| t.key()).collect();
    assert_eq!(only_source, vec!["public.line_items"]);
    assert_eq!(only_target, vec!["public.audit_log"]);
}

#[test]
fn test_identical_common_tables_are_omitted() {
    let source = sample_source();
    let mut target = sample_target();
    target.insert_table(orders(false));

    let diff = compare(&source, &target);
    assert!(table_diff(&diff, "public", "orders").is_none());
    assert!(table_diff(&diff, "public", "users").is_some());
}

#[test]
fn test_column_differences_and_criticality() {
    let diff = compare(&sample_source(), &sample_target());
    let users = table_diff(&diff, "public", "users").unwrap();

    assert_eq!(users.columns_only_in_target.len(), 1);
    assert_eq!(users.columns_only_in_target[0].name, "created_at");

    let id = users.columns_with_differences.iter().find(|c| c.name == "id").unwrap();
    assert!(id.critical);
    assert!(id.changes.contains(&ColumnChange::DataType {
        source: "integer".to_string(),
        target: "bigint".to_string(),
    }));

    // 255 -> 100 shrinks
    let email = users.columns_with_differences.iter().find(|c| c.name == "email").unwrap();
    assert!(email.critical);
}

#[test]
fn test_not_null_to_nullable_is_not_critical() {
    let diff = compare(&sample_source(), &sample_target());
    let orders = table_diff(&diff, "public", "orders").unwrap();
    assert_eq!(orders.columns_with_differences.len(), 1);

    let total = &orders.columns_with_differences[0];
    assert_eq!(total.name, "total");
    assert_eq!(
        total.changes,
        vec![ColumnChange::Nullability {
            source: false,
            target: true
        }]
    );
    assert!(!total.critical);

    // The reverse direction tightens the column
    let reverse = compare(&sample_target(), &sample_source());
    assert!(table_diff(&reverse, "public", "orders").unwrap().columns_with_differences[0].critical);
}

#[test]
fn test_default_and_precision_changes_are_not_critical() {
    let source = Snapshot::empty().with_table(
        TableInfo::new("public", "prices")
            .with_column(Column::new("amount", "numeric").numeric(10, 2).default_expr("0")),
    );
    let target = Snapshot::empty().with_table(
        TableInfo::new("public", "prices").with_column(Column::new("amount", "numeric").numeric(12, 4)),
    );
    let diff = compare(&source, &target);
    let amount = &table_diff(&diff, "public", "prices").unwrap().columns_with_differences[0];
    assert_eq!(amount.changes.len(), 3);
    assert!(!amount.critical);
}

#[test]
fn test_check_constraints_match_by_clause_not_name() {
    let source = Snapshot::empty().with_table(
        TableInfo::new("public", "items").with_constraint(Constraint::check("items_qty_check", "(qty > 0)")),
    );
    let target = Snapshot::empty().with_table(
        TableInfo::new("public", "items").with_constraint(Constraint::check("ck_a8f3", "CHECK ((qty > 0))")),
    );
    assert!(compare(&source, &target).is_empty());

    let changed = Snapshot::empty().with_table(
        TableInfo::new("public", "items").with_constraint(Constraint::check("items_qty_check", "(qty >= 0)")),
    );
    let diff = compare(&source, &changed);
    let items = table_diff(&diff, "public", "items").unwrap();
    assert_eq!(items.constraints_only_in_source.len(), 1);
    assert_eq!(items.constraints_only_in_target.len(), 1);
}

#[test]
fn test_unique_constraint_matches_unique_index() {
    let source = Snapshot::empty().with_table(
        TableInfo::new("public", "accounts")
            .with_column(Column::new("email", "text"))
            .with_constraint(Constraint::unique("uq_accounts_email", &["email"])),
    );
    let target = Snapshot::empty().with_table(
        TableInfo::new("public", "accounts")
            .with_column(Column::new("email", "text"))
            .with_index(Index::new("accounts_email_key", &["email"]).unique()),
    );
    assert!(compare(&source, &target).is_empty());
    assert!(compare(&target, &source).is_empty());
}

#[test]
fn test_foreign_keys_match_by_name() {
    let table = |fk_name: &str| {
        TableInfo::new("public", "line_items")
            .with_column(Column::new("order_id", "integer"))
            .with_foreign_key(ForeignKey::new(fk_name, "order_id", "public", "orders", "id"))
    };
    let source = Snapshot::empty().with_table(table("line_items_order_id_fkey"));
    let target = Snapshot::empty().with_table(table("fk_line_items_orders"));

    let diff = compare(&source, &target);
    let line_items = table_diff(&diff, "public", "line_items").unwrap();
    assert_eq!(line_items.foreign_keys_only_in_source[0].name, "line_items_order_id_fkey");
    assert_eq!(line_items.foreign_keys_only_in_target[0].name, "fk_line_items_orders");
}
