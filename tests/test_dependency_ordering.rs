//! Tests for foreign key dependency ordering and cycle detection

use pgcompare::dependency::{self, DependencyGraph};
use pgcompare::diff::TableRef;
use pgcompare::snapshot::{ForeignKey, Snapshot, TableInfo};

fn table(name: &str, references: &[&str]) -> TableInfo {
    references.iter().fold(TableInfo::new("public", name), |table, referenced| {
        table.with_foreign_key(ForeignKey::new(
            format!("{}_{}_fkey", name, referenced),
            format!("{}_id", referenced),
            "public",
            *referenced,
            "id",
        ))
    })
}

fn snapshot(tables: Vec<TableInfo>) -> Snapshot {
    tables.into_iter().fold(Snapshot::empty(), Snapshot::with_table)
}

fn position(sorted: &[String], key: &str) -> usize {
    sorted.iter().position(|k| k == key).unwrap()
}

#[test]
fn test_topological_sort_simple_chain() {
    let graph = DependencyGraph::from_edges([
        ("banks", vec![]),
        ("bank_accounts", vec!["banks"]),
        ("bank_transactions", vec!["bank_accounts"]),
    ]);

    let result = dependency::topological_sort(&graph);
    assert!(!result.has_cycles);
    assert_eq!(result.sorted, vec!["banks", "bank_accounts", "bank_transactions"]);
}

#[test]
fn test_topological_sort_multiple_dependencies() {
    let graph = DependencyGraph::from_edges([
        ("banks", vec![]),
        ("bank_accounts", vec!["banks"]),
        ("bank_statements", vec!["bank_accounts"]),
        ("bank_reconciliations", vec!["bank_accounts", "bank_statements"]),
    ]);

    let result = dependency::topological_sort(&graph);
    let sorted = &result.sorted;
    assert_eq!(sorted.len(), 4);
    assert_eq!(sorted[0], "banks");
    assert!(position(sorted, "bank_accounts") < position(sorted, "bank_statements"));
    assert!(position(sorted, "bank_statements") < position(sorted, "bank_reconciliations"));
}

#[test]
fn test_every_edge_is_respected() {
    let tables = vec![
        table("invoices", &["customers", "currencies"]),
        table("customers", &["countries"]),
        table("payments", &["invoices", "currencies"]),
        table("countries", &[]),
        table("currencies", &["countries"]),
    ];
    let refs: Vec<TableRef> = tables.iter().map(TableInfo::table_ref).collect();
    let snapshot = snapshot(tables);

    let graph = DependencyGraph::build(&refs, &snapshot);
    let result = dependency::topological_sort(&graph);
    assert!(!result.has_cycles);
    assert_eq!(result.sorted.len(), 5);

    for node in graph.nodes() {
        for dependency in graph.dependencies(node).unwrap() {
            assert!(
                position(&result.sorted, dependency) < position(&result.sorted, node),
                "{} must come before {}",
                dependency,
                node
            );
        }
    }
}

#[test]
fn test_sort_is_deterministic() {
    let graph = DependencyGraph::from_edges([
        ("zebra", vec![]),
        ("apple", vec![]),
        ("mango", vec!["zebra"]),
    ]);
    let first = dependency::topological_sort(&graph);
    for _ in 0..10 {
        assert_eq!(dependency::topological_sort(&graph), first);
    }
    assert_eq!(first.sorted, vec!["apple", "zebra", "mango"]);
}

#[test]
fn test_three_cycle_with_independent_table() {
    let graph = DependencyGraph::from_edges([
        ("a", vec!["b"]),
        ("b", vec!["c"]),
        ("c", vec!["a"]),
        ("d", vec![]),
    ]);

    let result = dependency::topological_sort(&graph);
    assert!(result.has_cycles);
    assert_eq!(result.sorted, vec!["d"]);
    let unsortable: Vec<&str> = result.unsortable.iter().map(String::as_str).collect();
    assert_eq!(unsortable, vec!["a", "b", "c"]);

    let cycles = dependency::find_cycles(&graph);
    assert_eq!(cycles.len(), 1);
    let mut members = cycles[0].clone();
    members.sort();
    assert_eq!(members, vec!["a", "b", "c"]);
}

#[test]
fn test_dependent_of_cycle_is_unsortable() {
    let graph = DependencyGraph::from_edges([
        ("a", vec!["b"]),
        ("b", vec!["a"]),
        ("e", vec!["a"]),
    ]);
    let result = dependency::topological_sort(&graph);
    assert!(result.sorted.is_empty());
    assert!(result.unsortable.contains("e"));

    // e is not part of any cycle itself
    let cycles = dependency::find_cycles(&graph);
    assert_eq!(cycles.len(), 1);
    assert!(!cycles[0].contains(&"e".to_string()));
}

#[test]
fn test_self_reference_is_ignored_when_building() {
    let employees = TableInfo::new("public", "employees").with_foreign_key(ForeignKey::new(
        "employees_manager_id_fkey",
        "manager_id",
        "public",
        "employees",
        "id",
    ));
    let refs = vec![employees.table_ref()];
    let snapshot = snapshot(vec![employees]);

    let graph = DependencyGraph::build(&refs, &snapshot);
    let result = dependency::topological_sort(&graph);
    assert!(!result.has_cycles);
    assert_eq!(result.sorted, vec!["public.employees"]);
}

#[test]
fn test_references_outside_working_set() {
    let tables = vec![table("orders", &["customers"]), table("customers", &[])];
    let snapshot = snapshot(tables);
    let refs = vec![TableRef::new("public", "orders")];

    let graph = DependencyGraph::build(&refs, &snapshot);
    assert_eq!(graph.len(), 1);
    assert!(graph.dependencies("public.orders").unwrap().is_empty());

    // Dangling: customers is in neither the working set nor the snapshot
    let lonely = snapshot_without_customers();
    let messages = dependency::dangling_references(&refs, &lonely);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("public.customers"));
}

fn snapshot_without_customers() -> Snapshot {
    snapshot(vec![table("orders", &["customers"])])
}

#[test]
fn test_format_cycle() {
    let cycle = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    assert_eq!(dependency::format_cycle(&cycle), "a -> b -> c -> a");
}
