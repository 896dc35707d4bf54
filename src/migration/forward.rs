//! Forward migration stages

use std::collections::BTreeMap;

use super::plan::{has_backing_index, ChangeSet};
use super::sql;
use super::{stage_text, wrap_transactions, MigrationOptions, MigrationScript, ScriptKind, Stage};
use crate::diff::SchemaDiff;
use crate::snapshot::{Snapshot, TableInfo};

/// Generate the eight forward stages reconciling `diff` in `options.direction`
///
/// The result always has exactly eight stages; stages with nothing to do
/// carry their sentinel comment. Transaction wrapping is applied last.
pub fn generate(
    diff: &SchemaDiff,
    source: &Snapshot,
    target: &Snapshot,
    options: &MigrationOptions,
) -> MigrationScript {
    let script = build(diff, source, target, options, ScriptKind::Forward);
    wrap_transactions(script, options.transaction_scope)
}

/// Unwrapped stages, shared with full dumps
pub(crate) fn build(
    diff: &SchemaDiff,
    source: &Snapshot,
    target: &Snapshot,
    options: &MigrationOptions,
    kind: ScriptKind,
) -> MigrationScript {
    let changes = ChangeSet::resolve(diff, source, target, options);
    log::debug!(
        "Generating {} migration: {} new table(s), {} cyclic",
        options.direction.label(),
        changes.new_tables.ordered.len() + changes.new_tables.cyclic.len(),
        changes.new_tables.cyclic.len()
    );

    let mut stages = BTreeMap::new();
    stages.insert(Stage::Schemas, schemas_stage(&changes));
    stages.insert(Stage::Sequences, sequences_stage(&changes));
    stages.insert(Stage::Tables, tables_stage(&changes));
    stages.insert(Stage::Indexes, indexes_stage(&changes));
    stages.insert(Stage::Constraints, constraints_stage(&changes));
    stages.insert(Stage::Functions, functions_stage(&changes));
    stages.insert(Stage::Triggers, triggers_stage(&changes));
    stages.insert(Stage::Policies, policies_stage(&changes));
    MigrationScript::new(kind, stages)
}

fn schemas_stage(changes: &ChangeSet<'_>) -> String {
    let mut statements: Vec<String> = changes
        .new_schemas()
        .iter()
        .map(|schema| sql::create_schema(schema))
        .collect();
    statements.extend(changes.new_extensions().iter().map(|e| sql::create_extension(&e.name)));
    statements.extend(changes.new_enums().into_iter().map(sql::create_enum));
    stage_text(statements, Stage::Schemas.empty_sentinel())
}

fn sequences_stage(changes: &ChangeSet<'_>) -> String {
    let statements = changes
        .new_sequences()
        .into_iter()
        .map(|(table, sequence)| sql::create_sequence(&table.schema, sequence))
        .collect();
    stage_text(statements, Stage::Sequences.empty_sentinel())
}

/// CREATE TABLE plus OWNED BY for its sequences
fn table_structure(table: &TableInfo) -> String {
    let mut lines = vec![sql::create_table(table)];
    for sequence in &table.sequences {
        if let Some(column) = sequence.column.as_deref().filter(|c| table.column(c).is_some()) {
            lines.push(sql::sequence_owned_by(table, sequence, column));
        }
    }
    lines.join("\n")
}

fn tables_stage(changes: &ChangeSet<'_>) -> String {
    let order = &changes.new_tables;
    let mut statements = Vec::new();

    if order.unhandled_cycles {
        for cycle in &order.cycles {
            statements.push(format!(
                "-- WARNING: circular dependency {}; foreign keys are added in stage 5 without deferral",
                cycle
            ));
        }
    }

    statements.extend(order.ordered.iter().map(|table| table_structure(table)));

    for (table, column) in changes.added_columns() {
        statements.push(sql::add_column(table, column));
    }

    for common in &changes.common {
        let Some(table_diff) = common.diff else {
            continue;
        };
        for column in &table_diff.columns_with_differences {
            let described: Vec<String> = column.changes.iter().map(|c| c.describe()).collect();
            statements.push(format!(
                "-- REVIEW: {}.{} differs{}: {}",
                sql::qualified_name(&common.from.schema, &common.from.name),
                sql::quote_ident(&column.name),
                if column.critical { " (critical)" } else { "" },
                described.join(", ")
            ));
        }
    }

    if !order.cyclic.is_empty() {
        let mut phase_one = Vec::new();
        for cycle in &order.cycles {
            phase_one.push(format!("-- Circular dependency: {}", cycle));
        }
        phase_one.push(
            "-- Phase 1: create tables involved in circular dependencies without foreign keys"
                .to_string(),
        );
        statements.push(phase_one.join("\n"));
        statements.extend(order.cyclic.iter().map(|table| table_structure(table)));

        // Deferred so mutual references are validated at commit
        let mut phase_two =
            vec!["-- Phase 2: add deferred foreign keys".to_string()];
        for table in &order.cyclic {
            for group in sql::group_foreign_keys(&table.foreign_keys) {
                phase_two.push(sql::add_foreign_key(table, &group, true));
            }
        }
        statements.push(phase_two.join("\n"));
    }

    stage_text(statements, Stage::Tables.empty_sentinel())
}

fn indexes_stage(changes: &ChangeSet<'_>) -> String {
    let mut statements = Vec::new();
    for table in changes.all_new_tables() {
        for index in table.indexes.iter().filter(|i| !i.primary) {
            statements.push(sql::create_index(table, index));
        }
    }
    for (table, index) in changes.added_indexes() {
        statements.push(sql::create_index(table, index));
    }
    stage_text(statements, Stage::Indexes.empty_sentinel())
}

fn constraints_stage(changes: &ChangeSet<'_>) -> String {
    let mut statements = Vec::new();

    for table in changes.all_new_tables() {
        for constraint in &table.constraints {
            // Stage 4 already created the unique index behind this name
            if has_backing_index(table, constraint) {
                log::debug!(
                    "Skipping UNIQUE constraint {} on {}: unique index exists",
                    constraint.name,
                    table.key()
                );
                continue;
            }
            statements.push(sql::add_constraint(table, constraint));
        }
        if !changes.is_two_phase(table) {
            for group in sql::group_foreign_keys(&table.foreign_keys) {
                statements.push(sql::add_foreign_key(table, &group, false));
            }
        }
    }

    for (table, constraint) in changes.added_constraints() {
        statements.push(sql::add_constraint(table, constraint));
    }
    for (table, group) in changes.added_foreign_keys() {
        statements.push(sql::add_foreign_key(table, &group, false));
    }

    stage_text(statements, Stage::Constraints.empty_sentinel())
}

fn functions_stage(changes: &ChangeSet<'_>) -> String {
    let statements = changes
        .new_functions()
        .into_iter()
        .map(sql::create_function)
        .collect();
    stage_text(statements, Stage::Functions.empty_sentinel())
}

fn triggers_stage(changes: &ChangeSet<'_>) -> String {
    let statements = changes
        .added_triggers()
        .into_iter()
        .map(|(table, trigger)| sql::create_trigger(table, trigger))
        .collect();
    stage_text(statements, Stage::Triggers.empty_sentinel())
}

fn policies_stage(changes: &ChangeSet<'_>) -> String {
    let mut statements = Vec::new();
    let mut enabled: Vec<String> = Vec::new();
    for (table, policy) in changes.added_policies() {
        let key = table.key();
        if !enabled.contains(&key) {
            statements.push(sql::enable_row_security(table));
            enabled.push(key);
        }
        statements.push(sql::create_policy(table, policy));
    }
    stage_text(statements, Stage::Policies.empty_sentinel())
}
