//! Rollback stages
//!
//! A rollback undoes what the forward script of the same direction creates,
//! using the same stage keys but executed from `8-policies` down to
//! `1-schemas`. Objects inside new tables go away with `DROP TABLE ... CASCADE`;
//! additions to existing tables are dropped one by one.
//!
//! On a dry run `DROP TABLE`, `DROP COLUMN`, `DROP FUNCTION` and `DROP TYPE`
//! are commented out. Extensions and schemas are never dropped automatically;
//! their drops are always left as commented suggestions.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::plan::ChangeSet;
use super::sql;
use super::{stage_text, wrap_transactions, MigrationOptions, MigrationScript, ScriptKind, Stage};
use crate::diff::SchemaDiff;
use crate::snapshot::Snapshot;

/// Start of the header line every rollback stage carries
pub(crate) const STEP_HEADER_PREFIX: &str = "-- Rollback step";

const DRY_RUN_PREFIX: &str = "-- ";

/// Generate the eight rollback stages for the forward migration `options` describes
pub fn generate_rollback(
    diff: &SchemaDiff,
    source: &Snapshot,
    target: &Snapshot,
    options: &MigrationOptions,
) -> MigrationScript {
    let changes = ChangeSet::resolve(diff, source, target, options);
    let destructive = Destructive {
        dry_run: options.dry_run,
    };
    log::debug!(
        "Generating {} rollback (dry run: {})",
        options.direction.label(),
        options.dry_run
    );

    let mut stages = BTreeMap::new();
    stages.insert(Stage::Policies, policies_stage(&changes));
    stages.insert(Stage::Triggers, triggers_stage(&changes));
    stages.insert(Stage::Functions, functions_stage(&changes, &destructive));
    stages.insert(Stage::Constraints, constraints_stage(&changes));
    stages.insert(Stage::Indexes, indexes_stage(&changes));
    stages.insert(Stage::Tables, tables_stage(&changes, &destructive));
    stages.insert(Stage::Sequences, sequences_stage(&changes));
    stages.insert(Stage::Schemas, schemas_stage(&changes, &destructive));

    let stages = stages
        .into_iter()
        .map(|(stage, body)| (stage, with_header(stage, body)))
        .collect();
    wrap_transactions(
        MigrationScript::new(ScriptKind::Rollback, stages),
        options.transaction_scope,
    )
}

/// Renders statements that lose data
struct Destructive {
    dry_run: bool,
}

impl Destructive {
    fn statement(&self, sql: String) -> String {
        if self.dry_run {
            format!("{}{}", DRY_RUN_PREFIX, sql)
        } else {
            sql
        }
    }
}

fn with_header(stage: Stage, body: String) -> String {
    format!(
        "{} {} of {}\n{}",
        STEP_HEADER_PREFIX,
        stage.rollback_step(),
        Stage::ALL.len(),
        body
    )
}

fn policies_stage(changes: &ChangeSet<'_>) -> String {
    let statements = changes
        .common
        .iter()
        .flat_map(|common| {
            let existing: HashSet<&str> = common.to.policies.iter().map(|p| p.name.as_str()).collect();
            common
                .from
                .policies
                .iter()
                .filter(move |p| !existing.contains(p.name.as_str()))
                .map(move |p| sql::drop_policy(&common.from.schema, &common.from.name, &p.name))
        })
        .collect();
    stage_text(statements, Stage::Policies.rollback_sentinel())
}

fn triggers_stage(changes: &ChangeSet<'_>) -> String {
    let statements = changes
        .common
        .iter()
        .flat_map(|common| {
            let existing: HashSet<&str> = common.to.triggers.iter().map(|t| t.name.as_str()).collect();
            common
                .from
                .triggers
                .iter()
                .filter(move |t| !existing.contains(t.name.as_str()))
                .map(move |t| sql::drop_trigger(&common.from.schema, &common.from.name, &t.name))
        })
        .collect();
    stage_text(statements, Stage::Triggers.rollback_sentinel())
}

fn functions_stage(changes: &ChangeSet<'_>, destructive: &Destructive) -> String {
    let statements = changes
        .new_functions()
        .into_iter()
        .map(|f| destructive.statement(sql::drop_function(f)))
        .collect();
    stage_text(statements, Stage::Functions.rollback_sentinel())
}

fn constraints_stage(changes: &ChangeSet<'_>) -> String {
    let mut statements: Vec<String> = changes
        .added_foreign_keys()
        .into_iter()
        .filter_map(|(table, group)| {
            group
                .first()
                .map(|fk| sql::drop_constraint(&table.schema, &table.name, &fk.name))
        })
        .collect();
    statements.extend(
        changes
            .added_constraints()
            .into_iter()
            .map(|(table, c)| sql::drop_constraint(&table.schema, &table.name, &c.name)),
    );
    stage_text(statements, Stage::Constraints.rollback_sentinel())
}

fn indexes_stage(changes: &ChangeSet<'_>) -> String {
    let statements = changes
        .added_indexes()
        .into_iter()
        .map(|(table, index)| sql::drop_index(&table.schema, &table.name, index))
        .collect();
    stage_text(statements, Stage::Indexes.rollback_sentinel())
}

fn tables_stage(changes: &ChangeSet<'_>, destructive: &Destructive) -> String {
    let mut statements: Vec<String> = changes
        .added_columns()
        .into_iter()
        .map(|(table, column)| {
            destructive.statement(sql::drop_column(&table.schema, &table.name, &column.name))
        })
        .collect();

    // Dependents first
    let mut new_tables: Vec<_> = changes.all_new_tables().collect();
    new_tables.reverse();
    statements.extend(
        new_tables
            .into_iter()
            .map(|table| destructive.statement(sql::drop_table(&table.schema, &table.name))),
    );
    stage_text(statements, Stage::Tables.rollback_sentinel())
}

fn sequences_stage(changes: &ChangeSet<'_>) -> String {
    let statements = changes
        .new_sequences()
        .into_iter()
        .map(|(table, sequence)| sql::drop_sequence(&table.schema, sequence))
        .collect();
    stage_text(statements, Stage::Sequences.rollback_sentinel())
}

fn schemas_stage(changes: &ChangeSet<'_>, destructive: &Destructive) -> String {
    let mut statements: Vec<String> = changes
        .new_enums()
        .into_iter()
        .map(|e| destructive.statement(sql::drop_enum(e)))
        .collect();

    let extensions: BTreeSet<&str> = changes
        .new_extensions()
        .into_iter()
        .map(|e| e.name.as_str())
        .collect();
    for name in extensions {
        // Shared with objects outside the compared schemas
        statements.push(format!(
            "{}{} -- review before dropping, extensions may be shared",
            DRY_RUN_PREFIX,
            sql::drop_extension(name)
        ));
    }
    for schema in changes.new_schemas() {
        statements.push(format!(
            "{}{} -- review before dropping, the schema may hold other objects",
            DRY_RUN_PREFIX,
            sql::drop_schema(&schema)
        ));
    }

    stage_text(statements, Stage::Schemas.rollback_sentinel())
}
