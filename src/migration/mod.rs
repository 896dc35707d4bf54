//! Migration script generation
//!
//! This module turns a [`SchemaDiff`](crate::diff::SchemaDiff) into SQL,
//! including:
//! - Eight ordered stages (schemas/extensions/types through row-security policies)
//! - Foreign key dependency ordering of new tables
//! - Two-phase creation of tables with circular foreign keys
//! - Rollback scripts with destructive statements commented out on dry runs
//! - Transaction wrapping per file or across the whole script
//! - Full database dumps through the same code path
//!
//! # Example
//!
//! ```rust
//! use pgcompare::compare::compare;
//! use pgcompare::migration::{generate, MigrationOptions, Stage};
//! use pgcompare::snapshot::{Column, Snapshot, TableInfo};
//!
//! let source = Snapshot::empty().with_table(
//!     TableInfo::new("public", "users").with_column(Column::new("id", "integer").not_null()),
//! );
//! let target = Snapshot::empty();
//!
//! let diff = compare(&source, &target);
//! let script = generate(&diff, &source, &target, &MigrationOptions::default());
//! assert!(script.get(Stage::Tables).contains("CREATE TABLE IF NOT EXISTS \"public\".\"users\""));
//! ```

mod dump;
mod forward;
mod plan;
mod rollback;
pub mod sql;
mod transaction;

pub use dump::generate_dump;
pub use forward::generate;
pub use rollback::generate_rollback;
pub use transaction::wrap_transactions;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::diff::Side;

/// The eight generation stages, in forward execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Schemas,
    Sequences,
    Tables,
    Indexes,
    Constraints,
    Functions,
    Triggers,
    Policies,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Schemas,
        Stage::Sequences,
        Stage::Tables,
        Stage::Indexes,
        Stage::Constraints,
        Stage::Functions,
        Stage::Triggers,
        Stage::Policies,
    ];

    /// 1-based forward position
    pub fn number(self) -> usize {
        match self {
            Stage::Schemas => 1,
            Stage::Sequences => 2,
            Stage::Tables => 3,
            Stage::Indexes => 4,
            Stage::Constraints => 5,
            Stage::Functions => 6,
            Stage::Triggers => 7,
            Stage::Policies => 8,
        }
    }

    /// 1-based position when executing a rollback
    pub fn rollback_step(self) -> usize {
        Stage::ALL.len() + 1 - self.number()
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Schemas => "schemas",
            Stage::Sequences => "sequences",
            Stage::Tables => "tables",
            Stage::Indexes => "indexes",
            Stage::Constraints => "constraints",
            Stage::Functions => "functions",
            Stage::Triggers => "triggers",
            Stage::Policies => "policies",
        }
    }

    /// Stage identifier, e.g. `3-tables`
    pub fn key(self) -> String {
        format!("{}-{}", self.number(), self.name())
    }

    /// Text of a forward stage with nothing to do
    pub fn empty_sentinel(self) -> &'static str {
        match self {
            Stage::Schemas => "-- No schemas, extensions or enum types to create",
            Stage::Sequences => "-- No sequences to create",
            Stage::Tables => "-- No tables to create or migrate",
            Stage::Indexes => "-- No indexes to create",
            Stage::Constraints => "-- No constraints or foreign keys to create",
            Stage::Functions => "-- No functions to create",
            Stage::Triggers => "-- No triggers to create",
            Stage::Policies => "-- No policies to create",
        }
    }

    /// Text of a rollback stage with nothing to do
    pub fn rollback_sentinel(self) -> &'static str {
        match self {
            Stage::Schemas => "-- No extensions or enum types to roll back",
            Stage::Sequences => "-- No sequences to roll back",
            Stage::Tables => "-- No tables to roll back",
            Stage::Indexes => "-- No indexes to roll back",
            Stage::Constraints => "-- No constraints or foreign keys to roll back",
            Stage::Functions => "-- No functions to roll back",
            Stage::Triggers => "-- No triggers to roll back",
            Stage::Policies => "-- No policies to roll back",
        }
    }
}

/// Which way a migration reconciles the two snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Create what only the source has; the script runs against the target
    #[default]
    SourceToTarget,
    /// Create what only the target has; the script runs against the source
    TargetToSource,
}

impl Direction {
    /// Side holding the objects the migration creates
    pub fn from_side(self) -> Side {
        match self {
            Direction::SourceToTarget => Side::Source,
            Direction::TargetToSource => Side::Target,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::SourceToTarget => "source-to-target",
            Direction::TargetToSource => "target-to-source",
        }
    }
}

/// Transaction wrapping of generated stages
///
/// `Single` only opens a transaction in the first executed stage and commits
/// in the last one, so all stages must run in one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionScope {
    #[default]
    None,
    PerFile,
    Single,
}

/// Options resolved by the caller for one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationOptions {
    pub direction: Direction,
    pub transaction_scope: TransactionScope,
    /// Order new tables by foreign key dependencies
    pub sort_dependencies: bool,
    /// Create tables in circular dependencies in two phases
    pub handle_circular_deps: bool,
    /// Comment out destructive statements in rollback scripts
    pub dry_run: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            direction: Direction::SourceToTarget,
            transaction_scope: TransactionScope::None,
            sort_dependencies: true,
            handle_circular_deps: true,
            dry_run: true,
        }
    }
}

impl MigrationOptions {
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn transaction_scope(mut self, scope: TransactionScope) -> Self {
        self.transaction_scope = scope;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// What a script does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    Forward,
    Rollback,
    Dump,
}

/// SQL text of one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSql {
    pub stage: Stage,
    pub sql: String,
}

/// A complete eight-stage script
///
/// `stages` is kept in execution order: 1 to 8 for forward scripts and
/// dumps, 8 to 1 for rollbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationScript {
    pub kind: ScriptKind,
    pub stages: Vec<StageSql>,
}

impl MigrationScript {
    pub(crate) fn new(kind: ScriptKind, mut stages: BTreeMap<Stage, String>) -> Self {
        let mut order = Stage::ALL.to_vec();
        if kind == ScriptKind::Rollback {
            order.reverse();
        }
        let stages = order
            .into_iter()
            .map(|stage| StageSql {
                stage,
                sql: stages.remove(&stage).unwrap_or_default(),
            })
            .collect();
        Self { kind, stages }
    }

    /// SQL of `stage` (empty only if the script was built by hand)
    pub fn get(&self, stage: Stage) -> &str {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.sql.as_str())
            .unwrap_or_default()
    }

    /// Stages in execution order
    pub fn iter(&self) -> impl Iterator<Item = &StageSql> {
        self.stages.iter()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// True when every stage only carries its "nothing to do" sentinel
    pub fn has_no_changes(&self) -> bool {
        self.stages.iter().all(|s| is_empty_stage(&s.sql))
    }

    /// Stage key -> SQL
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.stages
            .iter()
            .map(|s| (s.stage.key(), s.sql.clone()))
            .collect()
    }
}

/// Whether a stage's text amounts to "nothing to do"
///
/// Transaction statements and rollback step headers are ignored, so wrapped
/// stages are recognized too.
pub fn is_empty_stage(sql: &str) -> bool {
    let remaining: Vec<&str> = sql
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| *line != "BEGIN;" && *line != "COMMIT;")
        .filter(|line| !line.starts_with(rollback::STEP_HEADER_PREFIX))
        .collect();

    match remaining.as_slice() {
        [] => true,
        [only] => Stage::ALL
            .iter()
            .any(|stage| *only == stage.empty_sentinel() || *only == stage.rollback_sentinel()),
        _ => false,
    }
}

/// Join statements into stage text, or the sentinel when there are none
pub(crate) fn stage_text(statements: Vec<String>, sentinel: &str) -> String {
    if statements.is_empty() {
        format!("{}\n", sentinel)
    } else {
        format!("{}\n", statements.join("\n\n"))
    }
}
