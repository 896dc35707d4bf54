//! In-memory schema snapshot
//!
//! A [`Snapshot`] is the fully materialized structure of one database as
//! handed over by the metadata extraction layer. The comparator and the
//! migration emitter only ever read it.
//!
//! Tables are keyed by `"schema.table"` in a hash map so every lookup the
//! comparator performs is O(1). Anything that produces output iterates
//! [`Snapshot::sorted_keys`] instead of the map so results are stable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::diff::TableRef;
use crate::error::PgCompareError;

/// Structural capture of one database
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Tables keyed by `"schema.table"`
    #[serde(default)]
    pub tables: HashMap<String, TableInfo>,
    #[serde(default)]
    pub enums: Vec<EnumType>,
    #[serde(default)]
    pub extensions: Vec<Extension>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Snapshot {
    /// A snapshot with no objects at all (the target of a full dump)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the lookup key for a table
    pub fn key(schema: &str, table: &str) -> String {
        format!("{}.{}", schema, table)
    }

    /// Parse a snapshot produced by the extraction layer
    pub fn from_json(json: &str) -> Result<Self, PgCompareError> {
        serde_json::from_str(json).map_err(PgCompareError::Snapshot)
    }

    /// Insert a table under its own key, replacing any previous entry
    pub fn insert_table(&mut self, table: TableInfo) {
        self.tables.insert(table.key(), table);
    }

    /// Chainable form of [`Snapshot::insert_table`]
    #[must_use]
    pub fn with_table(mut self, table: TableInfo) -> Self {
        self.insert_table(table);
        self
    }

    pub fn table(&self, key: &str) -> Option<&TableInfo> {
        self.tables.get(key)
    }

    /// Table keys in lexical order
    pub fn sorted_keys(&self) -> Vec<&String> {
        let mut keys: Vec<&String> = self.tables.keys().collect();
        keys.sort();
        keys
    }

    /// References to every table, sorted by key
    pub fn table_refs(&self) -> Vec<TableRef> {
        self.sorted_keys()
            .into_iter()
            .filter_map(|key| self.tables.get(key))
            .map(TableInfo::table_ref)
            .collect()
    }

    /// Distinct schema names that own at least one table
    pub fn schema_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.values().map(|t| t.schema.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn extension(&self, name: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.name == name)
    }
}

/// One table and everything hanging off it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    /// Columns in ordinal order
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub sequences: Vec<SequenceInfo>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub policies: Vec<Policy>,
}

impl TableInfo {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn key(&self) -> String {
        Snapshot::key(&self.schema, &self.name)
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.schema.clone(), self.name.clone())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// The index backing the primary key, if any
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.primary)
    }

    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn with_sequence(mut self, sequence: SequenceInfo) -> Self {
        self.sequences.push(sequence);
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }
}

/// Column metadata
///
/// `data_type` is already normalized by the extraction layer
/// (`USER-DEFINED` resolved to the underlying type name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub max_length: Option<i32>,
    #[serde(default)]
    pub precision: Option<i32>,
    #[serde(default)]
    pub scale: Option<i32>,
}

fn default_nullable() -> bool {
    true
}

impl Column {
    /// A nullable column without default, length or precision
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }

    pub fn max_length(mut self, length: i32) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn numeric(mut self, precision: i32, scale: i32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }
}

/// Index access method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMethod {
    #[default]
    Btree,
    Gin,
    Gist,
    Hash,
    Brin,
}

impl IndexMethod {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IndexMethod::Btree => "btree",
            IndexMethod::Gin => "gin",
            IndexMethod::Gist => "gist",
            IndexMethod::Hash => "hash",
            IndexMethod::Brin => "brin",
        }
    }
}

/// Index metadata
///
/// `columns` holds plain column names or functional expressions, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub method: IndexMethod,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            unique: false,
            primary: false,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            method: IndexMethod::Btree,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.unique = true;
        self
    }

    pub fn using(mut self, method: IndexMethod) -> Self {
        self.method = method;
        self
    }

    /// Column set in sorted order, for order-insensitive equivalence
    pub fn sorted_columns(&self) -> Vec<String> {
        sorted(&self.columns)
    }
}

/// Referential action of a foreign key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FkAction {
    #[default]
    #[serde(alias = "NO ACTION")]
    NoAction,
    Restrict,
    Cascade,
    #[serde(alias = "SET NULL")]
    SetNull,
    #[serde(alias = "SET DEFAULT")]
    SetDefault,
}

impl FkAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FkAction::NoAction => "NO ACTION",
            FkAction::Restrict => "RESTRICT",
            FkAction::Cascade => "CASCADE",
            FkAction::SetNull => "SET NULL",
            FkAction::SetDefault => "SET DEFAULT",
        }
    }
}

/// One column of a foreign key constraint
///
/// Composite foreign keys appear as several rows sharing `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub column: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
    #[serde(default)]
    pub on_delete: FkAction,
    #[serde(default)]
    pub on_update: FkAction,
}

impl ForeignKey {
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        referenced_schema: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            referenced_schema: referenced_schema.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            on_delete: FkAction::NoAction,
            on_update: FkAction::NoAction,
        }
    }

    pub fn on_delete(mut self, action: FkAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn on_update(mut self, action: FkAction) -> Self {
        self.on_update = action;
        self
    }

    /// Key of the referenced table
    pub fn referenced_key(&self) -> String {
        Snapshot::key(&self.referenced_schema, &self.referenced_table)
    }
}

/// Kind of a table-level constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConstraintKind {
    Check,
    Unique,
    /// Anything else the catalog reports (EXCLUDE, ...), compared by name
    #[serde(untagged)]
    Other(String),
}

/// CHECK or UNIQUE constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    #[serde(default)]
    pub check_clause: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
}

impl Constraint {
    pub fn check(name: impl Into<String>, clause: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Check,
            check_clause: Some(clause.into()),
            columns: Vec::new(),
        }
    }

    pub fn unique(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            kind: ConstraintKind::Unique,
            check_clause: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn sorted_columns(&self) -> Vec<String> {
        sorted(&self.columns)
    }
}

/// Sequence owned by an auto-increment column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceInfo {
    pub name: String,
    /// Owning column
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub start: Option<i64>,
    #[serde(default)]
    pub increment: Option<i64>,
}

impl SequenceInfo {
    pub fn owned_by(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: Some(column.into()),
            data_type: None,
            start: None,
            increment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub name: String,
    /// `BEFORE`, `AFTER` or `INSTEAD OF`
    pub timing: String,
    /// `INSERT`, `UPDATE`, `DELETE`, `TRUNCATE`
    pub events: Vec<String>,
    /// `ROW` or `STATEMENT`
    #[serde(default = "default_orientation")]
    pub orientation: String,
    /// e.g. `EXECUTE FUNCTION audit.log_change()`
    pub action: String,
    #[serde(default)]
    pub condition: Option<String>,
}

fn default_orientation() -> String {
    "ROW".to_string()
}

/// Row-security policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    #[serde(default = "default_permissive")]
    pub permissive: bool,
    /// `ALL`, `SELECT`, `INSERT`, `UPDATE` or `DELETE`
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub using: Option<String>,
    #[serde(default)]
    pub with_check: Option<String>,
}

fn default_permissive() -> bool {
    true
}

fn default_command() -> String {
    "ALL".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumType {
    pub schema: String,
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// A stored function
///
/// `definition` is the complete `CREATE OR REPLACE FUNCTION` text as
/// returned by `pg_get_functiondef`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub schema: String,
    pub name: String,
    /// Identity argument list, e.g. `integer, text`
    #[serde(default)]
    pub arguments: String,
    pub definition: String,
}

impl Function {
    /// `schema.name(arguments)`, unique per database
    pub fn signature(&self) -> String {
        format!("{}.{}({})", self.schema, self.name, self.arguments)
    }
}

fn sorted(columns: &[String]) -> Vec<String> {
    let mut columns = columns.to_vec();
    columns.sort();
    columns
}
