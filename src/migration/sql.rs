//! Pure SQL formatting helpers
//!
//! Every identifier quoting and statement template used by the emitter lives
//! here so stage generation never formats SQL by hand.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::snapshot::{
    Column, Constraint, ConstraintKind, EnumType, ForeignKey, Function, Index, Policy,
    SequenceInfo, TableInfo, Trigger,
};

static PLAIN_IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").unwrap());
static CHECK_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^check\s*\(").unwrap());

const INTEGER_TYPES: &[&str] = &[
    "smallint", "integer", "bigint", "int", "int2", "int4", "int8", "smallserial", "serial",
    "bigserial", "serial2", "serial4", "serial8",
];

const NUMERIC_TYPES: &[&str] = &["numeric", "decimal"];

/// Quote an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"schema"."name"`
pub fn qualified_name(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn quote_list(names: &[String]) -> String {
    names.iter().map(|n| quote_ident(n)).collect::<Vec<_>>().join(", ")
}

/// Render a column type with its length or numeric precision
///
/// Integer types never carry precision or scale; precision is only kept for
/// `numeric`/`decimal`.
pub fn format_column_type(column: &Column) -> String {
    let data_type = column.data_type.trim();
    let lowered = data_type.to_lowercase();

    if INTEGER_TYPES.contains(&lowered.as_str()) {
        return data_type.to_string();
    }
    if let Some(length) = column.max_length {
        return format!("{}({})", data_type, length);
    }
    if NUMERIC_TYPES.contains(&lowered.as_str()) {
        return match (column.precision, column.scale) {
            (Some(precision), Some(scale)) => format!("{}({},{})", data_type, precision, scale),
            (Some(precision), None) => format!("{}({})", data_type, precision),
            _ => data_type.to_string(),
        };
    }
    data_type.to_string()
}

/// `"name" type [NOT NULL] [DEFAULT expr]`
pub fn column_definition(column: &Column) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), format_column_type(column));
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(ref default) = column.default {
        sql.push_str(&format!(" DEFAULT {}", default));
    }
    sql
}

/// CREATE TABLE without foreign keys; the primary key is inlined
pub fn create_table(table: &TableInfo) -> String {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("    {}", column_definition(c)))
        .collect();
    if let Some(pk) = table.primary_key() {
        lines.push(format!("    PRIMARY KEY ({})", index_columns(pk)));
    }

    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (\n",
        qualified_name(&table.schema, &table.name)
    );
    if !lines.is_empty() {
        sql.push_str(&lines.join(",\n"));
        sql.push('\n');
    }
    sql.push_str(");");
    sql
}

pub fn add_column(table: &TableInfo, column: &Column) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {};",
        qualified_name(&table.schema, &table.name),
        column_definition(column)
    )
}

pub fn drop_column(schema: &str, table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN IF EXISTS {};",
        qualified_name(schema, table),
        quote_ident(column)
    )
}

pub fn drop_table(schema: &str, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE;", qualified_name(schema, table))
}

/// Index entries: plain names are quoted, expressions kept verbatim
fn index_columns(index: &Index) -> String {
    index
        .columns
        .iter()
        .map(|entry| {
            if PLAIN_IDENTIFIER.is_match(entry) {
                quote_ident(entry)
            } else {
                entry.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// CREATE INDEX, or ADD PRIMARY KEY for a primary index
pub fn create_index(table: &TableInfo, index: &Index) -> String {
    let table_name = qualified_name(&table.schema, &table.name);
    if index.primary {
        return format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({});",
            table_name,
            quote_ident(&index.name),
            index_columns(index)
        );
    }
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} USING {} ({});",
        if index.unique { "UNIQUE " } else { "" },
        quote_ident(&index.name),
        table_name,
        index.method.as_sql(),
        index_columns(index)
    )
}

pub fn drop_index(schema: &str, table: &str, index: &Index) -> String {
    if index.primary {
        return drop_constraint(schema, table, &index.name);
    }
    format!("DROP INDEX IF EXISTS {};", qualified_name(schema, &index.name))
}

/// Wrap a check clause in `CHECK (...)` unless it already is
pub fn check_expression(clause: &str) -> String {
    let trimmed = clause.trim();
    if CHECK_PREFIX.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("CHECK ({})", trimmed)
    }
}

/// ALTER TABLE ... ADD CONSTRAINT for a CHECK or UNIQUE constraint
///
/// Other kinds have no portable definition and come out as a comment.
pub fn add_constraint(table: &TableInfo, constraint: &Constraint) -> String {
    let table_name = qualified_name(&table.schema, &table.name);
    match &constraint.kind {
        ConstraintKind::Check => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} {};",
            table_name,
            quote_ident(&constraint.name),
            check_expression(constraint.check_clause.as_deref().unwrap_or_default())
        ),
        ConstraintKind::Unique => format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({});",
            table_name,
            quote_ident(&constraint.name),
            quote_list(&constraint.columns)
        ),
        ConstraintKind::Other(kind) => format!(
            "-- Constraint {} ({}) on {} must be created manually",
            quote_ident(&constraint.name),
            kind,
            table_name
        ),
    }
}

pub fn drop_constraint(schema: &str, table: &str, name: &str) -> String {
    format!(
        "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {};",
        qualified_name(schema, table),
        quote_ident(name)
    )
}

/// Foreign key rows grouped by constraint name, in first-seen order
pub fn group_foreign_keys<'a>(fks: impl IntoIterator<Item = &'a ForeignKey>) -> Vec<Vec<&'a ForeignKey>> {
    let mut groups: Vec<Vec<&ForeignKey>> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for fk in fks {
        match positions.get(fk.name.as_str()) {
            Some(&at) => groups[at].push(fk),
            None => {
                positions.insert(fk.name.as_str(), groups.len());
                groups.push(vec![fk]);
            }
        }
    }
    groups
}

/// ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY for one grouped constraint
pub fn add_foreign_key(table: &TableInfo, group: &[&ForeignKey], deferrable: bool) -> String {
    let Some(first) = group.first() else {
        return String::new();
    };
    let columns: Vec<String> = group.iter().map(|fk| fk.column.clone()).collect();
    let referenced: Vec<String> = group.iter().map(|fk| fk.referenced_column.clone()).collect();
    format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}{};",
        qualified_name(&table.schema, &table.name),
        quote_ident(&first.name),
        quote_list(&columns),
        qualified_name(&first.referenced_schema, &first.referenced_table),
        quote_list(&referenced),
        first.on_delete.as_sql(),
        first.on_update.as_sql(),
        if deferrable { " DEFERRABLE INITIALLY DEFERRED" } else { "" }
    )
}

/// CREATE TYPE guarded against an existing type
pub fn create_enum(enum_type: &EnumType) -> String {
    let values: Vec<String> = enum_type.values.iter().map(|v| quote_literal(v)).collect();
    format!(
        "DO $$ BEGIN\n    CREATE TYPE {} AS ENUM ({});\nEXCEPTION\n    WHEN duplicate_object THEN null;\nEND $$;",
        qualified_name(&enum_type.schema, &enum_type.name),
        values.join(", ")
    )
}

pub fn drop_enum(enum_type: &EnumType) -> String {
    format!(
        "DROP TYPE IF EXISTS {};",
        qualified_name(&enum_type.schema, &enum_type.name)
    )
}

pub fn create_schema(schema: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {};", quote_ident(schema))
}

pub fn drop_schema(schema: &str) -> String {
    format!("DROP SCHEMA IF EXISTS {};", quote_ident(schema))
}

pub fn create_extension(name: &str) -> String {
    format!("CREATE EXTENSION IF NOT EXISTS {};", quote_ident(name))
}

pub fn drop_extension(name: &str) -> String {
    format!("DROP EXTENSION IF EXISTS {};", quote_ident(name))
}

pub fn create_sequence(schema: &str, sequence: &SequenceInfo) -> String {
    let mut sql = format!(
        "CREATE SEQUENCE IF NOT EXISTS {}",
        qualified_name(schema, &sequence.name)
    );
    if let Some(ref data_type) = sequence.data_type {
        sql.push_str(&format!(" AS {}", data_type));
    }
    if let Some(increment) = sequence.increment {
        sql.push_str(&format!(" INCREMENT BY {}", increment));
    }
    if let Some(start) = sequence.start {
        sql.push_str(&format!(" START WITH {}", start));
    }
    sql.push(';');
    sql
}

pub fn sequence_owned_by(table: &TableInfo, sequence: &SequenceInfo, column: &str) -> String {
    format!(
        "ALTER SEQUENCE {} OWNED BY {}.{};",
        qualified_name(&table.schema, &sequence.name),
        qualified_name(&table.schema, &table.name),
        quote_ident(column)
    )
}

pub fn drop_sequence(schema: &str, sequence: &SequenceInfo) -> String {
    format!("DROP SEQUENCE IF EXISTS {};", qualified_name(schema, &sequence.name))
}

/// Function definition terminated with a semicolon
pub fn create_function(function: &Function) -> String {
    let definition = function.definition.trim_end();
    if definition.ends_with(';') {
        definition.to_string()
    } else {
        format!("{};", definition)
    }
}

pub fn drop_function(function: &Function) -> String {
    format!(
        "DROP FUNCTION IF EXISTS {}({});",
        qualified_name(&function.schema, &function.name),
        function.arguments
    )
}

/// DROP + CREATE so re-running the stage replaces the trigger
pub fn create_trigger(table: &TableInfo, trigger: &Trigger) -> String {
    let table_name = qualified_name(&table.schema, &table.name);
    let condition = trigger
        .condition
        .as_ref()
        .map(|c| format!(" WHEN ({})", c))
        .unwrap_or_default();
    format!(
        "{}\nCREATE TRIGGER {} {} {} ON {} FOR EACH {}{} {};",
        drop_trigger(&table.schema, &table.name, &trigger.name),
        quote_ident(&trigger.name),
        trigger.timing,
        trigger.events.join(" OR "),
        table_name,
        trigger.orientation,
        condition,
        trigger.action
    )
}

pub fn drop_trigger(schema: &str, table: &str, name: &str) -> String {
    format!(
        "DROP TRIGGER IF EXISTS {} ON {};",
        quote_ident(name),
        qualified_name(schema, table)
    )
}

pub fn enable_row_security(table: &TableInfo) -> String {
    format!(
        "ALTER TABLE {} ENABLE ROW LEVEL SECURITY;",
        qualified_name(&table.schema, &table.name)
    )
}

pub fn create_policy(table: &TableInfo, policy: &Policy) -> String {
    let table_name = qualified_name(&table.schema, &table.name);
    let roles = if policy.roles.is_empty() {
        "PUBLIC".to_string()
    } else {
        policy.roles.join(", ")
    };
    let mut sql = format!(
        "{}\nCREATE POLICY {} ON {} AS {} FOR {} TO {}",
        drop_policy(&table.schema, &table.name, &policy.name),
        quote_ident(&policy.name),
        table_name,
        if policy.permissive { "PERMISSIVE" } else { "RESTRICTIVE" },
        policy.command,
        roles
    );
    if let Some(ref using) = policy.using {
        sql.push_str(&format!(" USING ({})", using));
    }
    if let Some(ref with_check) = policy.with_check {
        sql.push_str(&format!(" WITH CHECK ({})", with_check));
    }
    sql.push(';');
    sql
}

pub fn drop_policy(schema: &str, table: &str, name: &str) -> String {
    format!(
        "DROP POLICY IF EXISTS {} ON {};",
        quote_ident(name),
        qualified_name(schema, table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{FkAction, IndexMethod};

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(qualified_name("public", "users"), "\"public\".\"users\"");
    }

    #[test]
    fn test_format_column_type() {
        assert_eq!(format_column_type(&Column::new("id", "integer").numeric(32, 0)), "integer");
        assert_eq!(
            format_column_type(&Column::new("name", "character varying").max_length(120)),
            "character varying(120)"
        );
        assert_eq!(format_column_type(&Column::new("total", "numeric").numeric(10, 2)), "numeric(10,2)");
        assert_eq!(format_column_type(&Column::new("ratio", "double precision").numeric(53, 0)), "double precision");
    }

    #[test]
    fn test_column_definition() {
        let column = Column::new("status", "text").not_null().default_expr("'new'::text");
        assert_eq!(column_definition(&column), "\"status\" text NOT NULL DEFAULT 'new'::text");
    }

    #[test]
    fn test_create_table_with_primary_key() {
        let table = TableInfo::new("public", "orders")
            .with_column(Column::new("id", "integer").not_null())
            .with_column(Column::new("total", "numeric").numeric(10, 2).not_null())
            .with_index(Index::new("orders_pkey", &["id"]).primary());

        assert_eq!(
            create_table(&table),
            "CREATE TABLE IF NOT EXISTS \"public\".\"orders\" (\n    \"id\" integer NOT NULL,\n    \"total\" numeric(10,2) NOT NULL,\n    PRIMARY KEY (\"id\")\n);"
        );
    }

    #[test]
    fn test_create_table_without_columns() {
        let table = TableInfo::new("public", "marker");
        assert_eq!(create_table(&table), "CREATE TABLE IF NOT EXISTS \"public\".\"marker\" (\n);");
    }

    #[test]
    fn test_create_index_keeps_expressions() {
        let table = TableInfo::new("public", "users");
        let index = Index::new("users_lower_email_idx", &["lower((email)::text)", "tenant_id"])
            .unique()
            .using(IndexMethod::Btree);
        assert_eq!(
            create_index(&table, &index),
            "CREATE UNIQUE INDEX IF NOT EXISTS \"users_lower_email_idx\" ON \"public\".\"users\" USING btree (lower((email)::text), \"tenant_id\");"
        );
    }

    #[test]
    fn test_composite_foreign_key() {
        let table = TableInfo::new("public", "lines");
        let fks = vec![
            ForeignKey::new("lines_order_fk", "order_id", "public", "orders", "id").on_delete(FkAction::Cascade),
            ForeignKey::new("lines_order_fk", "order_rev", "public", "orders", "rev").on_delete(FkAction::Cascade),
        ];
        let groups = group_foreign_keys(&fks);
        assert_eq!(groups.len(), 1);
        assert_eq!(
            add_foreign_key(&table, &groups[0], true),
            "ALTER TABLE \"public\".\"lines\" ADD CONSTRAINT \"lines_order_fk\" FOREIGN KEY (\"order_id\", \"order_rev\") REFERENCES \"public\".\"orders\" (\"id\", \"rev\") ON DELETE CASCADE ON UPDATE NO ACTION DEFERRABLE INITIALLY DEFERRED;"
        );
    }

    #[test]
    fn test_check_expression() {
        assert_eq!(check_expression("(qty > 0)"), "CHECK ((qty > 0))");
        assert_eq!(check_expression("CHECK ((qty > 0))"), "CHECK ((qty > 0))");
    }

    #[test]
    fn test_create_enum_is_guarded() {
        let mood = EnumType {
            schema: "public".to_string(),
            name: "mood".to_string(),
            values: vec!["sad".to_string(), "it's ok".to_string()],
        };
        assert_eq!(
            create_enum(&mood),
            "DO $$ BEGIN\n    CREATE TYPE \"public\".\"mood\" AS ENUM ('sad', 'it''s ok');\nEXCEPTION\n    WHEN duplicate_object THEN null;\nEND $$;"
        );
    }
}
