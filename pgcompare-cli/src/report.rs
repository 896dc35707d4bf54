//! Terminal rendering of a diff

use colored::Colorize;
use pgcompare::summary::{HealthReport, Severity};
use pgcompare::SchemaDiff;

/// Plain-text comparison report
pub fn render_text(diff: &SchemaDiff) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n{}\n\n", "📊 Schema Comparison".bold()));

    if diff.is_empty() {
        out.push_str(&format!("{}\n", "✅ Schemas are identical".green()));
    }

    section(&mut out, "Tables only in source", diff.tables_only_in_source.iter().map(|t| t.key()));
    section(&mut out, "Tables only in target", diff.tables_only_in_target.iter().map(|t| t.key()));

    for table in &diff.tables_in_both {
        out.push_str(&format!("{} {}\n", "≠".yellow(), table.key().bold()));
        for column in &table.columns_only_in_source {
            out.push_str(&format!("    - column {} only in source\n", column.name));
        }
        for column in &table.columns_only_in_target {
            out.push_str(&format!("    + column {} only in target\n", column.name));
        }
        for column in &table.columns_with_differences {
            let changes: Vec<String> = column.changes.iter().map(|c| c.describe()).collect();
            let line = format!("    ~ column {}: {}", column.name, changes.join(", "));
            if column.critical {
                out.push_str(&format!("{} {}\n", line.red(), "(critical)".red().bold()));
            } else {
                out.push_str(&format!("{}\n", line));
            }
        }
        for index in &table.indexes_only_in_source {
            out.push_str(&format!("    - index {} only in source\n", index.name));
        }
        for index in &table.indexes_only_in_target {
            out.push_str(&format!("    + index {} only in target\n", index.name));
        }
        for fk in &table.foreign_keys_only_in_source {
            out.push_str(&format!("    - foreign key {} only in source\n", fk.name));
        }
        for fk in &table.foreign_keys_only_in_target {
            out.push_str(&format!("    + foreign key {} only in target\n", fk.name));
        }
        for constraint in &table.constraints_only_in_source {
            out.push_str(&format!("    - constraint {} only in source\n", constraint.name));
        }
        for constraint in &table.constraints_only_in_target {
            out.push_str(&format!("    + constraint {} only in target\n", constraint.name));
        }
    }

    let health = HealthReport::from_diff(diff);
    out.push_str(&format!("\n📈 Health: {}/100 ({})\n", health.score, severity(health.severity)));
    for check in &health.checks {
        let mark = if check.passed { "✓".green() } else { "✗".red() };
        out.push_str(&format!("  {} {}\n", mark, check.name));
    }
    out
}

fn section(out: &mut String, title: &str, keys: impl Iterator<Item = String>) {
    let keys: Vec<String> = keys.collect();
    if keys.is_empty() {
        return;
    }
    out.push_str(&format!("{} ({}):\n", title, keys.len()));
    for key in keys {
        out.push_str(&format!("  • {}\n", key));
    }
    out.push('\n');
}

fn severity(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Healthy => severity.label().green(),
        Severity::Minor => severity.label().yellow(),
        Severity::Moderate | Severity::Critical => severity.label().red(),
    }
}
