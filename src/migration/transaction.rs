//! Transaction wrapping over finished stage text

use super::{MigrationScript, TransactionScope};

/// Wrap the stages of `script` according to `scope`
///
/// - `None`: unchanged
/// - `PerFile`: every stage gets its own `BEGIN;` ... `COMMIT;`
/// - `Single`: `BEGIN;` before the first executed stage and `COMMIT;` after
///   the last one, stages in between untouched. Only valid when every stage
///   runs in the same session.
pub fn wrap_transactions(mut script: MigrationScript, scope: TransactionScope) -> MigrationScript {
    let count = script.stages.len();
    for (position, stage) in script.stages.iter_mut().enumerate() {
        let body = ensure_newline(std::mem::take(&mut stage.sql));
        stage.sql = match scope {
            TransactionScope::None => body,
            TransactionScope::PerFile => format!("BEGIN;\n\n{}\nCOMMIT;\n", body),
            TransactionScope::Single => {
                let mut sql = body;
                if position == 0 {
                    sql = format!("BEGIN;\n\n{}", sql);
                }
                if position + 1 == count {
                    sql = format!("{}\nCOMMIT;\n", sql);
                }
                sql
            }
        };
    }
    script
}

fn ensure_newline(mut sql: String) -> String {
    if !sql.is_empty() && !sql.ends_with('\n') {
        sql.push('\n');
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{MigrationScript, ScriptKind, Stage};
    use std::collections::BTreeMap;

    fn script(kind: ScriptKind) -> MigrationScript {
        let stages: BTreeMap<Stage, String> = Stage::ALL
            .iter()
            .map(|s| (*s, format!("-- {}\n", s.key())))
            .collect();
        MigrationScript::new(kind, stages)
    }

    #[test]
    fn test_none_is_identity() {
        let original = script(ScriptKind::Forward);
        assert_eq!(wrap_transactions(original.clone(), TransactionScope::None), original);
    }

    #[test]
    fn test_per_file_wraps_every_stage() {
        let wrapped = wrap_transactions(script(ScriptKind::Forward), TransactionScope::PerFile);
        for stage in wrapped.iter() {
            assert!(stage.sql.starts_with("BEGIN;\n"));
            assert!(stage.sql.ends_with("COMMIT;\n"));
        }
        assert_eq!(wrapped.get(Stage::Tables), "BEGIN;\n\n-- 3-tables\n\nCOMMIT;\n");
    }

    #[test]
    fn test_single_wraps_first_and_last() {
        let wrapped = wrap_transactions(script(ScriptKind::Forward), TransactionScope::Single);
        let schemas = wrapped.get(Stage::Schemas);
        assert!(schemas.starts_with("BEGIN;"));
        assert!(!schemas.contains("COMMIT;"));

        let policies = wrapped.get(Stage::Policies);
        assert!(!policies.contains("BEGIN;"));
        assert!(policies.ends_with("COMMIT;\n"));

        for stage in [Stage::Sequences, Stage::Tables, Stage::Indexes, Stage::Constraints] {
            let sql = wrapped.get(stage);
            assert!(!sql.contains("BEGIN;") && !sql.contains("COMMIT;"));
        }
    }

    #[test]
    fn test_single_follows_rollback_execution_order() {
        let wrapped = wrap_transactions(script(ScriptKind::Rollback), TransactionScope::Single);
        assert!(wrapped.get(Stage::Policies).starts_with("BEGIN;"));
        assert!(wrapped.get(Stage::Schemas).ends_with("COMMIT;\n"));
    }
}
