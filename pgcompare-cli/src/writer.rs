//! Stage file output

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use pgcompare::migration::{is_empty_stage, MigrationScript, ScriptKind};
use pgcompare::TransactionScope;

use crate::error::CliError;

/// How stage files are written
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Leave out stages that only carry their "nothing to do" comment
    pub skip_empty_files: bool,
    pub transaction_scope: TransactionScope,
}

/// Write one `<stage key>.sql` per stage into `dir`, returning the paths written
///
/// Rollbacks go to `dir/rollback`. Empty stages are never skipped under the
/// single transaction scope: the first and last files carry `BEGIN;` and
/// `COMMIT;`.
pub fn write_script(script: &MigrationScript, dir: &Path, options: &WriteOptions) -> Result<Vec<PathBuf>, CliError> {
    let dir = match script.kind {
        ScriptKind::Rollback => dir.join("rollback"),
        ScriptKind::Forward | ScriptKind::Dump => dir.to_path_buf(),
    };
    fs::create_dir_all(&dir).map_err(|source| CliError::Write {
        path: dir.clone(),
        source,
    })?;

    let skip_empty = options.skip_empty_files && options.transaction_scope != TransactionScope::Single;
    let generated = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let mut written = Vec::new();

    for stage in script.iter() {
        if skip_empty && is_empty_stage(&stage.sql) {
            log::debug!("Skipping empty stage {}", stage.stage.key());
            continue;
        }

        let path = dir.join(format!("{}.sql", stage.stage.key()));
        let content = format!(
            "-- pgcompare {} stage {}\n-- Generated: {}\n\n{}",
            kind_label(script.kind),
            stage.stage.key(),
            generated,
            stage.sql
        );
        fs::write(&path, content).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }

    Ok(written)
}

fn kind_label(kind: ScriptKind) -> &'static str {
    match kind {
        ScriptKind::Forward => "migration",
        ScriptKind::Rollback => "rollback",
        ScriptKind::Dump => "dump",
    }
}

/// `path` relative to the working directory, for messages
pub fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff::diff_paths(path, cwd))
        .filter(|relative| !relative.as_os_str().is_empty())
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
