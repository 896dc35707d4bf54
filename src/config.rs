//! Run settings
//!
//! [`Settings`] carries the resolved options for a comparison and migration
//! run. It loads from `pgcompare.toml` (optional) with `PGCOMPARE__*`
//! environment overrides, e.g. `PGCOMPARE__MIGRATION__DRY_RUN=false`.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::PgCompareError;
use crate::migration::MigrationOptions;
use crate::summary::DiffFilters;

/// Default settings file, relative to the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "pgcompare.toml";

const ENV_PREFIX: &str = "PGCOMPARE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tables left out of both snapshots, as `schema.table` or bare `table`
    pub exclude_tables: Vec<String>,
    /// Schemas left out of both snapshots
    pub skip_schemas: Vec<String>,
    /// Where stage files are written
    pub output_dir: PathBuf,
    /// Do not write stage files that only carry a "nothing to do" sentinel
    pub skip_empty_files: bool,
    pub filters: DiffFilters,
    pub migration: MigrationOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exclude_tables: Vec::new(),
            skip_schemas: Vec::new(),
            output_dir: PathBuf::from("migrations"),
            skip_empty_files: true,
            filters: DiffFilters::default(),
            migration: MigrationOptions::default(),
        }
    }
}

impl Settings {
    /// Load from `pgcompare.toml`, falling back to env vars
    pub fn load() -> Result<Self, PgCompareError> {
        Self::load_from(DEFAULT_SETTINGS_FILE)
    }

    /// Load from `path` (optional) plus `PGCOMPARE__*` env vars
    ///
    /// A file that exists but cannot be parsed is reported and skipped, and
    /// the settings are rebuilt from the environment alone.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, PgCompareError> {
        let path = path.as_ref();
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(environment());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if path.exists() {
                    log::warn!(
                        "Failed to load settings file {}, falling back to env: {}",
                        path.display(),
                        err
                    );
                }
                Config::builder()
                    .add_source(environment())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load settings from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        let loaded: Settings = settings.try_deserialize().map_err(|e| {
            ConfigError::Message(format!("Settings could not be loaded from file or environment: {}", e))
        })?;
        log::debug!(
            "Loaded settings: {} excluded table(s), {} skipped schema(s)",
            loaded.exclude_tables.len(),
            loaded.skip_schemas.len()
        );
        Ok(loaded)
    }

    /// Whether `schema.table` is left out by `exclude_tables` or `skip_schemas`
    pub fn is_excluded(&self, schema: &str, table: &str) -> bool {
        if self.skip_schemas.iter().any(|s| s == schema) {
            return true;
        }
        let qualified = format!("{}.{}", schema, table);
        self.exclude_tables
            .iter()
            .any(|entry| *entry == qualified || *entry == table)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("exclude_tables")
        .with_list_parse_key("skip_schemas")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{Direction, TransactionScope};
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
exclude_tables = ["public.schema_migrations"]
skip_schemas = ["audit"]
output_dir = "out"
skip_empty_files = false

[filters]
critical_only = true

[migration]
direction = "target-to-source"
transaction_scope = "single"
dry_run = false
"#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.exclude_tables, vec!["public.schema_migrations"]);
        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert!(!settings.skip_empty_files);
        assert!(settings.filters.critical_only);
        assert_eq!(settings.migration.direction, Direction::TargetToSource);
        assert_eq!(settings.migration.transaction_scope, TransactionScope::Single);
        assert!(!settings.migration.dry_run);
        assert!(settings.migration.sort_dependencies);
    }

    #[test]
    fn test_broken_file_falls_back() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "exclude_tables = [unterminated").unwrap();
        let settings = Settings::load_from(file.path()).unwrap();
        assert!(settings.exclude_tables.is_empty());
    }

    #[test]
    fn test_is_excluded() {
        let settings = Settings {
            exclude_tables: vec!["public.schema_migrations".to_string(), "sessions".to_string()],
            skip_schemas: vec!["audit".to_string()],
            ..Default::default()
        };
        assert!(settings.is_excluded("public", "schema_migrations"));
        assert!(settings.is_excluded("app", "sessions"));
        assert!(settings.is_excluded("audit", "events"));
        assert!(!settings.is_excluded("public", "users"));
    }
}
