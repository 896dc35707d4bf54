//! Snapshot loading
//!
//! Snapshots arrive as JSON files written by the metadata extractor. The
//! exclusions from [`Settings`] are applied here, before anything reaches
//! the comparator.

use std::fs;
use std::path::Path;

use pgcompare::{Settings, Snapshot};

use crate::error::CliError;

/// Read a snapshot file and drop everything `settings` excludes
pub fn load_snapshot(path: &Path, settings: &Settings) -> Result<Snapshot, CliError> {
    let json = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot = Snapshot::from_json(&json).map_err(|source| CliError::Snapshot {
        path: path.to_path_buf(),
        source,
    })?;

    let total = snapshot.tables.len();
    let snapshot = apply_exclusions(snapshot, settings);
    log::info!(
        "Loaded {} ({} table(s), {} excluded)",
        path.display(),
        snapshot.tables.len(),
        total - snapshot.tables.len()
    );
    Ok(snapshot)
}

/// Remove excluded tables, and every object of a skipped schema
pub fn apply_exclusions(mut snapshot: Snapshot, settings: &Settings) -> Snapshot {
    snapshot.tables.retain(|key, table| {
        let excluded = settings.is_excluded(&table.schema, &table.name);
        if excluded {
            log::debug!("Excluding table {}", key);
        }
        !excluded
    });

    let skipped = |schema: &str| settings.skip_schemas.iter().any(|s| s == schema);
    snapshot.enums.retain(|e| !skipped(&e.schema));
    snapshot.functions.retain(|f| !skipped(&f.schema));
    snapshot
}
