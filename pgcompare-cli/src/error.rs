use std::path::PathBuf;

use pgcompare::PgCompareError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: PgCompareError,
    },

    #[error("{0} already exists (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error(transparent)]
    Settings(#[from] PgCompareError),

    #[error("Failed to serialize settings: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}
