//! Error types for the fallible edges of the crate
//!
//! Comparison, dependency ordering and SQL generation are total functions
//! and never fail. Errors only come from loading settings or parsing a
//! snapshot handed over by the extraction layer.

/// pgcompare errors
#[derive(Debug)]
pub enum PgCompareError {
    /// Settings could not be loaded
    Config(config::ConfigError),
    /// Snapshot JSON is malformed
    Snapshot(serde_json::Error),
    /// Filesystem error while reading input
    Io(std::io::Error),
}

impl std::fmt::Display for PgCompareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PgCompareError::Config(e) => write!(f, "Configuration error: {}", e),
            PgCompareError::Snapshot(e) => {
                write!(
                    f,
                    "Invalid schema snapshot: {}\n\
                     Suggestion: regenerate the snapshot with the metadata extractor",
                    e
                )
            }
            PgCompareError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PgCompareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PgCompareError::Config(e) => Some(e),
            PgCompareError::Snapshot(e) => Some(e),
            PgCompareError::Io(e) => Some(e),
        }
    }
}

impl From<config::ConfigError> for PgCompareError {
    fn from(error: config::ConfigError) -> Self {
        PgCompareError::Config(error)
    }
}

impl From<serde_json::Error> for PgCompareError {
    fn from(error: serde_json::Error) -> Self {
        PgCompareError::Snapshot(error)
    }
}

impl From<std::io::Error> for PgCompareError {
    fn from(error: std::io::Error) -> Self {
        PgCompareError::Io(error)
    }
}
