//! # pgcompare
//!
//! Structural comparison of two PostgreSQL schema snapshots and generation of
//! ordered, dependency-aware migration scripts.
//!
//! The pipeline is pure: two [`Snapshot`]s go into [`compare`], the
//! resulting [`SchemaDiff`] feeds [`migration::generate`] and the
//! [`summary`] reductions. Reading catalogs and writing files is left to the
//! caller (see the `pgcompare-cli` crate).

pub mod compare;
pub mod config;
pub mod dependency;
pub mod diff;
pub mod error;
pub mod migration;
pub mod snapshot;
pub mod summary;

pub use compare::compare;
pub use config::Settings;
pub use diff::{ColumnDiff, SchemaDiff, Side, TableDiff, TableRef};
pub use error::PgCompareError;
pub use migration::{Direction, MigrationOptions, MigrationScript, Stage, TransactionScope};
pub use snapshot::{Snapshot, TableInfo};
