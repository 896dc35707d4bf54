//! Full database dump
//!
//! A dump is a forward migration from `snapshot` into an empty database, so
//! it goes through exactly the same stage generation.

use super::forward;
use super::{wrap_transactions, Direction, MigrationOptions, MigrationScript, ScriptKind};
use crate::compare::compare;
use crate::snapshot::Snapshot;

/// Generate the eight stages recreating all of `snapshot`
///
/// `options.direction` is ignored; the dump always runs source to target.
pub fn generate_dump(snapshot: &Snapshot, options: &MigrationOptions) -> MigrationScript {
    let empty = Snapshot::empty();
    let diff = compare(snapshot, &empty);
    let options = MigrationOptions {
        direction: Direction::SourceToTarget,
        ..options.clone()
    };
    log::debug!("Generating dump of {} table(s)", diff.tables_only_in_source.len());

    let script = forward::build(&diff, snapshot, &empty, &options, ScriptKind::Dump);
    wrap_transactions(script, options.transaction_scope)
}
