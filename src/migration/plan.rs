//! Resolve a diff into the concrete objects one direction creates
//!
//! The forward and rollback emitters share this view so a rollback undoes
//! exactly what the matching forward script does.

use std::collections::{BTreeSet, HashSet};

use super::{Direction, MigrationOptions};
use crate::dependency::{self, find_cycles, format_cycle, topological_sort, DependencyGraph};
use crate::diff::{SchemaDiff, Side, TableDiff, TableRef};
use crate::snapshot::{
    Column, Constraint, ConstraintKind, EnumType, Extension, ForeignKey, Function, Index, Policy, SequenceInfo,
    Snapshot, TableInfo, Trigger,
};

/// A table present in both snapshots
pub(crate) struct CommonTable<'a> {
    /// From-side table (where the new objects live)
    pub from: &'a TableInfo,
    pub to: &'a TableInfo,
    /// Recorded differences, if the comparator found any
    pub diff: Option<&'a TableDiff>,
}

/// Creation order of new tables
pub(crate) struct TableOrder<'a> {
    /// Created in a single pass, foreign keys in the constraints stage
    pub ordered: Vec<&'a TableInfo>,
    /// Created in two phases with deferred foreign keys
    pub cyclic: Vec<&'a TableInfo>,
    /// Diagnostic cycles, rendered as `a -> b -> a`
    pub cycles: Vec<String>,
    /// Cycles exist but two-phase creation is disabled
    pub unhandled_cycles: bool,
}

pub(crate) struct ChangeSet<'a> {
    pub side: Side,
    pub from: &'a Snapshot,
    pub to: &'a Snapshot,
    pub new_tables: TableOrder<'a>,
    pub common: Vec<CommonTable<'a>>,
    cyclic_keys: HashSet<String>,
}

impl<'a> ChangeSet<'a> {
    pub fn resolve(
        diff: &'a SchemaDiff,
        source: &'a Snapshot,
        target: &'a Snapshot,
        options: &MigrationOptions,
    ) -> Self {
        let (from, to) = match options.direction {
            Direction::SourceToTarget => (source, target),
            Direction::TargetToSource => (target, source),
        };
        let side = options.direction.from_side();

        let new_refs = diff.tables_only_in(side);
        let new_tables = order_tables(new_refs, from, options);
        let cyclic_keys = new_tables.cyclic.iter().map(|t| t.key()).collect();

        let diffs = diff.tables_by_key();
        let common = from
            .sorted_keys()
            .into_iter()
            .filter_map(|key| {
                let to_table = to.table(key)?;
                let from_table = from.table(key)?;
                Some(CommonTable {
                    from: from_table,
                    to: to_table,
                    diff: diffs.get(key.as_str()).copied(),
                })
            })
            .collect();

        Self {
            side,
            from,
            to,
            new_tables,
            common,
            cyclic_keys,
        }
    }

    /// All new tables in creation order (single-pass first, then cyclic)
    pub fn all_new_tables(&self) -> impl Iterator<Item = &'a TableInfo> + '_ {
        self.new_tables
            .ordered
            .iter()
            .chain(self.new_tables.cyclic.iter())
            .copied()
    }

    /// Whether a new table's foreign keys are added by the two-phase block
    pub fn is_two_phase(&self, table: &TableInfo) -> bool {
        self.cyclic_keys.contains(&table.key())
    }

    /// Schemas of new objects that the other side lacks
    pub fn new_schemas(&self) -> Vec<String> {
        let existing: HashSet<String> = self
            .to
            .schema_names()
            .into_iter()
            .chain(self.to.enums.iter().map(|e| e.schema.clone()))
            .chain(self.to.functions.iter().map(|f| f.schema.clone()))
            .collect();
        let wanted: BTreeSet<String> = self
            .all_new_tables()
            .map(|t| t.schema.clone())
            .chain(self.new_enums().into_iter().map(|e| e.schema.clone()))
            .chain(self.new_functions().into_iter().map(|f| f.schema.clone()))
            .collect();
        wanted.into_iter().filter(|s| !existing.contains(s)).collect()
    }

    pub fn new_extensions(&self) -> Vec<&'a Extension> {
        let existing: HashSet<&str> = self.to.extensions.iter().map(|e| e.name.as_str()).collect();
        let mut extensions: Vec<&Extension> = self
            .from
            .extensions
            .iter()
            .filter(|e| !existing.contains(e.name.as_str()))
            .collect();
        extensions.sort_by(|a, b| a.name.cmp(&b.name));
        extensions
    }

    pub fn new_enums(&self) -> Vec<&'a EnumType> {
        let existing: HashSet<(&str, &str)> = self
            .to
            .enums
            .iter()
            .map(|e| (e.schema.as_str(), e.name.as_str()))
            .collect();
        let mut enums: Vec<&EnumType> = self
            .from
            .enums
            .iter()
            .filter(|e| !existing.contains(&(e.schema.as_str(), e.name.as_str())))
            .collect();
        enums.sort_by(|a, b| (&a.schema, &a.name).cmp(&(&b.schema, &b.name)));
        enums
    }

    pub fn new_functions(&self) -> Vec<&'a Function> {
        let existing: HashSet<String> = self.to.functions.iter().map(Function::signature).collect();
        let mut functions: Vec<&Function> = self
            .from
            .functions
            .iter()
            .filter(|f| !existing.contains(&f.signature()))
            .collect();
        functions.sort_by_key(|f| f.signature());
        functions
    }

    /// (owning table, sequence) pairs to create
    pub fn new_sequences(&self) -> Vec<(&'a TableInfo, &'a SequenceInfo)> {
        let mut sequences: Vec<(&TableInfo, &SequenceInfo)> = self
            .all_new_tables()
            .flat_map(|table| table.sequences.iter().map(move |s| (table, s)))
            .collect();
        for common in &self.common {
            let existing: HashSet<&str> = common.to.sequences.iter().map(|s| s.name.as_str()).collect();
            for sequence in &common.from.sequences {
                if !existing.contains(sequence.name.as_str()) {
                    sequences.push((common.from, sequence));
                }
            }
        }
        sequences
    }

    /// Columns to add to existing tables
    pub fn added_columns(&self) -> Vec<(&'a TableInfo, &'a Column)> {
        let side = self.side;
        self.common
            .iter()
            .filter_map(|c| c.diff.map(|d| (c.from, d)))
            .flat_map(|(table, d)| d.columns_only_in(side).iter().map(move |col| (table, col)))
            .collect()
    }

    /// Indexes to add to existing tables
    pub fn added_indexes(&self) -> Vec<(&'a TableInfo, &'a Index)> {
        let side = self.side;
        self.common
            .iter()
            .filter_map(|c| c.diff.map(|d| (c.from, d)))
            .flat_map(|(table, d)| d.indexes_only_in(side).iter().map(move |i| (table, i)))
            .collect()
    }

    /// Constraints to add to existing tables, minus UNIQUE ones backed by an index
    pub fn added_constraints(&self) -> Vec<(&'a TableInfo, &'a Constraint)> {
        let side = self.side;
        self.common
            .iter()
            .filter_map(|c| c.diff.map(|d| (c, d)))
            .flat_map(|(common, d)| {
                d.constraints_only_in(side)
                    .iter()
                    .filter(move |constraint| {
                        !has_backing_index(common.from, constraint) && !has_backing_index(common.to, constraint)
                    })
                    .map(move |constraint| (common.from, constraint))
            })
            .collect()
    }

    /// Foreign key rows to add to existing tables
    pub fn added_foreign_keys(&self) -> Vec<(&'a TableInfo, Vec<&'a ForeignKey>)> {
        let side = self.side;
        self.common
            .iter()
            .filter_map(|c| c.diff.map(|d| (c.from, d)))
            .flat_map(|(table, d)| {
                super::sql::group_foreign_keys(d.foreign_keys_only_in(side))
                    .into_iter()
                    .map(move |group| (table, group))
            })
            .collect()
    }

    pub fn added_triggers(&self) -> Vec<(&'a TableInfo, &'a Trigger)> {
        let mut triggers: Vec<(&TableInfo, &Trigger)> = self
            .all_new_tables()
            .flat_map(|table| table.triggers.iter().map(move |t| (table, t)))
            .collect();
        for common in &self.common {
            let existing: HashSet<&str> = common.to.triggers.iter().map(|t| t.name.as_str()).collect();
            for trigger in &common.from.triggers {
                if !existing.contains(trigger.name.as_str()) {
                    triggers.push((common.from, trigger));
                }
            }
        }
        triggers
    }

    pub fn added_policies(&self) -> Vec<(&'a TableInfo, &'a Policy)> {
        let mut policies: Vec<(&TableInfo, &Policy)> = self
            .all_new_tables()
            .flat_map(|table| table.policies.iter().map(move |p| (table, p)))
            .collect();
        for common in &self.common {
            let existing: HashSet<&str> = common.to.policies.iter().map(|p| p.name.as_str()).collect();
            for policy in &common.from.policies {
                if !existing.contains(policy.name.as_str()) {
                    policies.push((common.from, policy));
                }
            }
        }
        policies
    }
}

/// A UNIQUE constraint whose name is already taken by a unique index
pub(crate) fn has_backing_index(table: &TableInfo, constraint: &Constraint) -> bool {
    constraint.kind == ConstraintKind::Unique
        && table
            .index(&constraint.name)
            .is_some_and(|index| index.unique)
}

fn order_tables<'a>(refs: &[TableRef], from: &'a Snapshot, options: &MigrationOptions) -> TableOrder<'a> {
    if !options.sort_dependencies {
        let mut keys: Vec<String> = refs.iter().map(TableRef::key).collect();
        keys.sort();
        return TableOrder {
            ordered: keys.iter().filter_map(|k| from.table(k)).collect(),
            cyclic: Vec::new(),
            cycles: Vec::new(),
            unhandled_cycles: false,
        };
    }

    for message in dependency::dangling_references(refs, from) {
        log::debug!("{}", message);
    }

    let graph = DependencyGraph::build(refs, from);
    let result = topological_sort(&graph);
    let ordered: Vec<&TableInfo> = result.sorted.iter().filter_map(|k| from.table(k)).collect();
    let remaining: Vec<&TableInfo> = result.unsortable.iter().filter_map(|k| from.table(k)).collect();

    if !result.has_cycles {
        return TableOrder {
            ordered,
            cyclic: Vec::new(),
            cycles: Vec::new(),
            unhandled_cycles: false,
        };
    }

    let cycles: Vec<String> = find_cycles(&graph).iter().map(|c| format_cycle(c)).collect();
    for cycle in &cycles {
        log::warn!("Circular foreign key dependency: {}", cycle);
    }

    if options.handle_circular_deps {
        TableOrder {
            ordered,
            cyclic: remaining,
            cycles,
            unhandled_cycles: false,
        }
    } else {
        let mut ordered = ordered;
        ordered.extend(remaining);
        TableOrder {
            ordered,
            cyclic: Vec::new(),
            cycles,
            unhandled_cycles: true,
        }
    }
}
