//! Dependency ordering for table creation
//!
//! This module provides functionality to:
//! - Build a foreign key dependency graph over a working set of tables
//! - Topologically sort tables by their dependencies (Kahn's algorithm)
//! - Enumerate circular dependencies (strongly connected components)
//! - Report foreign keys that point outside the working set

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::diff::TableRef;
use crate::snapshot::Snapshot;

/// Table key -> keys of the tables it references
///
/// Ordered maps keep every traversal stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Build the graph for `tables`, reading their foreign keys from `snapshot`
    ///
    /// Only references to tables inside `tables` become edges; anything else
    /// already exists and needs no ordering. Self references are dropped.
    pub fn build(tables: &[TableRef], snapshot: &Snapshot) -> Self {
        let working_set: HashSet<String> = tables.iter().map(TableRef::key).collect();
        let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for table_ref in tables {
            let key = table_ref.key();
            let dependencies = edges.entry(key.clone()).or_default();
            let Some(table) = snapshot.table(&key) else {
                continue;
            };
            for fk in &table.foreign_keys {
                let referenced = fk.referenced_key();
                if referenced != key && working_set.contains(&referenced) {
                    dependencies.insert(referenced);
                }
            }
        }

        Self { edges }
    }

    /// Build a graph from explicit `(table, dependencies)` pairs
    ///
    /// Dependencies that are not listed as tables are added as nodes.
    /// Self loops are kept.
    pub fn from_edges<'a, I, D>(edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator<Item = &'a str>,
    {
        let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (table, dependencies) in edges {
            let dependencies: BTreeSet<String> = dependencies.into_iter().map(str::to_string).collect();
            for dependency in &dependencies {
                graph.entry(dependency.clone()).or_default();
            }
            graph.entry(table.to_string()).or_default().extend(dependencies);
        }
        Self { edges: graph }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.edges.contains_key(key)
    }

    /// Tables `key` depends on
    pub fn dependencies(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(key)
    }

    /// Node keys in lexical order
    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.edges.keys()
    }
}

/// Outcome of [`topological_sort`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortResult {
    /// Tables in creation order: dependencies first, dependents last
    pub sorted: Vec<String>,
    pub has_cycles: bool,
    /// Tables that could not be placed: members of a cycle or dependent on one
    pub unsortable: BTreeSet<String>,
}

/// Topologically sort tables by their dependencies
///
/// When several tables are ready at once they are taken in key order, so the
/// result is stable for a given graph.
pub fn topological_sort(graph: &DependencyGraph) -> SortResult {
    // Build reverse graph: if A depends on B, then B has A as a dependent
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();

    for (table, dependencies) in &graph.edges {
        in_degree.insert(table.as_str(), dependencies.len());
        dependents.entry(table.as_str()).or_default();
    }
    for (table, dependencies) in &graph.edges {
        for dependency in dependencies {
            dependents.entry(dependency.as_str()).or_default().push(table.as_str());
        }
    }

    // Tables with no dependencies can be created first
    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(table, _)| *table)
        .collect();

    let mut sorted = Vec::with_capacity(graph.len());
    while let Some(current) = queue.pop_front() {
        sorted.push(current.to_string());

        for &dependent in dependents.get(current).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    let placed: HashSet<&str> = sorted.iter().map(String::as_str).collect();
    let unsortable: BTreeSet<String> = graph
        .nodes()
        .filter(|node| !placed.contains(node.as_str()))
        .cloned()
        .collect();

    SortResult {
        has_cycles: !unsortable.is_empty(),
        sorted,
        unsortable,
    }
}

/// Enumerate circular dependencies
///
/// Returns each strongly connected component with more than one table, plus
/// single tables that reference themselves. Iterative Tarjan, so deep graphs
/// cannot overflow the stack. Members of a cycle and the list of cycles are
/// both sorted.
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Vec<String>> {
    let nodes: Vec<&String> = graph.nodes().collect();
    let position: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.as_str(), i))
        .collect();
    let adjacency: Vec<Vec<usize>> = nodes
        .iter()
        .map(|node| {
            graph.edges[*node]
                .iter()
                .filter_map(|dep| position.get(dep.as_str()).copied())
                .collect()
        })
        .collect();

    let mut index: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut lowlink = vec![0usize; nodes.len()];
    let mut on_stack = vec![false; nodes.len()];
    let mut stack: Vec<usize> = Vec::new();
    let mut next_index = 0usize;
    let mut cycles = Vec::new();

    for start in 0..nodes.len() {
        if index[start].is_some() {
            continue;
        }

        // (node, next child to visit)
        let mut call_stack: Vec<(usize, usize)> = vec![(start, 0)];
        index[start] = Some(next_index);
        lowlink[start] = next_index;
        next_index += 1;
        stack.push(start);
        on_stack[start] = true;

        while let Some(frame) = call_stack.last_mut() {
            let node = frame.0;
            if let Some(&next) = adjacency[node].get(frame.1) {
                frame.1 += 1;
                match index[next] {
                    None => {
                        index[next] = Some(next_index);
                        lowlink[next] = next_index;
                        next_index += 1;
                        stack.push(next);
                        on_stack[next] = true;
                        call_stack.push((next, 0));
                    }
                    Some(next_idx) if on_stack[next] => {
                        lowlink[node] = lowlink[node].min(next_idx);
                    }
                    Some(_) => {}
                }
                continue;
            }

            call_stack.pop();
            if let Some(&(parent, _)) = call_stack.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[node]);
            }

            if Some(lowlink[node]) == index[node] {
                let mut component = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    component.push(member);
                    if member == node {
                        break;
                    }
                }
                let self_loop = adjacency[node].contains(&node);
                if component.len() > 1 || self_loop {
                    let mut names: Vec<String> =
                        component.into_iter().map(|i| nodes[i].clone()).collect();
                    names.sort();
                    cycles.push(names);
                }
            }
        }
    }

    cycles.sort();
    cycles
}

/// Render a cycle for diagnostics as `a -> b -> a`
pub fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => {
            let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
            parts.push(first.as_str());
            parts.join(" -> ")
        }
        None => String::new(),
    }
}

/// Foreign keys of `tables` that reference tables missing from `snapshot`
///
/// Such references are not dependency edges; callers only report them.
pub fn dangling_references(tables: &[TableRef], snapshot: &Snapshot) -> Vec<String> {
    let mut messages = Vec::new();
    for table_ref in tables {
        let Some(table) = snapshot.table(&table_ref.key()) else {
            continue;
        };
        for fk in &table.foreign_keys {
            if snapshot.table(&fk.referenced_key()).is_none() {
                messages.push(format!(
                    "Table '{}' has foreign key '{}' referencing '{}' which is not in the snapshot",
                    table.key(),
                    fk.name,
                    fk.referenced_key()
                ));
            }
        }
    }
    messages
}
