//! Dependency graph over stat identities.
//!
//! Used in two places: the reference validator checks that stat matcher
//! tables never refer to themselves through a chain of references, and the
//! stat dependency graph checks that no registered formula reads a stat
//! which, through other formulas, reads it back.

use crate::error::CompileError;
use crate::stat_id::StatId;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// A directed graph of "depends on" edges between stat identities.
///
/// Edges point from a dependency to its dependent, so a topological order
/// lists dependencies first.
///
/// # Examples
///
/// ```rust
/// use zzmod::graph::DependencyGraph;
/// use zzmod::StatId;
///
/// let mut graph = DependencyGraph::new();
/// let life = StatId::from_str("Life");
/// let strength = StatId::from_str("Strength");
///
/// // Life depends on Strength
/// graph.add_edge(life.clone(), strength.clone());
///
/// let order = graph.topological_sort().unwrap();
/// assert_eq!(order, vec![strength, life]);
/// ```
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<StatId, ()>,
    node_map: HashMap<StatId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Add `id` unless present; returns its node index either way.
    pub fn add_node(&mut self, id: StatId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.node_map.insert(id, idx);
        idx
    }

    /// Record that `from` depends on `to`. Missing nodes are added.
    ///
    /// Adding the same edge twice keeps a single edge.
    pub fn add_edge(&mut self, from: StatId, to: StatId) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);
        self.graph.update_edge(to_idx, from_idx, ());
    }

    /// Fail with the first cycle found.
    ///
    /// The returned path is closed: its first and last element are the same
    /// identity, and it holds only the identities on the cycle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use zzmod::graph::DependencyGraph;
    /// use zzmod::{CompileError, StatId};
    ///
    /// let mut graph = DependencyGraph::new();
    /// let a = StatId::from_str("Evasion");
    /// let b = StatId::from_str("Armour");
    ///
    /// graph.add_edge(a.clone(), b.clone());
    /// assert!(graph.detect_cycles().is_ok());
    ///
    /// graph.add_edge(b.clone(), a.clone());
    /// let Err(CompileError::Cycle { path }) = graph.detect_cycles() else {
    ///     panic!("expected a cycle");
    /// };
    /// assert_eq!(path.len(), 3);
    /// assert_eq!(path[0], path[2]);
    /// ```
    pub fn detect_cycles(&self) -> Result<(), CompileError> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();

        for node in self.graph.node_indices() {
            if visited.contains(&node) {
                continue;
            }
            let mut path = Vec::new();
            if let Some(cycle) = self.find_cycle(node, &mut visited, &mut on_stack, &mut path) {
                return Err(CompileError::Cycle { path: cycle });
            }
        }
        Ok(())
    }

    fn find_cycle(
        &self,
        node: NodeIndex,
        visited: &mut HashSet<NodeIndex>,
        on_stack: &mut HashSet<NodeIndex>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<StatId>> {
        visited.insert(node);
        on_stack.insert(node);
        path.push(node);

        for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
            if on_stack.contains(&next) {
                let start = path.iter().position(|&n| n == next).unwrap_or(0);
                let mut cycle: Vec<StatId> = path[start..]
                    .iter()
                    .map(|&n| self.graph[n].clone())
                    .collect();
                cycle.push(self.graph[next].clone());
                return Some(cycle);
            }
            if !visited.contains(&next) {
                if let Some(cycle) = self.find_cycle(next, visited, on_stack, path) {
                    return Some(cycle);
                }
            }
        }

        on_stack.remove(&node);
        path.pop();
        None
    }

    /// All identities, dependencies before dependents.
    pub fn topological_sort(&self) -> Result<Vec<StatId>, CompileError> {
        self.detect_cycles()?;
        toposort(&self.graph, None)
            .map(|indices| {
                indices
                    .into_iter()
                    .map(|idx| self.graph[idx].clone())
                    .collect()
            })
            .map_err(|cycle| CompileError::Cycle {
                path: vec![self.graph[cycle.node_id()].clone()],
            })
    }

    pub fn nodes(&self) -> Vec<StatId> {
        self.graph
            .node_indices()
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    pub fn contains_node(&self, id: &StatId) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Direct dependencies of `id`.
    pub fn dependencies_of(&self, id: &StatId) -> Vec<StatId> {
        self.node_map
            .get(id)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The subgraph of `targets` and everything they transitively depend on.
    ///
    /// Targets that are not in the graph are skipped.
    pub fn subgraph_for_targets(&self, targets: &[StatId]) -> DependencyGraph {
        let mut subgraph = DependencyGraph::new();
        let mut visited = HashSet::new();
        let mut stack: Vec<StatId> = targets.to_vec();

        while let Some(id) = stack.pop() {
            if !visited.insert(id.clone()) || !self.contains_node(&id) {
                continue;
            }
            subgraph.add_node(id.clone());
            for dependency in self.dependencies_of(&id) {
                subgraph.add_edge(id.clone(), dependency.clone());
                if !visited.contains(&dependency) {
                    stack.push(dependency);
                }
            }
        }
        subgraph
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> StatId {
        StatId::from_str(name)
    }

    fn cycle_path(graph: &DependencyGraph) -> Vec<StatId> {
        match graph.detect_cycles() {
            Err(CompileError::Cycle { path }) => path,
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut graph = DependencyGraph::new();
        let first = graph.add_node(id("Life"));
        let second = graph.add_node(id("Life"));
        assert_eq!(first, second);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_add_edge_adds_both_ends() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id("Life"), id("Strength"));
        assert!(graph.contains_node(&id("Life")));
        assert!(graph.contains_node(&id("Strength")));
        assert_eq!(graph.dependencies_of(&id("Life")), vec![id("Strength")]);
        assert!(graph.dependencies_of(&id("Strength")).is_empty());
    }

    #[test]
    fn test_chain_has_no_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id("Life"), id("Strength"));
        graph.add_edge(id("Life.Regen"), id("Life"));
        assert!(graph.detect_cycles().is_ok());
    }

    #[test]
    fn test_topological_order_puts_dependencies_first() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id("Life"), id("Strength"));
        graph.add_edge(id("Evasion"), id("Dexterity"));
        let order = graph.topological_sort().unwrap();
        let pos = |name: &str| order.iter().position(|s| *s == id(name)).unwrap();
        assert!(pos("Strength") < pos("Life"));
        assert!(pos("Dexterity") < pos("Evasion"));
    }

    #[test]
    fn test_topological_sort_fails_on_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id("A"), id("B"));
        graph.add_edge(id("B"), id("A"));
        assert!(matches!(
            graph.topological_sort(),
            Err(CompileError::Cycle { .. })
        ));
    }

    #[test]
    fn test_cycle_path_is_closed_and_minimal() {
        let mut graph = DependencyGraph::new();
        // Lead-in X -> Y -> A, then A -> B -> C -> A.
        graph.add_edge(id("Y"), id("X"));
        graph.add_edge(id("A"), id("Y"));
        graph.add_edge(id("B"), id("A"));
        graph.add_edge(id("C"), id("B"));
        graph.add_edge(id("A"), id("C"));

        let path = cycle_path(&graph);
        assert_eq!(path.len(), 4);
        assert_eq!(path.first(), path.last());
        assert!(!path.contains(&id("X")));
        assert!(!path.contains(&id("Y")));
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id("Mana"), id("Mana"));
        assert_eq!(cycle_path(&graph), vec![id("Mana"), id("Mana")]);
    }

    #[test]
    fn test_cycle_detection_is_deterministic() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id("B"), id("A"));
        graph.add_edge(id("C"), id("B"));
        graph.add_edge(id("A"), id("C"));
        assert_eq!(cycle_path(&graph), cycle_path(&graph));
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id("Life"), id("Strength"));
        graph.add_edge(id("Life"), id("Strength"));
        assert_eq!(graph.dependencies_of(&id("Life")).len(), 1);
    }

    #[test]
    fn test_subgraph_follows_dependencies_only() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(id("Mid1"), id("Base"));
        graph.add_edge(id("Mid2"), id("Base"));
        graph.add_edge(id("Top1"), id("Mid1"));
        graph.add_edge(id("Top2"), id("Mid2"));

        let subgraph = graph.subgraph_for_targets(&[id("Top1"), id("Missing")]);
        let mut nodes = subgraph.nodes();
        nodes.sort();
        assert_eq!(nodes, vec![id("Base"), id("Mid1"), id("Top1")]);
        assert!(subgraph.detect_cycles().is_ok());
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::default();
        assert!(graph.is_empty());
        assert!(graph.topological_sort().unwrap().is_empty());
        assert!(graph.subgraph_for_targets(&[]).is_empty());
    }
}
