/// LockOrderGraph - edge-labelled partial lock order
///
/// Nodes are lock numbers. Each edge `a -> b` ("a acquired before b") carries
/// the set of critical sections that justify it. Ordered containers keep
/// iteration deterministic.
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use std::collections::{BTreeMap, BTreeSet};

use crate::features::concurrency_analysis::domain::{LockNum, SectionId};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockOrderGraph {
    nodes: BTreeSet<LockNum>,
    edges: BTreeMap<LockNum, BTreeMap<LockNum, BTreeSet<SectionId>>>,
}

impl LockOrderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: LockNum) {
        self.nodes.insert(node);
    }

    pub fn contains_node(&self, node: LockNum) -> bool {
        self.nodes.contains(&node)
    }

    /// Add `label` to the edge `from -> to`, creating nodes and edge as needed
    pub fn add_edge(&mut self, from: LockNum, to: LockNum, label: SectionId) {
        self.nodes.insert(from);
        self.nodes.insert(to);
        self.edges
            .entry(from)
            .or_default()
            .entry(to)
            .or_default()
            .insert(label);
    }

    pub fn contains_edge(&self, from: LockNum, to: LockNum) -> bool {
        self.labels(from, to).is_some()
    }

    pub fn successors(&self, node: LockNum) -> impl Iterator<Item = LockNum> + '_ {
        self.edges
            .get(&node)
            .into_iter()
            .flat_map(|targets| targets.keys().copied())
    }

    /// Sections labelling `from -> to`, None if the edge is absent
    pub fn labels(&self, from: LockNum, to: LockNum) -> Option<&BTreeSet<SectionId>> {
        self.edges.get(&from).and_then(|targets| targets.get(&to))
    }

    /// Edges carrying `label`
    pub fn edges_for_label(&self, label: SectionId) -> Vec<(LockNum, LockNum)> {
        self.edges()
            .filter(|(_, _, labels)| labels.contains(&label))
            .map(|(from, to, _)| (from, to))
            .collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = (LockNum, LockNum, &BTreeSet<SectionId>)> + '_ {
        self.edges.iter().flat_map(|(&from, targets)| {
            targets.iter().map(move |(&to, labels)| (from, to, labels))
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = LockNum> + '_ {
        self.nodes.iter().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    /// Unlabelled view for petgraph algorithms
    pub fn to_digraph(&self) -> DiGraphMap<LockNum, ()> {
        let mut graph = DiGraphMap::with_capacity(self.node_count(), self.edge_count());
        for &node in &self.nodes {
            graph.add_node(node);
        }
        for (from, to, _) in self.edges() {
            graph.add_edge(from, to, ());
        }
        graph
    }

    /// True if the raw (unfiltered) order has a cycle
    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.to_digraph())
    }
}
