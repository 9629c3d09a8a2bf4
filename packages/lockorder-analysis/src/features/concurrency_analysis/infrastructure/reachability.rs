//! Incremental reachability for cycle checks
//!
//! Before an order edge `a -> b` is inserted, the detector asks whether `b`
//! already reaches `a`. Two interchangeable strategies answer that:
//!
//! - `SuccessorExpansion`: walks the successor graph on every query, O(V + E)
//! - `TransitiveClosure`: keeps a reach set per node, O(1) queries and
//!   O(V) set unions per inserted edge
//!
//! Both treat reachability as a path of one or more edges, so a node only
//! reaches itself through a cycle.

use petgraph::graphmap::{DiGraphMap, NodeTrait};
use petgraph::Direction;
use rustc_hash::{FxHashMap, FxHashSet};
use std::hash::Hash;

use crate::config::ReachabilityStrategy;

pub trait Reachability<N> {
    fn insert_edge(&mut self, from: N, to: N);

    /// True if a path of at least one edge leads from `from` to `to`
    fn is_reachable(&self, from: N, to: N) -> bool;
}

/// Build the strategy selected in config
pub fn reachability_for<N>(strategy: ReachabilityStrategy) -> Box<dyn Reachability<N>>
where
    N: NodeTrait + 'static,
{
    match strategy {
        ReachabilityStrategy::SuccessorExpansion => Box::new(SuccessorExpansion::new()),
        ReachabilityStrategy::TransitiveClosure => Box::new(TransitiveClosure::new()),
    }
}

/// Recomputes reachability from the successor graph on each query
#[derive(Debug, Clone)]
pub struct SuccessorExpansion<N: NodeTrait> {
    graph: DiGraphMap<N, ()>,
}

impl<N: NodeTrait> SuccessorExpansion<N> {
    pub fn new() -> Self {
        Self {
            graph: DiGraphMap::new(),
        }
    }
}

impl<N: NodeTrait> Default for SuccessorExpansion<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeTrait> Reachability<N> for SuccessorExpansion<N> {
    fn insert_edge(&mut self, from: N, to: N) {
        self.graph.add_edge(from, to, ());
    }

    fn is_reachable(&self, from: N, to: N) -> bool {
        if !self.graph.contains_node(from) {
            return false;
        }
        let mut seen: FxHashSet<N> = FxHashSet::default();
        let mut stack: Vec<N> = self
            .graph
            .neighbors_directed(from, Direction::Outgoing)
            .collect();
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if seen.insert(node) {
                stack.extend(self.graph.neighbors_directed(node, Direction::Outgoing));
            }
        }
        false
    }
}

/// Incrementally maintained transitive closure
#[derive(Debug, Clone)]
pub struct TransitiveClosure<N> {
    reach: FxHashMap<N, FxHashSet<N>>,
}

impl<N: Copy + Eq + Hash> TransitiveClosure<N> {
    pub fn new() -> Self {
        Self {
            reach: FxHashMap::default(),
        }
    }

    /// Nodes reachable from `from` by one or more edges
    pub fn reachable_from(&self, from: N) -> impl Iterator<Item = N> + '_ {
        self.reach.get(&from).into_iter().flat_map(|set| set.iter().copied())
    }
}

impl<N: Copy + Eq + Hash> Default for TransitiveClosure<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Copy + Eq + Hash> Reachability<N> for TransitiveClosure<N> {
    fn insert_edge(&mut self, from: N, to: N) {
        let mut gained: FxHashSet<N> = self.reach.get(&to).cloned().unwrap_or_default();
        gained.insert(to);
        self.reach.entry(from).or_default();
        self.reach.entry(to).or_default();

        // everything that reaches `from` (and `from` itself) now reaches `to`'s closure
        let sources: Vec<N> = self
            .reach
            .iter()
            .filter(|(node, set)| **node == from || set.contains(&from))
            .map(|(node, _)| *node)
            .collect();
        for source in sources {
            if let Some(set) = self.reach.get_mut(&source) {
                set.extend(gained.iter().copied());
            }
        }
    }

    fn is_reachable(&self, from: N, to: N) -> bool {
        self.reach.get(&from).is_some_and(|set| set.contains(&to))
    }
}
