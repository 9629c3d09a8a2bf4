/// LocksetReorderer - rewrite each lockset to follow the lock order
///
/// Each grouped section sees only the part of the order that can interleave
/// with it: edges justified by sections sharing one of its static locks are
/// hidden. Its lockset is then sorted against that visible order:
///
/// 1. Restrict the visible order to the section's own locks
/// 2. Condense strongly connected locks (Tarjan) and emit the components in
///    topological order, smallest lock number first among ready components
/// 3. Inside a component, insertion-sort in lockset order: `a` goes before
///    `b` on an edge `a -> b`, or on the lower number if neither edge exists
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use super::lock_order_graph::LockOrderGraph;
use crate::config::LockOrderConfig;
use crate::errors::Result;
use crate::features::concurrency_analysis::domain::{AnalysisContext, LockKey, LockNum, SectionId};

pub struct LocksetReorderer<'a> {
    config: &'a LockOrderConfig,
}

impl<'a> LocksetReorderer<'a> {
    pub fn new(config: &'a LockOrderConfig) -> Self {
        Self { config }
    }

    /// Reorder every grouped section's lockset in place.
    ///
    /// Returns the number of locksets whose order changed.
    pub fn reorder(&self, ctx: &mut AnalysisContext, order: &LockOrderGraph) -> Result<usize> {
        let mut changed = 0;
        let ids: Vec<SectionId> = ctx.section_ids().collect();

        for id in ids {
            if !ctx.section(id)?.is_grouped() {
                continue;
            }

            let visible = self.visible_order(ctx, order, id)?;
            detail!(
                self.config,
                "VISIBLE ORDER FOR {}: {:?}",
                ctx.section(id)?.name,
                visible.all_edges().map(|(a, b, _)| (a.0, b.0)).collect::<Vec<_>>()
            );

            let nums = ctx.lock_nums(id)?;
            let lockset = &ctx.section(id)?.lockset;
            let reordered: Vec<LockKey> = plan_order(&visible, &nums)
                .into_iter()
                .map(|idx| lockset[idx].clone())
                .collect();

            if &reordered != lockset {
                let table = ctx.lock_table();
                detail!(
                    self.config,
                    "reordered from {} to {}",
                    table.format_lockset(lockset),
                    table.format_lockset(&reordered)
                );
                ctx.replace_lockset(id, reordered)?;
                changed += 1;
            }
        }

        Ok(changed)
    }

    /// Edges of `order` observable from `tn`
    pub fn visible_order(
        &self,
        ctx: &AnalysisContext,
        order: &LockOrderGraph,
        tn: SectionId,
    ) -> Result<DiGraphMap<LockNum, ()>> {
        let static_locks: Vec<LockNum> = ctx
            .lock_nums(tn)?
            .into_iter()
            .filter(|num| num.is_static())
            .collect();

        let mut visible = DiGraphMap::new();
        for other in ctx.section_ids() {
            let shares_static_lock = if other == tn || static_locks.is_empty() {
                false
            } else if !ctx.section(other)?.is_grouped() {
                // unlocked sections have no edges; treat them as excluded
                true
            } else {
                let other_locks = ctx.lock_nums(other)?;
                static_locks.iter().any(|num| other_locks.contains(num))
            };
            if shares_static_lock {
                continue;
            }

            for (from, to) in order.edges_for_label(other) {
                visible.add_edge(from, to, ());
            }
        }
        Ok(visible)
    }
}

/// Permutation of lockset positions following `visible`
fn plan_order(visible: &DiGraphMap<LockNum, ()>, nums: &[LockNum]) -> Vec<usize> {
    let edge = |a: LockNum, b: LockNum| a != b && visible.contains_edge(a, b);

    let mut induced: DiGraphMap<LockNum, ()> = DiGraphMap::new();
    for &a in nums {
        induced.add_node(a);
        for &b in nums {
            if edge(a, b) {
                induced.add_edge(a, b, ());
            }
        }
    }

    let components = tarjan_scc(&induced);
    let mut component_of: BTreeMap<LockNum, usize> = BTreeMap::new();
    for (idx, component) in components.iter().enumerate() {
        for &num in component {
            component_of.insert(num, idx);
        }
    }

    // Kahn over the condensation, smallest member lock first
    let mut in_degree = vec![0usize; components.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); components.len()];
    for (a, b, _) in induced.all_edges() {
        let (ca, cb) = (component_of[&a], component_of[&b]);
        if ca != cb && !successors[ca].contains(&cb) {
            successors[ca].push(cb);
            in_degree[cb] += 1;
        }
    }
    let min_member = |idx: usize| components[idx].iter().min().copied();
    let mut ready: BinaryHeap<Reverse<(Option<LockNum>, usize)>> = (0..components.len())
        .filter(|&idx| in_degree[idx] == 0)
        .map(|idx| Reverse((min_member(idx), idx)))
        .collect();

    let mut plan = Vec::with_capacity(nums.len());
    while let Some(Reverse((_, idx))) = ready.pop() {
        let mut members: Vec<usize> = Vec::new();
        for (pos, num) in nums.iter().enumerate() {
            if component_of[num] != idx {
                continue;
            }
            let precedes = |existing: &usize| {
                let other = nums[*existing];
                edge(*num, other) || (!edge(other, *num) && *num < other)
            };
            let at = members.iter().position(precedes).unwrap_or(members.len());
            members.insert(at, pos);
        }
        plan.extend(members);

        for &next in &successors[idx] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.push(Reverse((min_member(next), next)));
            }
        }
    }
    plan
}
