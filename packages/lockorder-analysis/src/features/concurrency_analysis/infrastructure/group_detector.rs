/// GroupDeadlockDetector - coarse-grained lock order over critical section groups
///
/// ## Algorithm
/// 1. Nodes are the groups of locked sections (`set_number > 0`)
/// 2. For every ordered pair (tn1, tn2) in list order where tn1 reaches
///    tn2's guard method, add `tn1.group -> tn2.group`
/// 3. Before adding, check whether tn2.group already reaches tn1.group;
///    if so the order has a cycle
/// 4. Repair merges tn2.group into tn1.group and restarts from an empty graph
///
/// Repair terminates: every merge removes a live group.
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info, warn};

use super::reachability::reachability_for;
use super::transitive_targets::TransitiveTargets;
use crate::config::LockOrderConfig;
use crate::errors::{LockOrderError, Result};
use crate::features::concurrency_analysis::domain::{
    AnalysisContext, DetectionStatus, GroupConflict, GroupId, Scan, SectionId,
};
use crate::features::concurrency_analysis::ports::ReachabilityOracle;

/// Result of a group-mode run
#[derive(Debug, Clone)]
pub struct GroupDetection {
    /// Order over groups from the last pass
    pub order: DiGraphMap<GroupId, ()>,
    pub status: DetectionStatus<GroupConflict>,
    /// Passes run, including the final clean one
    pub iterations: usize,
    /// Conflicts repaired by merging, in repair order
    pub merges: Vec<GroupConflict>,
}

pub struct GroupDeadlockDetector<'a> {
    config: &'a LockOrderConfig,
}

impl<'a> GroupDeadlockDetector<'a> {
    pub fn new(config: &'a LockOrderConfig) -> Self {
        Self { config }
    }

    /// Build the group order, repairing cycles by merging if configured.
    ///
    /// Detect-only runs never mutate `ctx` apart from memoizing transitive targets.
    pub fn detect<O>(&self, ctx: &mut AnalysisContext, oracle: &O) -> Result<GroupDetection>
    where
        O: ReachabilityOracle + ?Sized,
    {
        ctx.validate()?;
        TransitiveTargets::ensure_all(ctx, oracle)?;

        let mut merges = Vec::new();
        let mut last_order = DiGraphMap::new();

        for iteration in 1..=self.config.max_iterations {
            debug!("[DeadlockDetector] Deadlock Iteration #{}", iteration);
            let (order, scan) = self.run_pass(ctx)?;

            match scan {
                Scan::Continue => {
                    let status = if merges.is_empty() {
                        DetectionStatus::Acyclic
                    } else {
                        DetectionStatus::Repaired {
                            repairs: merges.len(),
                        }
                    };
                    info!(
                        "Group order: {} groups, {} edges, {} merges after {} iterations",
                        order.node_count(),
                        order.edge_count(),
                        merges.len(),
                        iteration
                    );
                    return Ok(GroupDetection {
                        order,
                        status,
                        iterations: iteration,
                        merges,
                    });
                }
                Scan::DeadlockFound(conflict) if !self.config.repair => {
                    info!(
                        "Group order: deadlock between {} and {} (not correcting)",
                        conflict.outer_group, conflict.inner_group
                    );
                    return Ok(GroupDetection {
                        order,
                        status: DetectionStatus::DeadlockReported { conflict },
                        iterations: iteration,
                        merges,
                    });
                }
                Scan::DeadlockFound(conflict) => {
                    merges.push(conflict);
                    last_order = order;
                }
            }
        }

        warn!(
            "[DeadlockDetector] group order did not converge after {} iterations",
            self.config.max_iterations
        );
        Ok(GroupDetection {
            order: last_order,
            status: DetectionStatus::DidNotConverge {
                iterations: self.config.max_iterations,
                last_conflict: merges.last().cloned(),
            },
            iterations: self.config.max_iterations,
            merges,
        })
    }

    /// One pass over all locked pairs; stops at the first cycle
    fn run_pass(
        &self,
        ctx: &mut AnalysisContext,
    ) -> Result<(DiGraphMap<GroupId, ()>, Scan<GroupConflict>)> {
        let allow_self_edges = self.config.effective_allow_self_edges();
        let mut order = DiGraphMap::new();
        let mut reach = reachability_for::<GroupId>(self.config.reachability);

        let locked: Vec<SectionId> = ctx
            .sections()
            .iter()
            .enumerate()
            .filter(|(_, tn)| tn.is_locked())
            .map(|(idx, _)| SectionId(idx))
            .collect();

        for &id in &locked {
            order.add_node(group_of(ctx, id)?);
        }

        for &tn1 in &locked {
            for &tn2 in &locked {
                let (s1, s2) = (ctx.section(tn1)?, ctx.section(tn2)?);
                if s1.set_number == s2.set_number && !allow_self_edges {
                    continue;
                }
                if !TransitiveTargets::enters(ctx, tn1, tn2)? {
                    continue;
                }

                let (g1, g2) = (group_of(ctx, tn1)?, group_of(ctx, tn2)?);
                detail!(
                    self.config,
                    "[DeadlockDetector] group of {} before group of {}: outer: {} inner: {}",
                    s1.name,
                    s2.name,
                    g1,
                    g2
                );

                if reach.is_reachable(g2, g1) {
                    let conflict = GroupConflict {
                        outer: tn1,
                        inner: tn2,
                        outer_group: g1,
                        inner_group: g2,
                    };
                    debug!(
                        "[DeadlockDetector] DEADLOCK HAS BEEN DETECTED: {} reaches {} which already precedes it",
                        s1.name, s2.name
                    );

                    if self.config.repair {
                        debug!("[DeadlockDetector] merging {} into {}", g2, g1);
                        ctx.merge_groups(g1, g2)?;
                    } else {
                        order.add_edge(g1, g2, ());
                    }
                    return Ok((order, Scan::DeadlockFound(conflict)));
                }

                order.add_edge(g1, g2, ());
                reach.insert_edge(g1, g2);
            }
        }

        Ok((order, Scan::Continue))
    }
}

fn group_of(ctx: &AnalysisContext, id: SectionId) -> Result<GroupId> {
    let tn = ctx.section(id)?;
    tn.group.ok_or_else(|| {
        LockOrderError::invalid_context(format!("locked section '{}' has no group", tn.name))
    })
}
