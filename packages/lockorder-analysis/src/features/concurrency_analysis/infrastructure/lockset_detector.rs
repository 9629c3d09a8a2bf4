/// LocksetDeadlockDetector - fine-grained lock order with avoidance-lock repair
///
/// ## Algorithm
/// 1. Each pass starts from a copy of the permanent order (avoidance-lock edges)
/// 2. For every ordered pair (tn1, tn2) of grouped sections where tn1 reaches
///    tn2's guard method, each lock of tn1 is ordered before each lock of tn2
/// 3. Before ordering `l1 -> l2`, look at the direct successors of `l2`.
///    Successors justified only by sections sharing a static lock with tn1
///    are dropped: those sections can never interleave with tn1.
/// 4. If `l1` is still a successor of `l2`, the order has a cycle
///
/// ## Repair
/// A fresh static avoidance lock is added to tn1 and to every section labelling
/// `l1 -> l2` or `l2 -> l1`. The permanent order records it before each of those
/// sections' locks, then detection restarts.
use tracing::{debug, info, warn};

use super::lock_order_graph::LockOrderGraph;
use super::transitive_targets::TransitiveTargets;
use crate::config::LockOrderConfig;
use crate::errors::Result;
use crate::features::concurrency_analysis::domain::{
    AnalysisContext, DetectionStatus, LockConflict, LockNum, Scan, SectionId,
};
use crate::features::concurrency_analysis::ports::ReachabilityOracle;

/// Result of a lockset-mode run
#[derive(Debug, Clone)]
pub struct LocksetDetection {
    /// Permanent edges plus the edges of the last pass
    pub order: LockOrderGraph,
    pub status: DetectionStatus<LockConflict>,
    pub iterations: usize,
    /// Repaired conflicts, each carrying the avoidance lock it introduced
    pub repairs: Vec<LockConflict>,
}

impl LocksetDetection {
    /// Avoidance locks created, in creation order
    pub fn avoidance_locks(&self) -> Vec<LockNum> {
        self.repairs
            .iter()
            .filter_map(|conflict| conflict.avoidance_lock)
            .collect()
    }
}

pub struct LocksetDeadlockDetector<'a> {
    config: &'a LockOrderConfig,
}

impl<'a> LocksetDeadlockDetector<'a> {
    pub fn new(config: &'a LockOrderConfig) -> Self {
        Self { config }
    }

    pub fn detect<O>(&self, ctx: &mut AnalysisContext, oracle: &O) -> Result<LocksetDetection>
    where
        O: ReachabilityOracle + ?Sized,
    {
        ctx.validate()?;
        TransitiveTargets::ensure_all(ctx, oracle)?;

        let mut permanent = LockOrderGraph::new();
        let mut repairs = Vec::new();
        let mut last_order = LockOrderGraph::new();

        for iteration in 1..=self.config.max_iterations {
            debug!("[DeadlockDetector] Deadlock Iteration #{}", iteration);
            let (order, scan) = self.run_pass(ctx, &mut permanent)?;

            match scan {
                Scan::Continue => {
                    let status = if repairs.is_empty() {
                        DetectionStatus::Acyclic
                    } else {
                        DetectionStatus::Repaired {
                            repairs: repairs.len(),
                        }
                    };
                    info!(
                        "Lock order: {} locks, {} edges, {} avoidance locks after {} iterations",
                        order.node_count(),
                        order.edge_count(),
                        repairs.len(),
                        iteration
                    );
                    return Ok(LocksetDetection {
                        order,
                        status,
                        iterations: iteration,
                        repairs,
                    });
                }
                Scan::DeadlockFound(conflict) if !self.config.repair => {
                    info!(
                        "Lock order: deadlock on locks {} and {} (not correcting)",
                        conflict.held, conflict.requested
                    );
                    return Ok(LocksetDetection {
                        order,
                        status: DetectionStatus::DeadlockReported { conflict },
                        iterations: iteration,
                        repairs,
                    });
                }
                Scan::DeadlockFound(conflict) => {
                    repairs.push(conflict);
                    last_order = order;
                }
            }
        }

        warn!(
            "[DeadlockDetector] lock order did not converge after {} iterations",
            self.config.max_iterations
        );
        Ok(LocksetDetection {
            order: last_order,
            status: DetectionStatus::DidNotConverge {
                iterations: self.config.max_iterations,
                last_conflict: repairs.last().cloned(),
            },
            iterations: self.config.max_iterations,
            repairs,
        })
    }

    fn run_pass(
        &self,
        ctx: &mut AnalysisContext,
        permanent: &mut LockOrderGraph,
    ) -> Result<(LockOrderGraph, Scan<LockConflict>)> {
        let mut order = permanent.clone();

        let grouped: Vec<SectionId> = ctx
            .sections()
            .iter()
            .enumerate()
            .filter(|(_, tn)| tn.is_grouped())
            .map(|(idx, _)| SectionId(idx))
            .collect();

        for &id in &grouped {
            for num in ctx.lock_nums(id)? {
                order.add_node(num);
            }
        }

        for &tn1 in &grouped {
            let tn1_locks = ctx.lock_nums(tn1)?;

            for &tn2 in &grouped {
                if !TransitiveTargets::enters(ctx, tn1, tn2)? {
                    continue;
                }
                detail!(
                    self.config,
                    "[DeadlockDetector] locks in {} before locks in {}",
                    ctx.section(tn1)?.name,
                    ctx.section(tn2)?.name
                );

                for l2 in ctx.lock_nums(tn2)? {
                    let after_l2 = self.locks_after(ctx, &order, tn1, l2)?;

                    for &l1 in &tn1_locks {
                        if (l1 != l2 || l1.is_static()) && after_l2.contains(&l1) {
                            let mut conflict = LockConflict {
                                outer: tn1,
                                inner: tn2,
                                held: l1,
                                requested: l2,
                                avoidance_lock: None,
                            };

                            if !self.config.repair {
                                debug!("[DeadlockDetector] DEADLOCK HAS BEEN DETECTED: not correcting");
                                if l1 != l2 {
                                    order.add_edge(l1, l2, tn1);
                                }
                                return Ok((order, Scan::DeadlockFound(conflict)));
                            }

                            debug!(
                                "[DeadlockDetector] DEADLOCK HAS BEEN DETECTED while inspecting {} and {}",
                                l1, l2
                            );
                            let avoidance =
                                self.insert_avoidance_lock(ctx, permanent, &order, tn1, l1, l2)?;
                            conflict.avoidance_lock = Some(avoidance);
                            debug!("[DeadlockDetector]   Restarting deadlock detection");
                            return Ok((order, Scan::DeadlockFound(conflict)));
                        }

                        if l1 != l2 {
                            order.add_edge(l1, l2, tn1);
                        }
                    }
                }
            }
        }

        Ok((order, Scan::Continue))
    }

    /// Direct successors of `l2` still relevant to `outer`
    fn locks_after(
        &self,
        ctx: &AnalysisContext,
        order: &LockOrderGraph,
        outer: SectionId,
        l2: LockNum,
    ) -> Result<Vec<LockNum>> {
        let mut after: Vec<LockNum> = order.successors(l2).collect();
        let mut excluded = Vec::new();

        for &to in &after {
            let mut keep = false;
            if let Some(labels) = order.labels(l2, to) {
                for &label in labels {
                    if !ctx.shares_static_lock(outer, label)? {
                        keep = true;
                        break;
                    }
                }
            }
            if !keep {
                excluded.push(to);
            }
        }

        after.retain(|to| !excluded.contains(to));
        Ok(after)
    }

    /// Synthesize an avoidance lock and attach it to `outer` and to every
    /// section labelling `l1 -> l2` or `l2 -> l1`
    fn insert_avoidance_lock(
        &self,
        ctx: &mut AnalysisContext,
        permanent: &mut LockOrderGraph,
        order: &LockOrderGraph,
        outer: SectionId,
        l1: LockNum,
        l2: LockNum,
    ) -> Result<LockNum> {
        let declaring_class = ctx.section(outer)?.declaring_class.clone();
        let (key, dae) = ctx
            .lock_table_mut()
            .synthesize_avoidance_lock(&declaring_class);
        permanent.add_node(dae);
        debug!("[DeadlockDetector]   Created avoidance lock {} ({})", dae, key);

        let forward = order.labels(l1, l2).into_iter().flatten();
        let backward = order.labels(l2, l1).into_iter().flatten();
        let implicated: Vec<SectionId> = std::iter::once(outer)
            .chain(forward.copied())
            .chain(backward.copied())
            .collect();

        for tn in implicated {
            if ctx.section(tn)?.holds(&key) {
                continue;
            }
            for num in ctx.lock_nums(tn)? {
                permanent.add_edge(dae, num, tn);
            }
            ctx.acquire_additionally(tn, key.clone())?;
            debug!(
                "[DeadlockDetector]   Adding deadlock avoidance edge between {} and {}",
                ctx.section(outer)?.name,
                ctx.section(tn)?.name
            );
        }

        Ok(dae)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::features::concurrency_analysis::domain::{CriticalSection, LockKey, PointsToSet};
    use crate::features::concurrency_analysis::infrastructure::FilteredCallGraph;

    /// Sections share one group; `sections[i] = (locks, callees)`
    fn build(
        statics: &[&str],
        sections: &[(&[&str], &[usize])],
    ) -> (AnalysisContext, FilteredCallGraph) {
        let mut ctx = AnalysisContext::new();
        let mut graph = FilteredCallGraph::new();
        for name in ["L1", "L2", "L3"] {
            ctx.lock_table_mut()
                .register_dynamic(LockKey::value(name), PointsToSet::default());
        }
        for name in statics {
            ctx.lock_table_mut().register_static(LockKey::value(*name));
        }

        let group = ctx.add_group();
        let guards: Vec<_> = (0..sections.len())
            .map(|i| graph.add_method(format!("T{}.guard", i)))
            .collect();
        for (i, (locks, callees)) in sections.iter().enumerate() {
            let body = graph.add_method(format!("T{}.body", i));
            let mut tn = CriticalSection::new(format!("T{}", i), guards[i], format!("app.T{}", i))
                .with_locks(locks.iter().map(|l| LockKey::value(*l)));
            for &callee in callees.iter() {
                tn = tn.with_invoke(graph.add_call(body, guards[callee]).unwrap());
            }
            ctx.add_section_in_group(tn, group).unwrap();
        }
        (ctx, graph)
    }

    fn three_way_cycle() -> (AnalysisContext, FilteredCallGraph) {
        build(
            &[],
            &[
                (&["L1", "L2"], &[1]),
                (&["L2", "L3"], &[2]),
                (&["L3", "L1"], &[0]),
            ],
        )
    }

    #[test]
    fn test_consistent_order_is_acyclic() {
        let (mut ctx, graph) = build(&[], &[(&["L1"], &[1]), (&["L2"], &[])]);
        let config = LockOrderConfig::from_preset(Preset::Detect);
        let result = LocksetDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();

        assert_eq!(result.status, DetectionStatus::Acyclic);
        assert!(result.order.contains_edge(LockNum(1), LockNum(2)));
        assert_eq!(
            result.order.labels(LockNum(1), LockNum(2)).unwrap().len(),
            1
        );
        assert!(!result.order.is_cyclic());
    }

    #[test]
    fn test_detect_only_leaves_locksets_alone() {
        let (mut ctx, graph) = three_way_cycle();
        let before: Vec<_> = ctx.sections().iter().map(|tn| tn.lockset.clone()).collect();
        let config = LockOrderConfig::from_preset(Preset::Detect);
        let result = LocksetDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();

        match &result.status {
            DetectionStatus::DeadlockReported { conflict } => {
                assert_eq!(conflict.outer, SectionId(1));
                assert_eq!(conflict.inner, SectionId(2));
                assert_eq!(conflict.held, LockNum(2));
                assert_eq!(conflict.requested, LockNum(1));
                assert_eq!(conflict.avoidance_lock, None);
            }
            other => panic!("unexpected status {:?}", other),
        }
        let after: Vec<_> = ctx.sections().iter().map(|tn| tn.lockset.clone()).collect();
        assert_eq!(before, after);
        assert_eq!(ctx.lock_table().points_to_len(), 4);
    }

    #[test]
    fn test_repair_inserts_avoidance_locks() {
        let (mut ctx, graph) = three_way_cycle();
        let config = LockOrderConfig::from_preset(Preset::Repair);
        let result = LocksetDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();

        assert_eq!(result.status, DetectionStatus::Repaired { repairs: 2 });
        assert_eq!(result.iterations, 3);
        assert_eq!(result.avoidance_locks(), vec![LockNum(-4), LockNum(-5)]);

        // first repair: B and A, second: C, B and A
        assert_eq!(ctx.format_lockset(SectionId(0)).unwrap(), "[1, 2, -4, -5]");
        assert_eq!(ctx.format_lockset(SectionId(1)).unwrap(), "[2, 3, -4, -5]");
        assert_eq!(ctx.format_lockset(SectionId(2)).unwrap(), "[3, 1, -5]");

        // permanent edges from the first avoidance lock, labelled by section
        let labels = result.order.labels(LockNum(-4), LockNum(2)).unwrap();
        assert!(labels.contains(&SectionId(0)) && labels.contains(&SectionId(1)));

        // re-running on the repaired context finds nothing
        let rerun = LocksetDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();
        assert_eq!(rerun.status, DetectionStatus::Acyclic);
    }

    #[test]
    fn test_shared_static_lock_hides_conflict() {
        let (mut ctx, graph) = build(
            &["G.class"],
            &[
                (&["G.class", "L1", "L2"], &[1]),
                (&["G.class", "L2", "L1"], &[0]),
            ],
        );
        let config = LockOrderConfig::from_preset(Preset::Detect);
        let result = LocksetDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();
        assert_eq!(result.status, DetectionStatus::Acyclic);
        // the raw graph still records both directions
        assert!(result.order.is_cyclic());
    }

    #[test]
    fn test_ungrouped_sections_ignored() {
        let (ctx, graph) = build(&[], &[(&["L1", "L2"], &[1]), (&["L2", "L1"], &[0])]);
        let mut partial = AnalysisContext::with_lock_table(ctx.lock_table().clone());
        let g = partial.add_group();
        partial
            .add_section_in_group(ctx.sections()[0].clone(), g)
            .unwrap();
        partial.add_section(ctx.sections()[1].clone());

        let config = LockOrderConfig::from_preset(Preset::Detect);
        let result = LocksetDeadlockDetector::new(&config)
            .detect(&mut partial, &graph)
            .unwrap();
        assert_eq!(result.status, DetectionStatus::Acyclic);
        assert_eq!(result.order.edge_count(), 0);
        assert_eq!(result.order.node_count(), 2);
    }

    #[test]
    fn test_iteration_bound() {
        let (mut ctx, graph) = three_way_cycle();
        let config = LockOrderConfig::from_preset(Preset::Repair).max_iterations(2);
        let result = LocksetDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();

        match result.status {
            DetectionStatus::DidNotConverge {
                iterations,
                last_conflict: Some(conflict),
            } => {
                assert_eq!(iterations, 2);
                assert_eq!(conflict.avoidance_lock, Some(LockNum(-5)));
            }
            other => panic!("unexpected status {:?}", other),
        }
    }
}
