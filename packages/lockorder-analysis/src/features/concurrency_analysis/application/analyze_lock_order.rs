//! Lock Order Analysis Use Case
//!
//! ## Pipeline
//! 1. Validate the analysis context
//! 2. Run the configured detector (group merge or avoidance-lock repair)
//! 3. Lockset mode: reorder locksets once the order is deadlock-free
//! 4. Resolve ids to names in a `LockOrderReport`

use tracing::info;

use super::report::{
    AvoidanceLockReport, ConflictKind, ConflictReport, LockOrderReport, OrderEdge, SectionLockset,
};
use crate::config::{DetectionMode, LockOrderConfig};
use crate::errors::Result;
use crate::features::concurrency_analysis::domain::{
    AnalysisContext, DetectionStatus, GroupConflict, GroupId, LockConflict, SectionId,
};
use crate::features::concurrency_analysis::infrastructure::{
    CriticalSectionVisibleEdges, GroupDeadlockDetector, LoadedProgram, LocksetDeadlockDetector,
    LocksetReorderer,
};
use crate::features::concurrency_analysis::ports::ReachabilityOracle;

/// Detect (and optionally repair) lock order cycles
pub struct LockOrderAnalysis {
    config: LockOrderConfig,
}

impl LockOrderAnalysis {
    /// Fails on an invalid config
    pub fn new(config: LockOrderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LockOrderConfig {
        &self.config
    }

    /// Run on a context and oracle.
    ///
    /// Repair mode mutates `ctx` (group merges, extended and reordered locksets).
    pub fn analyze<O>(&self, ctx: &mut AnalysisContext, oracle: &O) -> Result<LockOrderReport>
    where
        O: ReachabilityOracle + ?Sized,
    {
        ctx.validate()?;

        let report = match self.config.mode {
            DetectionMode::Group => self.analyze_groups(ctx, oracle)?,
            DetectionMode::Lockset => self.analyze_locksets(ctx, oracle)?,
        };

        info!(
            "Lock order analysis ({}): {} after {} iterations, {} repairs",
            report.mode,
            report.status.label(),
            report.iterations,
            report.repairs.len()
        );
        Ok(report)
    }

    /// Run on a loaded program, applying the configured method exclusions
    pub fn analyze_program(&self, program: &mut LoadedProgram) -> Result<LockOrderReport> {
        program
            .call_graph
            .set_filter(CriticalSectionVisibleEdges::new(
                self.config.excluded_method_prefixes.iter().cloned(),
            ));
        self.analyze(&mut program.context, &program.call_graph)
    }

    fn analyze_groups<O>(&self, ctx: &mut AnalysisContext, oracle: &O) -> Result<LockOrderReport>
    where
        O: ReachabilityOracle + ?Sized,
    {
        let detection = GroupDeadlockDetector::new(&self.config).detect(ctx, oracle)?;

        let mut pairs: Vec<(GroupId, GroupId)> = detection
            .order
            .all_edges()
            .map(|(from, to, _)| (from, to))
            .collect();
        pairs.sort();
        let edges = pairs
            .into_iter()
            .map(|(from, to)| OrderEdge {
                from: from.to_string(),
                to: to.to_string(),
                labels: Vec::new(),
            })
            .collect();

        let repairs = detection
            .merges
            .iter()
            .map(|conflict| group_conflict(ctx, conflict))
            .collect::<Result<Vec<_>>>()?;
        let status = transpose(
            detection
                .status
                .map(|conflict| group_conflict(ctx, &conflict)),
        )?;

        Ok(LockOrderReport {
            mode: DetectionMode::Group,
            status,
            iterations: detection.iterations,
            repairs,
            edges,
            avoidance_locks: Vec::new(),
            reordered_sections: 0,
            locksets: locksets(ctx)?,
        })
    }

    fn analyze_locksets<O>(
        &self,
        ctx: &mut AnalysisContext,
        oracle: &O,
    ) -> Result<LockOrderReport>
    where
        O: ReachabilityOracle + ?Sized,
    {
        let detection = LocksetDeadlockDetector::new(&self.config).detect(ctx, oracle)?;

        let reordered_sections =
            if self.config.reorder_locksets && detection.status.is_deadlock_free() {
                LocksetReorderer::new(&self.config).reorder(ctx, &detection.order)?
            } else {
                0
            };

        let mut edges = Vec::with_capacity(detection.order.edge_count());
        for (from, to, labels) in detection.order.edges() {
            edges.push(OrderEdge {
                from: from.to_string(),
                to: to.to_string(),
                labels: section_names(ctx, labels.iter().copied())?,
            });
        }

        let mut avoidance_locks = Vec::new();
        for lock in detection.avoidance_locks() {
            let mut name = String::new();
            let mut holders = Vec::new();
            for id in ctx.section_ids() {
                let tn = ctx.section(id)?;
                for key in &tn.lockset {
                    if ctx.lock_table().lock_num(key)? == lock {
                        name = key.to_string();
                        holders.push(tn.name.clone());
                        break;
                    }
                }
            }
            avoidance_locks.push(AvoidanceLockReport {
                lock,
                name,
                holders,
            });
        }

        let repairs = detection
            .repairs
            .iter()
            .map(|conflict| lock_conflict(ctx, conflict))
            .collect::<Result<Vec<_>>>()?;
        let status = transpose(
            detection
                .status
                .map(|conflict| lock_conflict(ctx, &conflict)),
        )?;

        Ok(LockOrderReport {
            mode: DetectionMode::Lockset,
            status,
            iterations: detection.iterations,
            repairs,
            edges,
            avoidance_locks,
            reordered_sections,
            locksets: locksets(ctx)?,
        })
    }
}

/// Lift a fallible conflict conversion out of the status
fn transpose<C>(status: DetectionStatus<Result<C>>) -> Result<DetectionStatus<C>> {
    Ok(match status {
        DetectionStatus::Acyclic => DetectionStatus::Acyclic,
        DetectionStatus::DeadlockReported { conflict } => DetectionStatus::DeadlockReported {
            conflict: conflict?,
        },
        DetectionStatus::Repaired { repairs } => DetectionStatus::Repaired { repairs },
        DetectionStatus::DidNotConverge {
            iterations,
            last_conflict,
        } => DetectionStatus::DidNotConverge {
            iterations,
            last_conflict: last_conflict.transpose()?,
        },
    })
}

fn section_name(ctx: &AnalysisContext, id: SectionId) -> Result<String> {
    Ok(ctx.section(id)?.name.clone())
}

fn section_names(
    ctx: &AnalysisContext,
    ids: impl IntoIterator<Item = SectionId>,
) -> Result<Vec<String>> {
    ids.into_iter().map(|id| section_name(ctx, id)).collect()
}

fn group_conflict(ctx: &AnalysisContext, conflict: &GroupConflict) -> Result<ConflictReport> {
    Ok(ConflictReport {
        outer: section_name(ctx, conflict.outer)?,
        inner: section_name(ctx, conflict.inner)?,
        kind: ConflictKind::Group {
            outer_group: conflict.outer_group,
            inner_group: conflict.inner_group,
        },
    })
}

fn lock_conflict(ctx: &AnalysisContext, conflict: &LockConflict) -> Result<ConflictReport> {
    Ok(ConflictReport {
        outer: section_name(ctx, conflict.outer)?,
        inner: section_name(ctx, conflict.inner)?,
        kind: ConflictKind::Lock {
            held: conflict.held,
            requested: conflict.requested,
            avoidance_lock: conflict.avoidance_lock,
        },
    })
}

fn locksets(ctx: &AnalysisContext) -> Result<Vec<SectionLockset>> {
    ctx.section_ids()
        .map(|id| {
            let tn = ctx.section(id)?;
            Ok(SectionLockset {
                section: tn.name.clone(),
                group: tn.group,
                locks: ctx.lock_nums(id)?,
            })
        })
        .collect()
}
