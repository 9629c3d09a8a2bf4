/// Memoized transitive call targets of critical sections
use rustc_hash::FxHashSet;

use crate::errors::Result;
use crate::features::concurrency_analysis::domain::{AnalysisContext, MethodId, SectionId};
use crate::features::concurrency_analysis::ports::ReachabilityOracle;

pub struct TransitiveTargets;

impl TransitiveTargets {
    /// Fill `section.transitive_targets` from the oracle if not done yet.
    ///
    /// The set is computed at most once per section; later calls return
    /// the cached set even if the oracle changed.
    pub fn ensure<'c, O>(
        ctx: &'c mut AnalysisContext,
        section: SectionId,
        oracle: &O,
    ) -> Result<&'c FxHashSet<MethodId>>
    where
        O: ReachabilityOracle + ?Sized,
    {
        let tn = ctx.section_mut(section)?;
        let invokes = &tn.invokes;
        Ok(tn.transitive_targets.get_or_insert_with(|| {
            let mut targets = FxHashSet::default();
            for &site in invokes {
                targets.extend(oracle.reachable_targets(site));
            }
            targets
        }))
    }

    /// Fill targets for every section in list order
    pub fn ensure_all<O>(ctx: &mut AnalysisContext, oracle: &O) -> Result<()>
    where
        O: ReachabilityOracle + ?Sized,
    {
        let ids: Vec<SectionId> = ctx.section_ids().collect();
        for id in ids {
            Self::ensure(ctx, id, oracle)?;
        }
        Ok(())
    }

    /// True if `outer` reaches the guard-entry method of `inner`
    pub fn enters(ctx: &AnalysisContext, outer: SectionId, inner: SectionId) -> Result<bool> {
        let inner_method = ctx.section(inner)?.method;
        Ok(ctx
            .section(outer)?
            .targets()
            .is_some_and(|targets| targets.contains(&inner_method)))
    }
}
