/// Reachability oracle port trait
use crate::features::concurrency_analysis::{CallSiteId, MethodId};

/// Port trait for call-reachability oracles
///
/// Given a call site inside a critical section, lazily yields every method
/// transitively reachable through it, following only call edges relevant to
/// synchronization. The sequence must be finite.
pub trait ReachabilityOracle {
    fn reachable_targets<'a>(
        &'a self,
        call_site: CallSiteId,
    ) -> Box<dyn Iterator<Item = MethodId> + 'a>;
}

impl<T: ReachabilityOracle + ?Sized> ReachabilityOracle for &T {
    fn reachable_targets<'a>(
        &'a self,
        call_site: CallSiteId,
    ) -> Box<dyn Iterator<Item = MethodId> + 'a> {
        (**self).reachable_targets(call_site)
    }
}
