/// Critical sections and the groups they are classified into
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

use super::ids::{CallSiteId, GroupId, MethodId, SectionId};
use super::lock::LockKey;

/// A code region guarded by one or more locks
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalSection {
    pub name: String,
    /// Guard-entry method owning the region
    pub method: MethodId,
    /// Declaring class of `method`; tags avoidance locks
    pub declaring_class: String,
    /// Call sites inside the region, in extraction order
    pub invokes: Vec<CallSiteId>,
    /// Locks in acquisition order
    pub lockset: Vec<LockKey>,
    /// None when unlocked or not yet classified
    pub group: Option<GroupId>,
    /// Mirrors the group number; <= 0 means unlocked
    pub set_number: i32,
    /// Methods reachable from `invokes`, filled once by `TransitiveTargets::ensure`
    pub transitive_targets: Option<FxHashSet<MethodId>>,
}

impl CriticalSection {
    pub fn new(name: impl Into<String>, method: MethodId, declaring_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method,
            declaring_class: declaring_class.into(),
            invokes: Vec::new(),
            lockset: Vec::new(),
            group: None,
            set_number: 0,
            transitive_targets: None,
        }
    }

    pub fn with_invoke(mut self, call_site: CallSiteId) -> Self {
        if !self.invokes.contains(&call_site) {
            self.invokes.push(call_site);
        }
        self
    }

    pub fn with_invokes(self, call_sites: impl IntoIterator<Item = CallSiteId>) -> Self {
        call_sites.into_iter().fold(self, Self::with_invoke)
    }

    pub fn with_lock(mut self, lock: LockKey) -> Self {
        self.lockset.push(lock);
        self
    }

    pub fn with_locks(mut self, locks: impl IntoIterator<Item = LockKey>) -> Self {
        self.lockset.extend(locks);
        self
    }

    /// Participates in the group-based order
    pub fn is_locked(&self) -> bool {
        self.set_number > 0
    }

    /// Participates in the lockset-based order
    pub fn is_grouped(&self) -> bool {
        self.group.is_some()
    }

    pub fn holds(&self, lock: &LockKey) -> bool {
        self.lockset.contains(lock)
    }

    /// Reachable methods, if already computed
    pub fn targets(&self) -> Option<&FxHashSet<MethodId>> {
        self.transitive_targets.as_ref()
    }
}

/// Union of critical sections believed to guard a common lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalSectionGroup {
    pub id: GroupId,
    /// Positive number copied into each member's `set_number`
    pub group_num: i32,
    pub members: BTreeSet<SectionId>,
}

impl CriticalSectionGroup {
    pub fn new(id: GroupId, group_num: i32) -> Self {
        Self {
            id,
            group_num,
            members: BTreeSet::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Emptied by a merge; stays in the arena so ids remain stable
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
