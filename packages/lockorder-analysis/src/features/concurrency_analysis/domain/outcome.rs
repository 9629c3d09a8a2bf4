/// Detection outcomes
///
/// A deadlock is a normal analysis result. Inner routines return `Scan`,
/// detectors fold the passes into a `DetectionStatus`.
use serde::{Deserialize, Serialize};

use super::ids::{GroupId, LockNum, SectionId};

/// Outcome of scanning a pair or a whole pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan<C> {
    /// Keep going
    Continue,
    /// A cycle was found (and, in repair mode, already repaired)
    DeadlockFound(C),
}

impl<C> Scan<C> {
    pub fn is_deadlock(&self) -> bool {
        matches!(self, Scan::DeadlockFound(_))
    }
}

/// Group-mode cycle: `outer`'s group reaches `inner`'s group, which already reaches back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConflict {
    pub outer: SectionId,
    pub inner: SectionId,
    pub outer_group: GroupId,
    pub inner_group: GroupId,
}

/// Lockset-mode cycle: `outer` holds `held` while reaching `inner`, which
/// acquires `requested`; some other section already orders `requested` before `held`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConflict {
    pub outer: SectionId,
    pub inner: SectionId,
    pub held: LockNum,
    pub requested: LockNum,
    /// Avoidance lock created to break the cycle (repair mode only)
    pub avoidance_lock: Option<LockNum>,
}

/// Final status of a detector run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionStatus<C> {
    /// No cycle found, nothing mutated
    Acyclic,
    /// Detect-only mode found a cycle; nothing mutated
    DeadlockReported { conflict: C },
    /// Cycles were found and repaired; the final order is deadlock-free
    Repaired { repairs: usize },
    /// The iteration bound was hit while cycles were still being repaired
    DidNotConverge {
        iterations: usize,
        last_conflict: Option<C>,
    },
}

impl<C> DetectionStatus<C> {
    pub fn is_deadlock_free(&self) -> bool {
        matches!(self, Self::Acyclic | Self::Repaired { .. })
    }

    pub fn deadlock_reported(&self) -> bool {
        matches!(self, Self::DeadlockReported { .. })
    }

    /// Convert the conflict payload, keeping the status
    pub fn map<D>(self, f: impl FnOnce(C) -> D) -> DetectionStatus<D> {
        match self {
            Self::Acyclic => DetectionStatus::Acyclic,
            Self::DeadlockReported { conflict } => DetectionStatus::DeadlockReported {
                conflict: f(conflict),
            },
            Self::Repaired { repairs } => DetectionStatus::Repaired { repairs },
            Self::DidNotConverge {
                iterations,
                last_conflict,
            } => DetectionStatus::DidNotConverge {
                iterations,
                last_conflict: last_conflict.map(f),
            },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Acyclic => "acyclic",
            Self::DeadlockReported { .. } => "deadlock_reported",
            Self::Repaired { .. } => "repaired",
            Self::DidNotConverge { .. } => "did_not_converge",
        }
    }
}
