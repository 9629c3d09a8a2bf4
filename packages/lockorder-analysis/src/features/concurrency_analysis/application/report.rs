//! Lock order analysis report
//!
//! Detector results resolved to section and lock names, serializable for the
//! CLI's JSON output.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::config::DetectionMode;
use crate::features::concurrency_analysis::domain::{DetectionStatus, GroupId, LockNum};

/// One conflict, with section names resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub outer: String,
    pub inner: String,
    #[serde(flatten)]
    pub kind: ConflictKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictKind {
    Group {
        outer_group: GroupId,
        inner_group: GroupId,
    },
    Lock {
        held: LockNum,
        requested: LockNum,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avoidance_lock: Option<LockNum>,
    },
}

impl ConflictReport {
    fn describe(&self) -> String {
        match &self.kind {
            ConflictKind::Group {
                outer_group,
                inner_group,
            } => format!(
                "{} ({}) enters {} ({}) which already precedes it",
                self.outer, outer_group, self.inner, inner_group
            ),
            ConflictKind::Lock {
                held,
                requested,
                avoidance_lock,
            } => {
                let mut line = format!(
                    "{} holds {} while {} acquires {}, which is already ordered first",
                    self.outer, held, self.inner, requested
                );
                if let Some(lock) = avoidance_lock {
                    let _ = write!(line, "; broken by {}", lock);
                }
                line
            }
        }
    }
}

/// Partial order edge; `labels` names the justifying sections (lockset mode)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvoidanceLockReport {
    pub lock: LockNum,
    pub name: String,
    /// Sections that acquire it
    pub holders: Vec<String>,
}

/// Final lockset of a section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionLockset {
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,
    pub locks: Vec<LockNum>,
}

/// Lock order analysis result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOrderReport {
    pub mode: DetectionMode,
    pub status: DetectionStatus<ConflictReport>,
    pub iterations: usize,
    pub repairs: Vec<ConflictReport>,
    pub edges: Vec<OrderEdge>,
    #[serde(default)]
    pub avoidance_locks: Vec<AvoidanceLockReport>,
    /// Sections whose lockset the reorderer changed
    #[serde(default)]
    pub reordered_sections: usize,
    pub locksets: Vec<SectionLockset>,
}

impl LockOrderReport {
    /// Acyclic, or every cycle repaired
    pub fn is_deadlock_free(&self) -> bool {
        self.status.is_deadlock_free()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Lock order analysis ({} mode)", self.mode);
        let _ = writeln!(out, "  status:      {}", self.status.label());
        let _ = writeln!(out, "  iterations:  {}", self.iterations);
        let _ = writeln!(out, "  repairs:     {}", self.repairs.len());
        let _ = writeln!(out, "  order edges: {}", self.edges.len());

        match &self.status {
            DetectionStatus::DeadlockReported { conflict } => {
                let _ = writeln!(out, "  deadlock: {}", conflict.describe());
            }
            DetectionStatus::DidNotConverge {
                last_conflict: Some(conflict),
                ..
            } => {
                let _ = writeln!(out, "  last conflict: {}", conflict.describe());
            }
            _ => {}
        }

        if !self.repairs.is_empty() {
            let _ = writeln!(out, "  repaired:");
            for repair in &self.repairs {
                let _ = writeln!(out, "    {}", repair.describe());
            }
        }

        if !self.avoidance_locks.is_empty() {
            let _ = writeln!(out, "  avoidance locks:");
            for lock in &self.avoidance_locks {
                let _ = writeln!(
                    out,
                    "    {} {} held by {}",
                    lock.lock,
                    lock.name,
                    lock.holders.join(", ")
                );
            }
        }

        if self.reordered_sections > 0 {
            let _ = writeln!(out, "  reordered locksets: {}", self.reordered_sections);
        }

        let _ = writeln!(out, "  locksets:");
        for entry in &self.locksets {
            let nums: Vec<String> = entry.locks.iter().map(LockNum::to_string).collect();
            let _ = writeln!(out, "    {} [{}]", entry.section, nums.join(", "));
        }
        out
    }
}
