/// Lock identities and the lock-numbering table
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::ids::LockNum;
use crate::errors::{LockOrderError, Result};

/// Synthetic static lock inserted to serialize a detected cycle
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AvoidanceLock {
    /// Distinguishes avoidance locks created for the same class
    pub serial: u32,
    /// Declaring class of the method whose section triggered the repair
    pub declaring_class: String,
}

/// Normalized key for one lock value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LockKey {
    /// Lock expression produced by extraction (e.g. `this.mutex`, `Foo.class`)
    Value(String),
    /// Deadlock avoidance lock created during repair
    Avoidance(AvoidanceLock),
}

impl LockKey {
    pub fn value(name: impl Into<String>) -> Self {
        LockKey::Value(name.into())
    }

    pub fn is_avoidance(&self) -> bool {
        matches!(self, LockKey::Avoidance(_))
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Value(name) => write!(f, "{}", name),
            LockKey::Avoidance(lock) => write!(
                f,
                "<DeadlockAvoidance#{}: {}>",
                lock.serial, lock.declaring_class
            ),
        }
    }
}

/// Points-to set of a lock (allocation sites the lock reference may point to)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsToSet {
    pub allocation_sites: BTreeSet<String>,
}

impl PointsToSet {
    pub fn new<I, S>(sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allocation_sites: sites.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.allocation_sites.is_empty()
    }
}

/// Lock-numbering table plus the points-to table it indexes
///
/// Append-only: numbers handed out are never reused or removed. Slot 0 of
/// the points-to table is a placeholder so that no lock is numbered 0.
#[derive(Debug, Clone)]
pub struct LockTable {
    lock_to_lock_num: FxHashMap<LockKey, LockNum>,
    points_to_sets: Vec<PointsToSet>,
    next_avoidance_serial: u32,
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            lock_to_lock_num: FxHashMap::default(),
            points_to_sets: vec![PointsToSet::default()],
            next_avoidance_serial: 0,
        }
    }

    /// Register a class-level lock; re-registering returns the existing number
    pub fn register_static(&mut self, key: LockKey) -> LockNum {
        if let Some(&num) = self.lock_to_lock_num.get(&key) {
            return num;
        }
        let num = LockNum(-(self.points_to_sets.len() as i32));
        self.points_to_sets.push(PointsToSet::default());
        self.lock_to_lock_num.insert(key, num);
        num
    }

    /// Register a heap lock with its points-to set
    pub fn register_dynamic(&mut self, key: LockKey, points_to: PointsToSet) -> LockNum {
        if let Some(&num) = self.lock_to_lock_num.get(&key) {
            return num;
        }
        let num = LockNum(self.points_to_sets.len() as i32);
        self.points_to_sets.push(points_to);
        self.lock_to_lock_num.insert(key, num);
        num
    }

    /// Map another key onto an already allocated number (must-alias locks)
    pub fn alias(&mut self, key: LockKey, num: LockNum) -> Result<()> {
        if !self.is_allocated(num) {
            return Err(LockOrderError::UnknownLock(format!("lock #{}", num)));
        }
        if let Some(&existing) = self.lock_to_lock_num.get(&key) {
            if existing != num {
                return Err(LockOrderError::invalid_model(format!(
                    "'{}' is already lock {} and cannot alias lock {}",
                    key, existing, num
                )));
            }
            return Ok(());
        }
        self.lock_to_lock_num.insert(key, num);
        Ok(())
    }

    /// Allocate a fresh avoidance lock as a static lock
    pub fn synthesize_avoidance_lock(&mut self, declaring_class: &str) -> (LockKey, LockNum) {
        let key = LockKey::Avoidance(AvoidanceLock {
            serial: self.next_avoidance_serial,
            declaring_class: declaring_class.to_string(),
        });
        self.next_avoidance_serial += 1;
        let num = self.register_static(key.clone());
        (key, num)
    }

    pub fn lock_num(&self, key: &LockKey) -> Result<LockNum> {
        self.lock_to_lock_num
            .get(key)
            .copied()
            .ok_or_else(|| LockOrderError::UnknownLock(key.to_string()))
    }

    pub fn contains(&self, key: &LockKey) -> bool {
        self.lock_to_lock_num.contains_key(key)
    }

    pub fn is_allocated(&self, num: LockNum) -> bool {
        num.0 != 0 && (num.0.unsigned_abs() as usize) < self.points_to_sets.len()
    }

    /// Points-to set of a dynamic lock (static locks carry a placeholder)
    pub fn points_to_set(&self, num: LockNum) -> Option<&PointsToSet> {
        if num.0 == 0 {
            return None;
        }
        self.points_to_sets.get(num.0.unsigned_abs() as usize)
    }

    /// Number of registered keys (aliases included)
    pub fn len(&self) -> usize {
        self.lock_to_lock_num.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_to_lock_num.is_empty()
    }

    /// Length of the points-to table, placeholder slot included
    pub fn points_to_len(&self) -> usize {
        self.points_to_sets.len()
    }

    /// Render a lockset as lock numbers, e.g. `[1, 2, -3]`
    pub fn format_lockset(&self, lockset: &[LockKey]) -> String {
        let nums: Vec<String> = lockset
            .iter()
            .map(|key| match self.lock_to_lock_num.get(key) {
                Some(num) => num.to_string(),
                None => "?".to_string(),
            })
            .collect();
        format!("[{}]", nums.join(", "))
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}
