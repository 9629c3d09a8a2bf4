/// Analysis context: arena owning every critical section, group and lock number
///
/// Detectors refer to records by `SectionId`/`GroupId` only, so group merges
/// and lockset rewrites never leave stale references behind across restarts.
use super::critical_section::{CriticalSection, CriticalSectionGroup};
use super::ids::{GroupId, LockNum, SectionId};
use super::lock::{LockKey, LockTable};
use crate::errors::{LockOrderError, Result};

#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    sections: Vec<CriticalSection>,
    groups: Vec<CriticalSectionGroup>,
    locks: LockTable,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_table(locks: LockTable) -> Self {
        Self {
            locks,
            ..Self::default()
        }
    }

    // ------------------------------------------------------------------
    // Arena construction
    // ------------------------------------------------------------------

    /// Create an empty group; group numbers start at 1
    pub fn add_group(&mut self) -> GroupId {
        let id = GroupId(self.groups.len());
        self.groups
            .push(CriticalSectionGroup::new(id, self.groups.len() as i32 + 1));
        id
    }

    /// Add an unclassified (unlocked) section
    pub fn add_section(&mut self, mut section: CriticalSection) -> SectionId {
        section.group = None;
        section.set_number = 0;
        let id = SectionId(self.sections.len());
        self.sections.push(section);
        id
    }

    pub fn add_section_in_group(
        &mut self,
        section: CriticalSection,
        group: GroupId,
    ) -> Result<SectionId> {
        let id = self.add_section(section);
        self.assign_group(id, group)?;
        Ok(id)
    }

    /// Classify a section into a group, leaving any previous group
    pub fn assign_group(&mut self, section: SectionId, group: GroupId) -> Result<()> {
        let group_num = self.group(group)?.group_num;
        let previous = self.section(section)?.group;
        if let Some(previous) = previous {
            self.groups[previous.0].members.remove(&section);
        }
        self.groups[group.0].members.insert(section);
        let tn = &mut self.sections[section.0];
        tn.group = Some(group);
        tn.set_number = group_num;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn section(&self, id: SectionId) -> Result<&CriticalSection> {
        self.sections
            .get(id.0)
            .ok_or(LockOrderError::UnknownSection(id.0))
    }

    pub fn section_mut(&mut self, id: SectionId) -> Result<&mut CriticalSection> {
        self.sections
            .get_mut(id.0)
            .ok_or(LockOrderError::UnknownSection(id.0))
    }

    pub fn sections(&self) -> &[CriticalSection] {
        &self.sections
    }

    /// Section ids in input list order
    pub fn section_ids(&self) -> impl Iterator<Item = SectionId> {
        (0..self.sections.len()).map(SectionId)
    }

    pub fn group(&self, id: GroupId) -> Result<&CriticalSectionGroup> {
        self.groups.get(id.0).ok_or(LockOrderError::UnknownGroup(id.0))
    }

    pub fn groups(&self) -> &[CriticalSectionGroup] {
        &self.groups
    }

    /// Groups still holding at least one section
    pub fn live_group_count(&self) -> usize {
        self.groups.iter().filter(|g| !g.is_empty()).count()
    }

    pub fn lock_table(&self) -> &LockTable {
        &self.locks
    }

    pub fn lock_table_mut(&mut self) -> &mut LockTable {
        &mut self.locks
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    // ------------------------------------------------------------------
    // Lock queries
    // ------------------------------------------------------------------

    /// Lock numbers of a section's lockset, in acquisition order
    pub fn lock_nums(&self, id: SectionId) -> Result<Vec<LockNum>> {
        self.section(id)?
            .lockset
            .iter()
            .map(|key| self.locks.lock_num(key))
            .collect()
    }

    /// True if some static lock of `a` is also held by `b`
    pub fn shares_static_lock(&self, a: SectionId, b: SectionId) -> Result<bool> {
        let b_locks = self.lock_nums(b)?;
        Ok(self
            .lock_nums(a)?
            .into_iter()
            .any(|num| num.is_static() && b_locks.contains(&num)))
    }

    pub fn format_lockset(&self, id: SectionId) -> Result<String> {
        Ok(self.locks.format_lockset(&self.section(id)?.lockset))
    }

    // ------------------------------------------------------------------
    // Repair mutations
    // ------------------------------------------------------------------

    /// Merge `from` into `into`: every member of `from` adopts `into`'s
    /// group and set number, and `from` is left empty. Irreversible.
    pub fn merge_groups(&mut self, into: GroupId, from: GroupId) -> Result<()> {
        let group_num = self.group(into)?.group_num;
        self.group(from)?;
        if into == from {
            return Ok(());
        }

        let moved = std::mem::take(&mut self.groups[from.0].members);
        for &member in &moved {
            let tn = &mut self.sections[member.0];
            tn.group = Some(into);
            tn.set_number = group_num;
        }
        self.groups[into.0].members.extend(moved);
        Ok(())
    }

    /// Append a lock to a section's lockset unless already held
    pub fn acquire_additionally(&mut self, id: SectionId, lock: LockKey) -> Result<bool> {
        let tn = self.section_mut(id)?;
        if tn.holds(&lock) {
            return Ok(false);
        }
        tn.lockset.push(lock);
        Ok(true)
    }

    /// Replace a section's lockset (reorderer output)
    pub fn replace_lockset(&mut self, id: SectionId, lockset: Vec<LockKey>) -> Result<()> {
        self.section_mut(id)?.lockset = lockset;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    /// Check the data model invariants the detectors rely on
    pub fn validate(&self) -> Result<()> {
        for (idx, tn) in self.sections.iter().enumerate() {
            for key in &tn.lockset {
                self.locks.lock_num(key)?;
            }

            match tn.group {
                Some(group) => {
                    let group = self.group(group)?;
                    if !group.members.contains(&SectionId(idx)) {
                        return Err(LockOrderError::invalid_context(format!(
                            "section '{}' is not a member of its group #{}",
                            tn.name, group.id.0
                        )));
                    }
                    if tn.set_number != group.group_num {
                        return Err(LockOrderError::invalid_context(format!(
                            "section '{}' has set number {} but its group is numbered {}",
                            tn.name, tn.set_number, group.group_num
                        )));
                    }
                }
                None if tn.set_number > 0 => {
                    return Err(LockOrderError::invalid_context(format!(
                        "section '{}' is locked (set number {}) but has no group",
                        tn.name, tn.set_number
                    )));
                }
                None => {}
            }
        }

        for group in &self.groups {
            if group.group_num <= 0 {
                return Err(LockOrderError::invalid_context(format!(
                    "group #{} has non-positive number {}",
                    group.id.0, group.group_num
                )));
            }
            for member in &group.members {
                if self.section(*member)?.group != Some(group.id) {
                    return Err(LockOrderError::invalid_context(format!(
                        "group #{} lists section #{} which belongs elsewhere",
                        group.id.0, member.0
                    )));
                }
            }
        }

        Ok(())
    }
}
