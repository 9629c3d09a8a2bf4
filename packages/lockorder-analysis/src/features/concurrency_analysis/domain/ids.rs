/// Arena indices and numeric identities
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a critical section in the `AnalysisContext` arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub usize);

/// Index of a critical section group in the `AnalysisContext` arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub usize);

/// Method identity supplied by the external call graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodId(pub u32);

/// Call site identity supplied by the external call graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallSiteId(pub u32);

/// Integer lock identity
///
/// Negative numbers are static (class-level) locks, positive numbers index
/// the points-to table of dynamic locks. Zero is never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockNum(pub i32);

impl LockNum {
    pub fn is_static(self) -> bool {
        self.0 < 0
    }

    pub fn is_dynamic(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for LockNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tn{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_num_kind() {
        assert!(LockNum(-3).is_static());
        assert!(!LockNum(-3).is_dynamic());
        assert!(LockNum(4).is_dynamic());
        assert!(!LockNum(0).is_static() && !LockNum(0).is_dynamic());
    }

    #[test]
    fn test_serde_transparent() {
        assert_eq!(serde_json::to_string(&LockNum(-2)).unwrap(), "-2");
        assert_eq!(serde_json::to_string(&SectionId(7)).unwrap(), "7");
    }
}
