//! Lock Order Analysis Application Layer (UseCase)

mod analyze_lock_order;
mod report;

pub use analyze_lock_order::LockOrderAnalysis;
pub use report::{
    AvoidanceLockReport, ConflictKind, ConflictReport, LockOrderReport, OrderEdge, SectionLockset,
};
