pub mod application;
/// Lock-Order Analysis Feature
///
/// Static lock-order deadlock detection and repair over pre-extracted
/// critical sections.
///
/// ## Features
/// - **Group Detection**: partial order over critical section groups, repaired by merging groups
/// - **Lockset Detection**: partial order over lock numbers, repaired with deadlock avoidance locks
/// - **Lockset Reordering**: rewrite locksets to follow the order visible to each section
///
/// ## Architecture
/// - **Domain**: AnalysisContext arena, CriticalSection, LockTable, detection outcomes
/// - **Infrastructure**: detectors, reorderer, FilteredCallGraph, JSON program loader
/// - **Application**: LockOrderAnalysis use case and report
/// - **Ports**: ReachabilityOracle trait
///
/// ## Performance
/// - Group mode: O(S² × G) per pass with successor expansion, O(S² + S × G) with the closure
/// - Lockset mode: O(S² × L²) per pass
pub mod domain;
pub mod infrastructure;
pub mod ports;

// Re-export application layer (primary interface)
pub use application::*;

// Re-export domain types
pub use domain::*;

// Re-export infrastructure (internal use - prefer application layer)
#[doc(hidden)]
pub use infrastructure::*;

pub use ports::*;
