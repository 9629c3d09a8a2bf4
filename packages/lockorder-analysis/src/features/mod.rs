//! Feature modules - Each feature follows Hexagonal Architecture
//!
//! Each feature contains:
//! - domain/     - Pure business logic (no external dependencies)
//! - ports/      - Interface definitions (traits)
//! - application/ - Use cases
//! - infrastructure/ - External dependency implementations

// Lock-order deadlock detection, repair and lockset reordering
pub mod concurrency_analysis;
