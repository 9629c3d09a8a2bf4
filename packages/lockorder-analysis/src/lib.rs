/*
 * Lockorder Analysis - Static Lock-Order Deadlock Detection & Repair
 *
 * Feature-First Hexagonal Architecture:
 * - features/    : Vertical slices (concurrency_analysis: domain → ports → infrastructure → application)
 * - config/      : Preset + override + YAML configuration
 * - errors       : Crate-wide error type
 *
 * Pipeline:
 * - critical sections + reachability oracle → group or lockset detector → lockset reorderer
 * - single-threaded, deterministic, iterate-to-fixed-point with in-place repair
 */

#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{LockOrderConfig, Preset};
pub use errors::{LockOrderError, Result};
pub use features::concurrency_analysis::{
    AnalysisContext, CriticalSection, FilteredCallGraph, LockOrderAnalysis, LockOrderReport,
    ReachabilityOracle,
};
