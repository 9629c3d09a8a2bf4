//! Test fixtures
//!
//! Canonical lock-order scenarios and the path of the JSON fixtures.

use std::path::PathBuf;

use lockorder_analysis::features::concurrency_analysis::{AnalysisContext, FilteredCallGraph};

use super::builders::ProgramBuilder;

/// A{L1,L2} -> B{L2,L3} -> C{L3,L1} -> A, one group
pub fn three_way_cycle() -> (AnalysisContext, FilteredCallGraph) {
    ProgramBuilder::new(1)
        .dynamic_locks(&["L1", "L2", "L3"])
        .section("A", 0, &["L1", "L2"], &[1])
        .section("B", 0, &["L2", "L3"], &[2])
        .section("C", 0, &["L3", "L1"], &[0])
        .build()
}

/// First[a,b] and Second[b,a] calling each other, one group each
pub fn two_way_cycle() -> (AnalysisContext, FilteredCallGraph) {
    ProgramBuilder::new(2)
        .dynamic_locks(&["a", "b"])
        .section("First", 0, &["a", "b"], &[1])
        .section("Second", 1, &["b", "a"], &[0])
        .build()
}

/// A{L1} -> B{L2} -> C{L3}, each in its own group
pub fn ordered_chain() -> (AnalysisContext, FilteredCallGraph) {
    ProgramBuilder::new(3)
        .dynamic_locks(&["L1", "L2", "L3"])
        .section("A", 0, &["L1"], &[1])
        .section("B", 1, &["L2"], &[2])
        .section("C", 2, &["L3"], &[])
        .build()
}

/// Path to a file under `tests/fixtures`
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
