//! Custom assertions for lock-order results

use lockorder_analysis::features::concurrency_analysis::{
    AnalysisContext, LockKey, LockOrderReport, SectionId,
};

/// Assert that the report ends deadlock-free
pub fn assert_deadlock_free(report: &LockOrderReport) {
    assert!(
        report.is_deadlock_free(),
        "Expected a deadlock-free result, got {}:\n{}",
        report.status.label(),
        report.render_text()
    );
}

/// Snapshot of every section's lockset
pub fn locksets(ctx: &AnalysisContext) -> Vec<Vec<LockKey>> {
    ctx.sections().iter().map(|tn| tn.lockset.clone()).collect()
}

/// Snapshot of every section's group
pub fn section_groups(ctx: &AnalysisContext) -> Vec<Option<usize>> {
    ctx.sections().iter().map(|tn| tn.group.map(|g| g.0)).collect()
}

/// Assert that `after` holds the same locks as `before`, in any order
pub fn assert_same_locks(ctx: &AnalysisContext, id: SectionId, before: &[LockKey]) {
    let mut expected = before.to_vec();
    let mut actual = ctx.section(id).expect("section exists").lockset.clone();
    expected.sort_by_key(|k| k.to_string());
    actual.sort_by_key(|k| k.to_string());
    assert_eq!(actual, expected, "section {} changed its lock set", id.0);
}
