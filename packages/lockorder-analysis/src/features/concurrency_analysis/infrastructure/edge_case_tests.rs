/// Edge case tests for the lock-order detectors
///
/// Tests cover:
/// - Empty contexts
/// - Sections without locks or call sites
/// - Recursive sections re-entering their own guard
/// - Class-level locks only
/// - Unregistered locks

#[cfg(test)]
mod edge_case_tests {
    use crate::config::{DetectionMode, LockOrderConfig, Preset};
    use crate::errors::LockOrderError;
    use crate::features::concurrency_analysis::domain::*;
    use crate::features::concurrency_analysis::infrastructure::{
        FilteredCallGraph, GroupDeadlockDetector, LocksetDeadlockDetector,
    };

    /// One group; each entry is (locks, callee indices); names ending in
    /// `.class` are static
    fn program(sections: &[(&[&str], &[usize])]) -> (AnalysisContext, FilteredCallGraph) {
        let mut ctx = AnalysisContext::new();
        let mut graph = FilteredCallGraph::new();
        let group = ctx.add_group();

        let guards: Vec<MethodId> = (0..sections.len())
            .map(|i| graph.add_method(format!("E{}.guard", i)))
            .collect();
        for (i, (locks, callees)) in sections.iter().enumerate() {
            let body = graph.add_method(format!("E{}.body", i));
            let mut tn = CriticalSection::new(format!("E{}", i), guards[i], format!("E{}", i));
            for lock in locks.iter() {
                let key = LockKey::value(*lock);
                if lock.ends_with(".class") {
                    ctx.lock_table_mut().register_static(key.clone());
                } else {
                    ctx.lock_table_mut()
                        .register_dynamic(key.clone(), PointsToSet::default());
                }
                tn = tn.with_lock(key);
            }
            for &callee in callees.iter() {
                tn = tn.with_invoke(graph.add_call(body, guards[callee]).unwrap());
            }
            ctx.add_section_in_group(tn, group).unwrap();
        }
        (ctx, graph)
    }

    fn group_config(repair: bool) -> LockOrderConfig {
        LockOrderConfig::from_preset(Preset::Custom)
            .mode(DetectionMode::Group)
            .repair(repair)
    }

    #[test]
    fn test_empty_context() {
        let graph = FilteredCallGraph::new();

        let config = group_config(true);
        let result = GroupDeadlockDetector::new(&config)
            .detect(&mut AnalysisContext::new(), &graph)
            .unwrap();
        assert_eq!(result.status, DetectionStatus::Acyclic);
        assert_eq!(result.order.node_count(), 0);

        let config = LockOrderConfig::from_preset(Preset::Repair);
        let result = LocksetDeadlockDetector::new(&config)
            .detect(&mut AnalysisContext::new(), &graph)
            .unwrap();
        assert_eq!(result.status, DetectionStatus::Acyclic);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.order.node_count(), 0);
    }

    #[test]
    fn test_empty_locksets_produce_no_edges() {
        let (mut ctx, graph) = program(&[(&[], &[1]), (&[], &[0])]);
        let config = LockOrderConfig::from_preset(Preset::Detect);
        let result = LocksetDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();
        assert_eq!(result.status, DetectionStatus::Acyclic);
        assert_eq!(result.order.edge_count(), 0);
    }

    #[test]
    fn test_sections_without_call_sites() {
        let (mut ctx, graph) = program(&[(&["a", "b"], &[]), (&["b", "a"], &[])]);
        let config = LockOrderConfig::from_preset(Preset::Detect);
        let result = LocksetDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();
        // opposite lock orders, but neither section reaches the other
        assert_eq!(result.status, DetectionStatus::Acyclic);
        assert_eq!(ctx.sections()[0].targets().map(|t| t.len()), Some(0));
    }

    #[test]
    fn test_recursive_section_repaired_with_one_lock() {
        let (mut ctx, graph) = program(&[(&["a", "b"], &[0])]);

        let detect = LockOrderConfig::from_preset(Preset::Detect);
        let reported = LocksetDeadlockDetector::new(&detect)
            .detect(&mut ctx.clone(), &graph)
            .unwrap();
        assert!(reported.status.deadlock_reported());

        let repair = LockOrderConfig::from_preset(Preset::Repair);
        let result = LocksetDeadlockDetector::new(&repair)
            .detect(&mut ctx, &graph)
            .unwrap();
        assert_eq!(result.status, DetectionStatus::Repaired { repairs: 1 });
        assert_eq!(ctx.format_lockset(SectionId(0)).unwrap(), "[1, 2, -3]");
    }

    #[test]
    fn test_shared_class_lock_only() {
        let (mut ctx, graph) = program(&[(&["G.class"], &[1]), (&["G.class"], &[0])]);
        let config = LockOrderConfig::from_preset(Preset::Detect);
        let result = LocksetDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();
        assert_eq!(result.status, DetectionStatus::Acyclic);
        assert_eq!(result.order.node_count(), 1);
    }

    #[test]
    fn test_group_self_edges_ignored_when_repairing() {
        let (mut ctx, graph) = program(&[(&["a"], &[1]), (&["a"], &[0])]);
        let config = group_config(true).allow_self_edges(true);
        let result = GroupDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();
        assert_eq!(result.status, DetectionStatus::Acyclic);
        assert_eq!(result.order.edge_count(), 0);
    }

    #[test]
    fn test_group_self_edges_report_same_group_cycle() {
        let (mut ctx, graph) = program(&[(&["a"], &[1]), (&["a"], &[0])]);
        let config = group_config(false).allow_self_edges(true);
        let result = GroupDeadlockDetector::new(&config)
            .detect(&mut ctx, &graph)
            .unwrap();
        assert!(result.status.deadlock_reported());
    }

    #[test]
    fn test_unregistered_lock_is_an_error() {
        let (mut ctx, graph) = program(&[(&["a"], &[])]);
        ctx.section_mut(SectionId(0))
            .unwrap()
            .lockset
            .push(LockKey::value("ghost"));

        let config = LockOrderConfig::from_preset(Preset::Detect);
        let result = LocksetDeadlockDetector::new(&config).detect(&mut ctx, &graph);
        assert!(matches!(result, Err(LockOrderError::UnknownLock(_))));
    }
}
