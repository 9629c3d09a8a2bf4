//! Test data builders
//!
//! `ProgramBuilder` lays out one guard method and one body method per
//! section; each `calls` entry adds a call site in the body to the callee's
//! guard, and the section invokes it.

use lockorder_analysis::features::concurrency_analysis::{
    AnalysisContext, CriticalSection, FilteredCallGraph, GroupId, LockKey, MethodId, PointsToSet,
};

/// Builder for a context plus the call graph its sections reach through
#[derive(Debug)]
pub struct ProgramBuilder {
    ctx: AnalysisContext,
    graph: FilteredCallGraph,
    groups: Vec<GroupId>,
    sections: Vec<SectionSpec>,
}

#[derive(Debug, Clone)]
struct SectionSpec {
    name: String,
    locks: Vec<String>,
    calls: Vec<usize>,
    group: Option<usize>,
}

impl ProgramBuilder {
    /// Create a builder with `groups` empty groups
    pub fn new(groups: usize) -> Self {
        let mut ctx = AnalysisContext::new();
        let groups = (0..groups).map(|_| ctx.add_group()).collect();
        Self {
            ctx,
            graph: FilteredCallGraph::new(),
            groups,
            sections: Vec::new(),
        }
    }

    /// Register dynamic locks in order (numbered 1, 2, ...)
    pub fn dynamic_locks(mut self, names: &[&str]) -> Self {
        for name in names {
            self.ctx
                .lock_table_mut()
                .register_dynamic(LockKey::value(*name), PointsToSet::new([format!("new@{}", name)]));
        }
        self
    }

    /// Register class-level locks
    pub fn static_locks(mut self, names: &[&str]) -> Self {
        for name in names {
            self.ctx.lock_table_mut().register_static(LockKey::value(*name));
        }
        self
    }

    /// Add a section in group `group`
    pub fn section(mut self, name: &str, group: usize, locks: &[&str], calls: &[usize]) -> Self {
        self.sections.push(SectionSpec {
            name: name.to_string(),
            locks: locks.iter().map(|l| l.to_string()).collect(),
            calls: calls.to_vec(),
            group: Some(group),
        });
        self
    }

    /// Add a section with no lockset and no group
    pub fn unlocked_section(mut self, name: &str, calls: &[usize]) -> Self {
        self.sections.push(SectionSpec {
            name: name.to_string(),
            locks: Vec::new(),
            calls: calls.to_vec(),
            group: None,
        });
        self
    }

    pub fn build(self) -> (AnalysisContext, FilteredCallGraph) {
        let Self {
            mut ctx,
            mut graph,
            groups,
            sections,
        } = self;

        let guards: Vec<MethodId> = sections
            .iter()
            .map(|s| graph.add_method(format!("app.{}.guard", s.name)))
            .collect();

        for (i, spec) in sections.iter().enumerate() {
            let body = graph.add_method(format!("app.{}.body", spec.name));
            let mut tn = CriticalSection::new(spec.name.clone(), guards[i], format!("app.{}", spec.name))
                .with_locks(spec.locks.iter().map(|l| LockKey::value(l.clone())));
            for &callee in &spec.calls {
                let site = graph.add_call(body, guards[callee]).expect("call site");
                tn = tn.with_invoke(site);
            }
            match spec.group {
                Some(g) => {
                    ctx.add_section_in_group(tn, groups[g]).expect("group exists");
                }
                None => {
                    ctx.add_section(tn);
                }
            }
        }
        (ctx, graph)
    }
}
