//! FilteredCallGraph - call graph adapter implementing `ReachabilityOracle`
//!
//! Stores call sites per method and their target edges. Reachability follows
//! only the edges the critical-section visibility filter keeps:
//! - static initializer edges run in class-init context, not under the caller's locks
//! - thread start edges run the target on another thread
//! - targets inside opaque library prefixes (e.g. `java.`) are not analyzed
//!
//! `reachable_targets` is lazy: methods are discovered breadth-first as the
//! iterator is pulled, each yielded once.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::errors::{LockOrderError, Result};
use crate::features::concurrency_analysis::domain::{CallSiteId, MethodId};
use crate::features::concurrency_analysis::ports::ReachabilityOracle;

/// Kind of call edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallEdgeKind {
    /// Statically bound call
    Direct,
    /// Dispatch through a receiver type
    Virtual,
    /// Implicit class initializer invocation
    StaticInitializer,
    /// `Thread.start()` style edge into another thread's entry point
    ThreadStart,
}

/// Call edge from a call site to one possible target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallEdge {
    pub target: MethodId,
    pub kind: CallEdgeKind,
}

/// Edge filter keeping only edges visible to critical sections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalSectionVisibleEdges {
    excluded_prefixes: Vec<String>,
}

impl CriticalSectionVisibleEdges {
    pub fn new(excluded_prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            excluded_prefixes: excluded_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn want(&self, edge: &CallEdge, target_name: &str) -> bool {
        match edge.kind {
            CallEdgeKind::StaticInitializer | CallEdgeKind::ThreadStart => false,
            CallEdgeKind::Direct | CallEdgeKind::Virtual => !self
                .excluded_prefixes
                .iter()
                .any(|prefix| target_name.starts_with(prefix.as_str())),
        }
    }
}

#[derive(Debug, Clone)]
struct CallSiteRecord {
    caller: MethodId,
    edges: Vec<CallEdge>,
}

/// Call graph with a visibility filter
#[derive(Debug, Clone, Default)]
pub struct FilteredCallGraph {
    method_names: Vec<String>,
    methods_by_name: FxHashMap<String, MethodId>,
    call_sites: Vec<CallSiteRecord>,
    sites_in_method: FxHashMap<MethodId, Vec<CallSiteId>>,
    filter: CriticalSectionVisibleEdges,
}

impl FilteredCallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: CriticalSectionVisibleEdges) -> Self {
        self.filter = filter;
        self
    }

    pub fn set_filter(&mut self, filter: CriticalSectionVisibleEdges) {
        self.filter = filter;
    }

    /// Intern a method by qualified name
    pub fn add_method(&mut self, name: impl Into<String>) -> MethodId {
        let name = name.into();
        if let Some(&id) = self.methods_by_name.get(&name) {
            return id;
        }
        let id = MethodId(self.method_names.len() as u32);
        self.method_names.push(name.clone());
        self.methods_by_name.insert(name, id);
        id
    }

    /// Create a call site inside `caller`
    pub fn add_call_site(&mut self, caller: MethodId) -> Result<CallSiteId> {
        self.check_method(caller)?;
        let id = CallSiteId(self.call_sites.len() as u32);
        self.call_sites.push(CallSiteRecord {
            caller,
            edges: Vec::new(),
        });
        self.sites_in_method.entry(caller).or_default().push(id);
        Ok(id)
    }

    pub fn add_call_edge(
        &mut self,
        site: CallSiteId,
        target: MethodId,
        kind: CallEdgeKind,
    ) -> Result<()> {
        self.check_method(target)?;
        let record = self
            .call_sites
            .get_mut(site.0 as usize)
            .ok_or_else(|| LockOrderError::invalid_model(format!("unknown call site #{}", site.0)))?;
        let edge = CallEdge { target, kind };
        if !record.edges.contains(&edge) {
            record.edges.push(edge);
        }
        Ok(())
    }

    /// Convenience: new call site in `caller` with a single direct edge
    pub fn add_call(&mut self, caller: MethodId, target: MethodId) -> Result<CallSiteId> {
        let site = self.add_call_site(caller)?;
        self.add_call_edge(site, target, CallEdgeKind::Direct)?;
        Ok(site)
    }

    pub fn method_id(&self, name: &str) -> Option<MethodId> {
        self.methods_by_name.get(name).copied()
    }

    pub fn method_name(&self, id: MethodId) -> Option<&str> {
        self.method_names.get(id.0 as usize).map(String::as_str)
    }

    pub fn caller_of(&self, site: CallSiteId) -> Option<MethodId> {
        self.call_sites.get(site.0 as usize).map(|r| r.caller)
    }

    pub fn method_count(&self) -> usize {
        self.method_names.len()
    }

    /// Direct targets of a call site that pass the filter
    pub fn visible_targets(&self, site: CallSiteId) -> impl Iterator<Item = MethodId> + '_ {
        self.call_sites
            .get(site.0 as usize)
            .into_iter()
            .flat_map(|record| record.edges.iter())
            .filter(move |edge| {
                let name = self.method_name(edge.target).unwrap_or_default();
                self.filter.want(edge, name)
            })
            .map(|edge| edge.target)
    }

    fn check_method(&self, id: MethodId) -> Result<()> {
        if (id.0 as usize) < self.method_names.len() {
            Ok(())
        } else {
            Err(LockOrderError::invalid_model(format!(
                "unknown method #{}",
                id.0
            )))
        }
    }
}

impl ReachabilityOracle for FilteredCallGraph {
    fn reachable_targets<'a>(
        &'a self,
        call_site: CallSiteId,
    ) -> Box<dyn Iterator<Item = MethodId> + 'a> {
        Box::new(ReachableMethods::new(self, call_site))
    }
}

/// Lazy breadth-first walk over visible call edges
struct ReachableMethods<'a> {
    graph: &'a FilteredCallGraph,
    worklist: VecDeque<MethodId>,
    seen: FxHashSet<MethodId>,
}

impl<'a> ReachableMethods<'a> {
    fn new(graph: &'a FilteredCallGraph, start: CallSiteId) -> Self {
        let mut walk = Self {
            graph,
            worklist: VecDeque::new(),
            seen: FxHashSet::default(),
        };
        walk.enqueue_targets(start);
        walk
    }

    fn enqueue_targets(&mut self, site: CallSiteId) {
        for target in self.graph.visible_targets(site) {
            if self.seen.insert(target) {
                self.worklist.push_back(target);
            }
        }
    }
}

impl Iterator for ReachableMethods<'_> {
    type Item = MethodId;

    fn next(&mut self) -> Option<MethodId> {
        let method = self.worklist.pop_front()?;
        if let Some(sites) = self.graph.sites_in_method.get(&method) {
            for &site in sites {
                self.enqueue_targets(site);
            }
        }
        Some(method)
    }
}
