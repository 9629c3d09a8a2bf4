//! ProgramModel - JSON model of pre-extracted program facts
//!
//! Input to the analysis when it runs outside a host compiler: the call
//! graph, lock declarations with points-to sets, groups and critical
//! sections. `build` resolves every name and produces the arena and the
//! call graph the detectors consume.
//!
//! ```json
//! {
//!   "methods": [
//!     { "name": "app.Bank.transfer", "calls": [{ "label": "t0", "targets": ["app.Account.debit"] }] },
//!     { "name": "app.Account.debit" }
//!   ],
//!   "locks": [
//!     { "name": "this.lock", "kind": "dynamic", "points_to": ["new Object@Bank:12"] },
//!     { "name": "Bank.class", "kind": "static" }
//!   ],
//!   "groups": 1,
//!   "critical_sections": [
//!     { "name": "transfer", "method": "app.Bank.transfer", "lockset": ["this.lock"], "group": 0 }
//!   ]
//! }
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::call_graph::{CallEdgeKind, FilteredCallGraph};
use crate::errors::{LockOrderError, Result};
use crate::features::concurrency_analysis::domain::{
    AnalysisContext, CallSiteId, CriticalSection, GroupId, LockKey, MethodId, PointsToSet,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgramModel {
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
    #[serde(default)]
    pub locks: Vec<LockSpec>,
    /// Number of groups; sections refer to them by index
    #[serde(default)]
    pub groups: usize,
    #[serde(default)]
    pub critical_sections: Vec<CriticalSectionSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MethodSpec {
    /// Qualified name, `pkg.Class.method`
    pub name: String,
    /// Defaults to the name up to the last `.`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaring_class: Option<String>,
    #[serde(default)]
    pub calls: Vec<CallSpec>,
}

impl MethodSpec {
    pub fn declaring_class(&self) -> &str {
        match &self.declaring_class {
            Some(class) => class,
            None => self
                .name
                .rsplit_once('.')
                .map_or(self.name.as_str(), |(class, _)| class),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallSpec {
    /// Name sections use to list this call site in `invokes`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub targets: Vec<String>,
    #[serde(default = "default_call_kind")]
    pub kind: CallEdgeKind,
}

fn default_call_kind() -> CallEdgeKind {
    CallEdgeKind::Direct
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockSpec {
    pub name: String,
    pub kind: LockKind,
    /// Allocation sites; dynamic locks only
    #[serde(default)]
    pub points_to: Vec<String>,
    /// Other expressions that must alias this lock
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriticalSectionSpec {
    pub name: String,
    /// Guard-entry method
    pub method: String,
    /// Call site labels inside the region; all call sites of `method` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invokes: Option<Vec<String>>,
    pub lockset: Vec<String>,
    /// Group index; unlocked when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
}

/// Context and call graph built from a model
#[derive(Debug, Clone)]
pub struct LoadedProgram {
    pub context: AnalysisContext,
    pub call_graph: FilteredCallGraph,
}

impl ProgramModel {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolve names and build the analysis inputs
    pub fn build(&self) -> Result<LoadedProgram> {
        let mut call_graph = FilteredCallGraph::new();
        let mut context = AnalysisContext::new();

        for method in &self.methods {
            if call_graph.method_id(&method.name).is_some() {
                return Err(LockOrderError::invalid_model(format!(
                    "method '{}' declared twice",
                    method.name
                )));
            }
            call_graph.add_method(method.name.clone());
        }

        let mut labelled_sites: FxHashMap<&str, CallSiteId> = FxHashMap::default();
        let mut sites_by_method: FxHashMap<&str, Vec<CallSiteId>> = FxHashMap::default();
        for method in &self.methods {
            let caller = self.resolve_method(&call_graph, &method.name)?;
            for call in &method.calls {
                let site = call_graph.add_call_site(caller)?;
                for target in &call.targets {
                    let target = self.resolve_method(&call_graph, target)?;
                    call_graph.add_call_edge(site, target, call.kind)?;
                }
                if let Some(label) = &call.label {
                    if labelled_sites.insert(label.as_str(), site).is_some() {
                        return Err(LockOrderError::invalid_model(format!(
                            "call site label '{}' used twice",
                            label
                        )));
                    }
                }
                sites_by_method
                    .entry(method.name.as_str())
                    .or_default()
                    .push(site);
            }
        }

        let table = context.lock_table_mut();
        for lock in &self.locks {
            let key = LockKey::value(lock.name.clone());
            if table.contains(&key) {
                return Err(LockOrderError::invalid_model(format!(
                    "lock '{}' declared twice",
                    lock.name
                )));
            }
            let num = match lock.kind {
                LockKind::Static => {
                    if !lock.points_to.is_empty() {
                        return Err(LockOrderError::invalid_model(format!(
                            "static lock '{}' cannot have a points-to set",
                            lock.name
                        )));
                    }
                    table.register_static(key)
                }
                LockKind::Dynamic => {
                    table.register_dynamic(key, PointsToSet::new(lock.points_to.iter().cloned()))
                }
            };
            for alias in &lock.aliases {
                table.alias(LockKey::value(alias.clone()), num)?;
            }
        }

        let groups: Vec<GroupId> = (0..self.groups).map(|_| context.add_group()).collect();

        for spec in &self.critical_sections {
            let method = self.resolve_method(&call_graph, &spec.method)?;
            let declaring_class = self
                .methods
                .iter()
                .find(|m| m.name == spec.method)
                .map(MethodSpec::declaring_class)
                .unwrap_or_default();

            let invokes = match &spec.invokes {
                Some(labels) => labels
                    .iter()
                    .map(|label| {
                        labelled_sites.get(label.as_str()).copied().ok_or_else(|| {
                            LockOrderError::invalid_model(format!(
                                "section '{}' invokes unknown call site '{}'",
                                spec.name, label
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
                None => sites_by_method
                    .get(spec.method.as_str())
                    .cloned()
                    .unwrap_or_default(),
            };

            let mut lockset = Vec::with_capacity(spec.lockset.len());
            for name in &spec.lockset {
                let key = LockKey::value(name.clone());
                if !context.lock_table().contains(&key) {
                    return Err(LockOrderError::invalid_model(format!(
                        "section '{}' acquires undeclared lock '{}'",
                        spec.name, name
                    )));
                }
                lockset.push(key);
            }

            let section = CriticalSection::new(spec.name.clone(), method, declaring_class)
                .with_invokes(invokes)
                .with_locks(lockset);

            match spec.group {
                Some(idx) => {
                    let group = groups.get(idx).copied().ok_or_else(|| {
                        LockOrderError::invalid_model(format!(
                            "section '{}' refers to group {} but only {} declared",
                            spec.name, idx, self.groups
                        ))
                    })?;
                    context.add_section_in_group(section, group)?;
                }
                None => {
                    context.add_section(section);
                }
            }
        }

        context.validate()?;
        Ok(LoadedProgram {
            context,
            call_graph,
        })
    }

    fn resolve_method(
        &self,
        call_graph: &FilteredCallGraph,
        name: &str,
    ) -> Result<MethodId> {
        call_graph
            .method_id(name)
            .ok_or_else(|| LockOrderError::invalid_model(format!("unknown method '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::concurrency_analysis::domain::{LockNum, SectionId};
    use crate::features::concurrency_analysis::ports::ReachabilityOracle;

    const BANK: &str = r#"{
        "methods": [
            { "name": "app.Bank.transfer",
              "calls": [{ "label": "t0", "targets": ["app.Account.debit"] },
                        { "targets": ["app.Audit.<clinit>"], "kind": "static_initializer" }] },
            { "name": "app.Account.debit" },
            { "name": "app.Audit.<clinit>" }
        ],
        "locks": [
            { "name": "bank.lock", "kind": "dynamic", "points_to": ["new Object@Bank:12"] },
            { "name": "Account.class", "kind": "static", "aliases": ["acct.getClass()"] }
        ],
        "groups": 2,
        "critical_sections": [
            { "name": "transfer", "method": "app.Bank.transfer", "lockset": ["bank.lock"], "group": 0 },
            { "name": "debit", "method": "app.Account.debit", "lockset": ["acct.getClass()"], "group": 1 },
            { "name": "audit", "method": "app.Audit.<clinit>", "lockset": [] }
        ]
    }"#;

    #[test]
    fn test_build_bank_model() {
        let program = ProgramModel::from_json(BANK).unwrap().build().unwrap();
        let ctx = &program.context;

        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.groups().len(), 2);
        assert_eq!(ctx.lock_nums(SectionId(0)).unwrap(), vec![LockNum(1)]);
        assert_eq!(ctx.lock_nums(SectionId(1)).unwrap(), vec![LockNum(-2)]);

        let transfer = &ctx.sections()[0];
        assert_eq!(transfer.declaring_class, "app.Bank");
        assert_eq!(transfer.invokes.len(), 2);
        assert!(!ctx.sections()[2].is_locked());

        // static initializer edge is filtered out
        let reached: Vec<_> = transfer
            .invokes
            .iter()
            .flat_map(|&site| program.call_graph.reachable_targets(site))
            .collect();
        assert_eq!(reached, vec![ctx.sections()[1].method]);
    }

    #[test]
    fn test_unknown_references_rejected() {
        let bad_lock = r#"{ "methods": [{ "name": "a.A.m" }],
            "critical_sections": [{ "name": "s", "method": "a.A.m", "lockset": ["nope"] }] }"#;
        let bad_group = r#"{ "methods": [{ "name": "a.A.m" }], "groups": 1,
            "critical_sections": [{ "name": "s", "method": "a.A.m", "lockset": [], "group": 3 }] }"#;
        let bad_target = r#"{ "methods": [{ "name": "a.A.m", "calls": [{ "targets": ["x.Y.z"] }] }] }"#;
        let bad_label = r#"{ "methods": [{ "name": "a.A.m" }],
            "critical_sections": [{ "name": "s", "method": "a.A.m", "invokes": ["c9"], "lockset": [] }] }"#;

        for json in [bad_lock, bad_group, bad_target, bad_label] {
            let result = ProgramModel::from_json(json).unwrap().build();
            assert!(
                matches!(result, Err(LockOrderError::InvalidModel(_))),
                "expected invalid model for {}",
                json
            );
        }
    }

    #[test]
    fn test_duplicate_declarations_rejected() {
        let twice = r#"{ "locks": [{ "name": "l", "kind": "static" }, { "name": "l", "kind": "dynamic" }] }"#;
        assert!(ProgramModel::from_json(twice).unwrap().build().is_err());

        let alias_clash = r#"{ "locks": [
            { "name": "a", "kind": "dynamic" },
            { "name": "S.class", "kind": "static", "aliases": ["a"] }
        ] }"#;
        assert!(matches!(
            ProgramModel::from_json(alias_clash).unwrap().build(),
            Err(LockOrderError::InvalidModel(_))
        ));

        let static_pts = r#"{ "locks": [{ "name": "l", "kind": "static", "points_to": ["x"] }] }"#;
        assert!(ProgramModel::from_json(static_pts).unwrap().build().is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{ "methods": [], "threads": [] }"#;
        assert!(matches!(
            ProgramModel::from_json(json),
            Err(LockOrderError::Json(_))
        ));
    }

    #[test]
    fn test_declaring_class_default() {
        let method = MethodSpec {
            name: "pkg.Outer.run".to_string(),
            declaring_class: None,
            calls: Vec::new(),
        };
        assert_eq!(method.declaring_class(), "pkg.Outer");
    }
}
