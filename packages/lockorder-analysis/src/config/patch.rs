//! Patch types
//!
//! All-optional mirror of `LockOrderConfig`, applied on top of a preset.

use super::analysis_config::{DetectionMode, LockOrderConfig, ReachabilityStrategy};
use serde::{Deserialize, Serialize};

/// Patch type for LockOrderConfig (all fields optional)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockOrderConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<DetectionMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_self_edges: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reachability: Option<ReachabilityStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reorder_locksets: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_method_prefixes: Option<Vec<String>>,
}

impl LockOrderConfig {
    /// Apply a patch (FFI/YAML-friendly alternative to the fluent setters)
    pub fn apply_patch(mut self, patch: LockOrderConfigPatch) -> Self {
        if let Some(v) = patch.mode {
            self.mode = v;
        }
        if let Some(v) = patch.repair {
            self.repair = v;
        }
        if let Some(v) = patch.allow_self_edges {
            self.allow_self_edges = v;
        }
        if let Some(v) = patch.print_debug {
            self.print_debug = v;
        }
        if let Some(v) = patch.max_iterations {
            self.max_iterations = v;
        }
        if let Some(v) = patch.reachability {
            self.reachability = v;
        }
        if let Some(v) = patch.reorder_locksets {
            self.reorder_locksets = v;
        }
        if let Some(v) = patch.excluded_method_prefixes {
            self.excluded_method_prefixes = v;
        }
        self
    }

    /// Patch holding every field that differs from `base`
    pub fn diff_from(&self, base: &LockOrderConfig) -> LockOrderConfigPatch {
        fn changed<T: PartialEq + Clone>(value: &T, base: &T) -> Option<T> {
            (value != base).then(|| value.clone())
        }

        LockOrderConfigPatch {
            mode: changed(&self.mode, &base.mode),
            repair: changed(&self.repair, &base.repair),
            allow_self_edges: changed(&self.allow_self_edges, &base.allow_self_edges),
            print_debug: changed(&self.print_debug, &base.print_debug),
            max_iterations: changed(&self.max_iterations, &base.max_iterations),
            reachability: changed(&self.reachability, &base.reachability),
            reorder_locksets: changed(&self.reorder_locksets, &base.reorder_locksets),
            excluded_method_prefixes: changed(
                &self.excluded_method_prefixes,
                &base.excluded_method_prefixes,
            ),
        }
    }
}
