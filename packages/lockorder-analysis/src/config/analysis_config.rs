//! Lock-order analysis configuration
//!
//! One config struct drives both detectors and the reorderer. Fields have
//! serde defaults so YAML overrides can stay partial.

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Upper bound accepted for `max_iterations`
pub const MAX_ITERATIONS_LIMIT: usize = 1_000_000;

/// Which deadlock detector to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Coarse-grained: nodes are critical section groups, repair merges groups
    Group,
    /// Fine-grained: nodes are lock numbers, repair inserts avoidance locks
    Lockset,
}

impl DetectionMode {
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "group" => Ok(Self::Group),
            "lockset" => Ok(Self::Lockset),
            _ => Err(ConfigError::unknown_value("mode", s, &["group", "lockset"])),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Lockset => "lockset",
        }
    }
}

impl std::fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reachability index used by the group detector's cycle check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReachabilityStrategy {
    /// Recompute the successor closure on every query
    SuccessorExpansion,
    /// Maintain the transitive closure as edges are inserted
    TransitiveClosure,
}

impl ReachabilityStrategy {
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "successor_expansion" => Ok(Self::SuccessorExpansion),
            "transitive_closure" => Ok(Self::TransitiveClosure),
            _ => Err(ConfigError::unknown_value(
                "reachability",
                s,
                &["successor_expansion", "transitive_closure"],
            )),
        }
    }
}

/// Lock-order analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockOrderConfig {
    /// Detector to run
    pub mode: DetectionMode,

    /// Repair cycles (group merge / avoidance lock) instead of only reporting them
    pub repair: bool,

    /// Group mode only: order sections of the same group against each other.
    /// Ignored while repairing.
    pub allow_self_edges: bool,

    /// Emit per-pair ordering diagnostics at debug level
    pub print_debug: bool,

    /// Maximum detection passes before giving up (1..=1_000_000)
    pub max_iterations: usize,

    /// Cycle check implementation for the group detector
    pub reachability: ReachabilityStrategy,

    /// Lockset mode only: reorder each section's lockset after detection
    pub reorder_locksets: bool,

    /// Call edges into methods with these name prefixes are invisible to the analysis
    pub excluded_method_prefixes: Vec<String>,
}

impl LockOrderConfig {
    /// Build the defaults for a preset
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Detect => Self {
                mode: DetectionMode::Lockset,
                repair: false,
                reorder_locksets: false,
                ..Self::base()
            },
            Preset::Repair => Self {
                mode: DetectionMode::Lockset,
                repair: true,
                reorder_locksets: true,
                ..Self::base()
            },
            Preset::Custom => Self::base(),
        }
    }

    fn base() -> Self {
        Self {
            mode: DetectionMode::Lockset,
            repair: false,
            allow_self_edges: false,
            print_debug: false,
            max_iterations: 1000,
            reachability: ReachabilityStrategy::SuccessorExpansion,
            reorder_locksets: false,
            excluded_method_prefixes: Vec::new(),
        }
    }

    /// Self edges can only be honoured while not repairing
    pub fn effective_allow_self_edges(&self) -> bool {
        self.allow_self_edges && !self.repair
    }

    // Fluent setters

    pub fn mode(mut self, mode: DetectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn repair(mut self, repair: bool) -> Self {
        self.repair = repair;
        self
    }

    pub fn allow_self_edges(mut self, allow: bool) -> Self {
        self.allow_self_edges = allow;
        self
    }

    pub fn print_debug(mut self, print_debug: bool) -> Self {
        self.print_debug = print_debug;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn reachability(mut self, strategy: ReachabilityStrategy) -> Self {
        self.reachability = strategy;
        self
    }

    pub fn reorder_locksets(mut self, reorder: bool) -> Self {
        self.reorder_locksets = reorder;
        self
    }

    pub fn exclude_method_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_method_prefixes.push(prefix.into());
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_iterations == 0 || self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(ConfigError::range_with_hint(
                "max_iterations",
                self.max_iterations,
                1,
                MAX_ITERATIONS_LIMIT,
                "At least one detection pass is required",
            ));
        }

        if self.allow_self_edges && self.repair {
            return Err(ConfigError::Conflict {
                issue: "allow_self_edges is set while repair is enabled".to_string(),
                fix: "Disable allow_self_edges (self edges cannot be repaired by merging)"
                    .to_string(),
            });
        }

        if self.reorder_locksets && self.mode == DetectionMode::Group {
            return Err(ConfigError::Conflict {
                issue: "reorder_locksets requires a lock-number order graph".to_string(),
                fix: "Use mode: lockset or disable reorder_locksets".to_string(),
            });
        }

        if let Some(empty) = self.excluded_method_prefixes.iter().find(|p| p.is_empty()) {
            return Err(ConfigError::Conflict {
                issue: format!("empty excluded method prefix '{}' hides every call", empty),
                fix: "Remove the empty entry from excluded_method_prefixes".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for LockOrderConfig {
    fn default() -> Self {
        Self::from_preset(Preset::default())
    }
}

impl Validatable for LockOrderConfig {
    fn validate(&self) -> ConfigResult<()> {
        LockOrderConfig::validate(self)
    }

    fn config_name(&self) -> &'static str {
        "LockOrderConfig"
    }
}
