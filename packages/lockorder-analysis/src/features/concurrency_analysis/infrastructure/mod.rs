/// Lock-Order Analysis Infrastructure

/// Per-pair diagnostics: debug level when `print_debug` is set, trace otherwise
macro_rules! detail {
    ($config:expr, $($arg:tt)*) => {
        if $config.print_debug {
            tracing::debug!($($arg)*)
        } else {
            tracing::trace!($($arg)*)
        }
    };
}

pub mod call_graph;
#[cfg(test)]
mod edge_case_tests;
pub mod group_detector; // group merge repair
pub mod lock_order_graph;
pub mod lockset_detector; // avoidance-lock repair
pub mod lockset_reorderer;
pub mod program_loader;
pub mod reachability;
pub mod transitive_targets;

pub use call_graph::*;
pub use group_detector::*;
pub use lock_order_graph::*;
pub use lockset_detector::*;
pub use lockset_reorderer::*;
pub use program_loader::*;
pub use reachability::*;
pub use transitive_targets::*;
