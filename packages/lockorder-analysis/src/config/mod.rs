//! Configuration System
//!
//! Preset → patch → validation, with YAML as the file format.
//!
//! # Examples
//!
//! ```rust,ignore
//! use lockorder_analysis::config::{LockOrderConfig, Preset, DetectionMode};
//!
//! // Preset
//! let config = LockOrderConfig::from_preset(Preset::Repair);
//!
//! // Preset with overrides
//! let config = LockOrderConfig::from_preset(Preset::Detect)
//!     .mode(DetectionMode::Group)
//!     .allow_self_edges(true);
//!
//! // YAML
//! let config = LockOrderConfig::from_yaml("lockorder.yaml")?;
//! ```

pub mod analysis_config;
pub mod error;
pub mod io;
pub mod patch;
pub mod preset;
pub mod validation;

// Re-exports
pub use analysis_config::{DetectionMode, LockOrderConfig, ReachabilityStrategy};
pub use error::{ConfigError, ConfigResult};
pub use io::ConfigExportV1;
pub use patch::LockOrderConfigPatch;
pub use preset::Preset;
pub use validation::Validatable;
