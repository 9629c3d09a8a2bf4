//! Configuration I/O (YAML loading/export)
//!
//! Schema v1:
//! ```yaml
//! version: 1
//! preset: repair
//! overrides:
//!   max_iterations: 50
//! ```

use super::analysis_config::LockOrderConfig;
use super::error::{ConfigError, ConfigResult};
use super::patch::LockOrderConfigPatch;
use super::preset::Preset;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported schema versions
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    #[serde(default)]
    pub version: Option<u32>,

    /// Base preset
    pub preset: String,

    /// Fine-grained overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<LockOrderConfigPatch>,
}

impl LockOrderConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        let version = export.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = Preset::from_str(&export.preset)
            .map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;

        let mut config = Self::from_preset(preset);
        if let Some(overrides) = export.overrides {
            config = config.apply_patch(overrides);
        }

        config.validate()?;
        Ok(config)
    }

    /// Export configuration as YAML relative to `preset`
    pub fn to_yaml(&self, preset: Preset) -> ConfigResult<String> {
        let patch = self.diff_from(&Self::from_preset(preset));
        let export = ConfigExportV1 {
            version: Some(1),
            preset: preset.to_string(),
            overrides: (patch != LockOrderConfigPatch::default()).then_some(patch),
        };

        serde_yaml::to_string(&export).map_err(ConfigError::Yaml)
    }
}
