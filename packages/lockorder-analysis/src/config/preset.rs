//! Preset configurations
//!
//! Presets provide complete default configurations for common use cases.

use serde::{Deserialize, Serialize};

/// Configuration preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// CI gate: report the first lock-order cycle, never mutate
    ///
    /// - Mode: lockset
    /// - Repair: off, reorder: off
    Detect,

    /// Lock synthesis: repair every cycle and reorder locksets
    ///
    /// - Mode: lockset
    /// - Repair: on (avoidance locks), reorder: on
    Repair,

    /// Custom: User-defined (YAML or builder only)
    ///
    /// Minimal defaults; callers are expected to override.
    Custom,
}

impl Preset {
    /// Parse preset from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "detect" => Ok(Self::Detect),
            "repair" => Ok(Self::Repair),
            "custom" => Ok(Self::Custom),
            _ => Err(format!(
                "Unknown preset '{}'. Valid presets: detect, repair, custom",
                s
            )),
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detect => "detect",
            Self::Repair => "repair",
            Self::Custom => "custom",
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::Detect
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_parsing() {
        assert_eq!(Preset::from_str("detect").unwrap(), Preset::Detect);
        assert_eq!(Preset::from_str("REPAIR").unwrap(), Preset::Repair);
        assert_eq!(Preset::from_str("custom").unwrap(), Preset::Custom);
        assert!(Preset::from_str("fast").is_err());
    }

    #[test]
    fn test_preset_display() {
        assert_eq!(Preset::Detect.to_string(), "detect");
        assert_eq!(Preset::Repair.to_string(), "repair");
        assert_eq!(Preset::Custom.to_string(), "custom");
    }

    #[test]
    fn test_default_preset() {
        assert_eq!(Preset::default(), Preset::Detect);
    }
}
