//! Configuration validation
//!
//! Code that accepts configuration depends on `Validatable`, not on the
//! concrete config type.

use super::error::ConfigResult;

/// Trait for validatable configuration objects
///
/// # Example
/// ```rust,ignore
/// use lockorder_analysis::config::Validatable;
///
/// fn checked<C: Validatable>(config: C) -> Result<C, ConfigError> {
///     config.validate()?;
///     Ok(config)
/// }
/// ```
pub trait Validatable {
    /// Validate the configuration
    ///
    /// Returns `Ok(())` if valid, `Err(ConfigError)` with details if invalid.
    fn validate(&self) -> ConfigResult<()>;

    /// Get the configuration name for error messages
    fn config_name(&self) -> &'static str {
        "Config"
    }
}
