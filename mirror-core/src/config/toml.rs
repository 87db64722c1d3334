//! TOML loading
//!
//! Host-side only: the `toml` crate needs `alloc` and does not build for
//! every embedded target. Sections and fields may be omitted; missing values
//! take the canonical rig defaults.

use super::types::{ConfigError, ControllerConfig};

impl ControllerConfig {
    /// Parse and validate a `controller.toml` document
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: ControllerConfig = ::toml::from_str(text).map_err(|_| ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }
}
