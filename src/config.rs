//! Inflator configuration
//!
//! Built in code with the `with_*` methods or loaded from TOML:
//!
//! ```toml
//! binding-policy = "record"
//! duplicate-policy = "replace"
//! container-type = "Box"
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::directive::packing::DEFAULT_CONTAINER_TYPE;
use crate::directive::{DirectiveRegistry, DuplicatePolicy};

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// What to do when an attribute fails to bind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingPolicy {
    /// Stop the inflation at the first failure
    #[default]
    Abort,
    /// Log the failure, keep it in the result and continue
    Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct InflatorConfig {
    pub binding_policy: BindingPolicy,
    pub duplicate_policy: DuplicatePolicy,
    /// Container type the built-in `pack` directive applies to
    pub container_type: String,
}

impl Default for InflatorConfig {
    fn default() -> Self {
        Self {
            binding_policy: BindingPolicy::default(),
            duplicate_policy: DuplicatePolicy::default(),
            container_type: DEFAULT_CONTAINER_TYPE.to_string(),
        }
    }
}

impl InflatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_binding_policy(mut self, policy: BindingPolicy) -> Self {
        self.binding_policy = policy;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_container_type(mut self, container_type: impl Into<String>) -> Self {
        self.container_type = container_type.into();
        self
    }

    /// Registry with the built-in directives set up for this configuration
    pub fn builtin_registry(&self) -> DirectiveRegistry {
        DirectiveRegistry::with_builtins(&self.container_type).with_policy(self.duplicate_policy)
    }
}
