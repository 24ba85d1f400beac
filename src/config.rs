//! Configuration System
//!
//! Operation defaults and logging settings, merged from built-in defaults,
//! the user's global config file, workspace config files and environment
//! variables.

use crate::client::FieldAddOptions;
use crate::error::OperationError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FluentlyConfig {
    /// Builder behaviour
    #[serde(default)]
    pub operation: OperationSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings consumed by [`crate::operation::Operation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSettings {
    /// Template used by `create_list` when none is named
    #[serde(default = "default_list_template")]
    pub default_list_template: String,

    /// Options sent with every added column
    #[serde(default)]
    pub field_options: FieldAddOptions,
}

fn default_list_template() -> String {
    "Custom List".to_string()
}

impl Default for OperationSettings {
    fn default() -> Self {
        Self {
            default_list_template: default_list_template(),
            field_options: FieldAddOptions::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Operation(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Operation(msg) => write!(f, "Operation: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl OperationSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_list_template.trim().is_empty() {
            return Err("Default list template cannot be empty".to_string());
        }
        Ok(())
    }
}

impl FluentlyConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.operation.validate() {
            errors.push(ValidationError::Operation(e));
        }

        if !matches!(self.logging.format.as_str(), "json" | "text") {
            errors.push(ValidationError::Logging(format!(
                "Invalid format '{}'",
                self.logging.format
            )));
        }
        if !matches!(self.logging.output.as_str(), "stdout" | "stderr" | "file") {
            errors.push(ValidationError::Logging(format!(
                "Invalid output '{}'",
                self.logging.output
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Load and validate the configuration for `workspace_root`.
    pub fn load_validated(workspace_root: &Path) -> Result<Self, OperationError> {
        let config = ConfigLoader::load(workspace_root)?;
        config.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            OperationError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(config)
    }

    /// Render as TOML, e.g. to seed a config file.
    pub fn to_toml(&self) -> Result<String, OperationError> {
        toml::to_string_pretty(self).map_err(|e| OperationError::ConfigError(e.to_string()))
    }
}
