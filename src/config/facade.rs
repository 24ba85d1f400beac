//! Config loading entrypoint.

use super::merge::{builder_with_defaults, ENV_PREFIX};
use super::sources::{global_file, workspace_file};
use super::FluentlyConfig;
use config::{ConfigError, Environment, File};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace files,
    /// `FLUENTLY__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<FluentlyConfig, ConfigError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a single file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<FluentlyConfig, ConfigError> {
        builder_with_defaults()?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
