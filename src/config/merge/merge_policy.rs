//! Merge policy: defaults first, then global file, workspace files, environment.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Prefix of environment overrides, e.g. `FLUENTLY__OPERATION__DEFAULT_LIST_TEMPLATE`.
pub const ENV_PREFIX: &str = "FLUENTLY";

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("operation.default_list_template", "Custom List")?
        .set_default("operation.field_options.internal_name_hint", true)?
        .set_default("operation.field_options.add_to_default_view", true)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}
