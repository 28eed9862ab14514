//! Built-in defaults, the lowest configuration layer.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with the store defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("readonly", false)?
        .set_default("auth.expert_mode", false)?
        .set_default("auth.default_visibility", "login")?
        .set_default("logging.level", "info")?
        .set_default("logging.output", "stderr")
}
