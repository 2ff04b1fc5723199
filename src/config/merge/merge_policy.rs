//! Merge rules: defaults, override order, environment mapping.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};

/// Environment prefix; `RECSYNC__CONNECTION__API_KEY` sets `connection.api_key`.
pub const ENV_PREFIX: &str = "RECSYNC";
pub const ENV_SEPARATOR: &str = "__";

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("connection.page_size", 500)?
        .set_default("connection.timeout_secs", 30)?
        .set_default("connection.connect_timeout_secs", 10)?
        .set_default("retry.max_attempts", 3)?
        .set_default("retry.base_delay_seconds", 1.0)?
        .set_default("retry.strategy", "exponential")?
        .set_default("logging.level", "info")?
        .set_default("logging.output", "stderr")
}

/// Environment variables override every file.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}
