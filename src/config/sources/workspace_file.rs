//! Workspace config file source: `recsync.toml` and `recsync.{env}.toml`.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::Path;

pub const WORKSPACE_FILE: &str = "recsync.toml";

/// Add workspace config files to builder.
/// Precedence: `recsync.toml` (base) then `recsync.{RECSYNC_ENV}.toml` when the variable is set.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder;

    let base_path = workspace_root.join(WORKSPACE_FILE);
    if base_path.is_file() {
        builder = builder.add_source(File::from(base_path).required(false));
    }

    if let Ok(env_name) = std::env::var("RECSYNC_ENV") {
        let env_path = workspace_root.join(format!("recsync.{}.toml", env_name));
        if env_path.is_file() {
            builder = builder.add_source(File::from(env_path).required(false));
        }
    }

    Ok(builder)
}
