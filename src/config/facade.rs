//! Config loader: assembles the layered sources into a `RecsyncConfig`.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::RecsyncConfig;
use crate::error::ApiError;
use config::File;
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, workspace file, then environment.
    pub fn load(workspace_root: &Path) -> Result<RecsyncConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder.add_source(merge_policy::environment()).build()?;
        debug!(workspace_root = %workspace_root.display(), "Configuration loaded");
        Ok(config.try_deserialize()?)
    }

    /// Defaults plus one explicit file (no discovery); environment still overrides.
    pub fn load_from_file(path: &Path) -> Result<RecsyncConfig, ApiError> {
        if !path.is_file() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .add_source(merge_policy::environment())
            .build()?;
        Ok(config.try_deserialize()?)
    }
}
