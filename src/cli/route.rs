//! CLI route: single route table and run context. Dispatches to the orchestrator and presentation.

use crate::chain::{
    restrict_to, BatchResult, ChainOrchestrator, ConfirmationRequest, Operation,
    PresetConfirmation,
};
use crate::client::{HttpRecordClient, ThrottleGuard};
use crate::config::{ConfigLoader, RecsyncConfig};
use crate::error::ApiError;
use crate::generator::EntityGenerator;
use crate::types::GenerationTarget;
use std::path::PathBuf;
use tracing::{info, info_span, warn};

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_run_json, format_run_text, format_status_json, format_status_text,
    format_validation_text,
};
use crate::cli::{command_name, is_mutating};

/// Runtime context for CLI execution: workspace and the configuration loaded once for the run.
pub struct RunContext {
    config: RecsyncConfig,
    workspace_root: PathBuf,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::from_config(workspace_root, config))
    }

    pub fn from_config(workspace_root: PathBuf, config: RecsyncConfig) -> Self {
        Self {
            config,
            workspace_root,
        }
    }

    pub fn config(&self) -> &RecsyncConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let span = info_span!("command", name = command_name(command));
        let _guard = span.enter();
        info!(workspace = %self.workspace_root.display(), "Executing command");

        if is_mutating(command) || matches!(command, Commands::Status { .. }) {
            self.ensure_valid()?;
        }

        match command {
            Commands::Seed { yes, only, format } => {
                self.handle_seed(*yes, only.as_deref(), format)
            }
            Commands::Purge { yes, only, format } => {
                self.handle_purge(*yes, only.as_deref(), format)
            }
            Commands::Status { format } => self.handle_status(format),
            Commands::Validate => self.handle_validate(),
        }
    }

    fn handle_seed(&self, yes: bool, only: Option<&str>, format: &str) -> Result<String, ApiError> {
        let targets = match only {
            Some(entity_type) => restrict_to(
                &self.config.seed_targets(),
                &self.config.dependency_edges(),
                entity_type,
            )?,
            None => self.config.seed_targets(),
        };
        let links = self.config.dependency_links();
        let client = self.client()?;
        let orchestrator = ChainOrchestrator::new(&client, self.generator());
        let mut orchestrator = if yes {
            orchestrator.with_gate(PresetConfirmation::approve())
        } else {
            orchestrator.with_gate(prompt)
        };

        let result = runtime()?.block_on(orchestrator.run(&targets, &links))?;
        render_run(Operation::Seed, &result, format)
    }

    fn handle_purge(&self, yes: bool, only: Option<&str>, format: &str) -> Result<String, ApiError> {
        let mut targets = self.config.generation_targets();
        if let Some(entity_type) = only {
            targets.retain(|t| t.entity_type == entity_type);
            if targets.is_empty() {
                return Err(ApiError::PlanError(format!(
                    "No target configured for {}",
                    entity_type
                )));
            }
        }
        let links = self.config.dependency_links();
        let client = self.client()?;
        let orchestrator = ChainOrchestrator::new(&client, self.generator());
        let mut orchestrator = if yes {
            orchestrator.with_gate(PresetConfirmation::approve())
        } else {
            orchestrator.with_gate(prompt)
        };

        let result = runtime()?.block_on(orchestrator.purge(&targets, &links))?;
        render_run(Operation::Purge, &result, format)
    }

    fn handle_status(&self, format: &str) -> Result<String, ApiError> {
        let targets: Vec<GenerationTarget> = self.config.seed_targets();
        let links = self.config.dependency_links();
        let client = self.client()?;
        let mut orchestrator = ChainOrchestrator::new(&client, self.generator());

        let result = runtime()?.block_on(orchestrator.status(&targets, &links))?;
        match format {
            "json" => format_status_json(&result),
            _ => Ok(format_status_text(&result)),
        }
    }

    fn handle_validate(&self) -> Result<String, ApiError> {
        match self.config.validate() {
            Ok(()) => Ok(format_validation_text(&[])),
            Err(errors) => Err(ApiError::ConfigError(format_validation_text(&errors))),
        }
    }

    fn ensure_valid(&self) -> Result<(), ApiError> {
        self.config.validate().map_err(|errors| {
            warn!(problems = errors.len(), "Configuration rejected");
            ApiError::ConfigError(format_validation_text(&errors))
        })
    }

    fn client(&self) -> Result<ThrottleGuard<HttpRecordClient>, ApiError> {
        let http = HttpRecordClient::from_config(&self.config)?;
        Ok(ThrottleGuard::new(http, self.config.throttle.policy.clone()))
    }

    fn generator(&self) -> EntityGenerator {
        EntityGenerator::new(self.config.scope.scope_values(), self.config.templates.clone())
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, ApiError> {
    Ok(tokio::runtime::Runtime::new()?)
}

/// Interactive gate; an unreadable terminal counts as a refusal.
fn prompt(request: &ConfirmationRequest) -> bool {
    use dialoguer::Confirm;
    Confirm::new()
        .with_prompt(request.prompt())
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn render_run(operation: Operation, result: &BatchResult, format: &str) -> Result<String, ApiError> {
    match format {
        "json" => format_run_json(operation, result),
        _ => Ok(format_run_text(operation, result)),
    }
}
