//! Read-only status: existing counts and deltas per target.

use crate::chain::{BatchResult, TargetState};
use crate::error::ApiError;
use crate::report::summarize;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

pub fn format_status_text(result: &BatchResult) -> String {
    let mut out = vec![format!("{}", "Target status".bold().underline())];
    if result.targets.is_empty() {
        out.push("No targets configured.".to_string());
        return out.join("\n");
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Entity", "Existing", "Target", "To create", "State"]);
    for target in &result.targets {
        let state = match target.state {
            TargetState::Sufficient => format!("{}", "met".green()),
            TargetState::Pending => format!("{}", "pending".yellow()),
            other => format!("{}", other.label().red()),
        };
        table.add_row(vec![
            target.entity_type.clone(),
            target.existing_count.to_string(),
            (target.existing_count + target.delta).to_string(),
            target.delta.to_string(),
            state,
        ]);
    }
    out.push(table.to_string());

    for failure in &result.failed {
        out.push(format!(
            "{} {}: {}",
            "!".red(),
            failure.entity_type,
            failure.error
        ));
    }
    out.join("\n")
}

pub fn format_status_json(result: &BatchResult) -> Result<String, ApiError> {
    let summary = summarize(result);
    let out = json!({
        "targets": summary.per_target,
        "failed": result.failed,
    });
    serde_json::to_string_pretty(&out)
        .map_err(|e| ApiError::ConfigError(format!("Failed to render status: {}", e)))
}
