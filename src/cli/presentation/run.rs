//! Seed and purge run reports.

use crate::chain::{BatchResult, Operation};
use crate::error::ApiError;
use crate::report::{summarize, RunSummary};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

pub fn format_run_text(operation: Operation, result: &BatchResult) -> String {
    let summary = summarize(result);
    let mut out = vec![format!("{}", format!("{} report", title(operation)).bold().underline())];

    if summary.all_sufficient() {
        let message = match operation {
            Operation::Seed => "Nothing to do: every target is already met.",
            Operation::Purge => "Nothing to do: no records matched the scope.",
        };
        out.push(format!("{}", message.green()));
        return out.join("\n");
    }

    out.push(target_table(operation, &summary).to_string());

    let done = match operation {
        Operation::Seed => format!("Created: {}", summary.created_count),
        Operation::Purge => format!("Deleted: {}", summary.deleted_count),
    };
    out.push(format!(
        "{}  Skipped: {}  Failed: {}",
        done, summary.skipped_count, summary.failed_count
    ));

    if !summary.skip_reasons.is_empty() {
        out.push(String::new());
        out.push("Skipped by reason:".to_string());
        for (reason, count) in &summary.skip_reasons {
            out.push(format!("  {:>4}  {}", count, reason));
        }
    }

    if !result.is_clean() {
        out.push(String::new());
        out.push(format!("{}", "Failures:".red().bold()));
        for (kind, count) in &summary.failures_by_kind {
            out.push(format!("  {:>4}  {}", count, kind.label()));
        }
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Entity", "Unit", "Reason", "Error"]);
        for failure in &result.failed {
            table.add_row(vec![
                failure.entity_type.clone(),
                failure.candidate.clone(),
                failure.reason.clone(),
                failure.error.clone(),
            ]);
        }
        out.push(table.to_string());
    }

    if summary.systemic_permission_issue {
        out.push(String::new());
        out.push(format!(
            "{}",
            "Repeated permission denials: check the API credentials and their roles."
                .red()
                .bold()
        ));
    }

    out.join("\n")
}

pub fn format_run_json(operation: Operation, result: &BatchResult) -> Result<String, ApiError> {
    let summary = summarize(result);
    let records = match operation {
        Operation::Seed => &result.created,
        Operation::Purge => &result.deleted,
    };
    let out = json!({
        "operation": operation,
        "summary": summary,
        "records": records,
        "skipped": result.skipped,
        "failed": result.failed,
    });
    serde_json::to_string_pretty(&out)
        .map_err(|e| ApiError::ConfigError(format!("Failed to render report: {}", e)))
}

fn title(operation: Operation) -> &'static str {
    match operation {
        Operation::Seed => "Seed",
        Operation::Purge => "Purge",
    }
}

fn target_table(operation: Operation, summary: &RunSummary) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    let done = match operation {
        Operation::Seed => "Created",
        Operation::Purge => "Deleted",
    };
    table.set_header(vec!["Entity", "State", "Existing", "Delta", done, "Skipped", "Failed"]);
    for target in &summary.per_target {
        let done = match operation {
            Operation::Seed => target.created,
            Operation::Purge => target.deleted,
        };
        table.add_row(vec![
            target.entity_type.clone(),
            target.state.label().to_string(),
            target.existing_count.to_string(),
            target.delta.to_string(),
            done.to_string(),
            target.skipped.to_string(),
            target.failed.to_string(),
        ]);
    }
    table
}
