//! CLI command-name contract for log spans.

use crate::cli::parse::Commands;

/// Command name string for logging (e.g. "seed", "status").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Seed { .. } => "seed",
        Commands::Purge { .. } => "purge",
        Commands::Status { .. } => "status",
        Commands::Validate => "validate",
    }
}

/// Whether the command writes to the remote system.
pub fn is_mutating(command: &Commands) -> bool {
    matches!(command, Commands::Seed { .. } | Commands::Purge { .. })
}
