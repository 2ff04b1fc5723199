//! CLI: parse, route, presentation, output.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, is_mutating};
pub use output::map_error;
pub use parse::{Cli, Commands};
pub use route::RunContext;
