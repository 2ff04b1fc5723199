//! CLI presentation: text and json formatters per command family.

mod run;
mod status;
mod validate;

pub use run::{format_run_json, format_run_text};
pub use status::{format_status_json, format_status_text};
pub use validate::format_validation_text;
