//! Configuration validation output.

use crate::config::ValidationError;

pub fn format_validation_text(errors: &[ValidationError]) -> String {
    if errors.is_empty() {
        return "Configuration is valid".to_string();
    }
    let mut s = format!("Configuration has {} problem(s):", errors.len());
    for e in errors {
        s.push_str(&format!("\n  - {}", e));
    }
    s
}
