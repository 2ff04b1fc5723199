//! Binary-level checks that need no remote: validation and error mapping.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn recsync(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_recsync"))
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("RECSYNC_LOG")
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn validate_accepts_a_complete_workspace() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    fs::create_dir_all(&workspace).unwrap();
    fs::write(
        workspace.join("recsync.toml"),
        r#"
[connection]
base_url = "https://erp.example.com"
api_key = "key"
api_secret = "secret"

[scope]
company = "Acme"

[[targets]]
entity_type = "Lead"
count = 10

[[templates]]
entity_type = "Lead"
natural_key = "lead_name"

[templates.fields]
lead_name = { synth = "person_name" }
company = { scope = "company" }
"#,
    )
    .unwrap();

    let output = recsync(
        temp.path(),
        &["--workspace", workspace.to_str().unwrap(), "--log-level", "off", "validate"],
    );

    assert!(
        output.status.success(),
        "validate should succeed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration is valid"));
}

#[test]
fn missing_credentials_fail_with_a_config_error() {
    let temp = TempDir::new().unwrap();
    let output = recsync(
        temp.path(),
        &["--workspace", temp.path().to_str().unwrap(), "--log-level", "off", "seed", "--yes"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error[config]"), "stderr={}", stderr);
    assert!(stderr.contains("base_url"), "stderr={}", stderr);
}

#[test]
fn explicit_config_file_must_exist() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("absent.toml");
    let output = recsync(
        temp.path(),
        &["--config", missing.to_str().unwrap(), "--log-level", "off", "status"],
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Config file not found"));
}
