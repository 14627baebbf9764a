//! CLI binary integration tests using assert_cmd + predicates.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin("schema-doc").expect("binary should exist")
}

fn simple_schema() -> String {
    serde_json::json!({
        "title": "Person",
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": "First and last name" },
            "age": { "type": "integer", "minimum": 0 }
        },
        "required": ["name"]
    })
    .to_string()
}

// ── Generate HTML ───────────────────────────────────────────────────────────

#[test]
fn test_generate_html_to_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("schema.json");
    let output = dir.path().join("doc.html");
    fs::write(&input, simple_schema()).unwrap();

    cmd()
        .args(["generate", input.to_str().unwrap(), output.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated doc in"));

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("<title>Person</title>"));
    // Assets land next to the output file
    assert!(dir.path().join("schema_doc.css").exists());
    assert!(dir.path().join("schema_doc.min.js").exists());
}

#[test]
fn test_generate_without_asset_copies() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("schema.json");
    let output = dir.path().join("doc.html");
    fs::write(&input, simple_schema()).unwrap();

    cmd()
        .args(["generate", input.to_str().unwrap(), output.to_str().unwrap()])
        .args(["--no-copy-css", "--no-copy-js"])
        .assert()
        .success();

    assert!(output.exists());
    assert!(!dir.path().join("schema_doc.css").exists());
    assert!(!dir.path().join("schema_doc.min.js").exists());
}

// ── Generate Markdown ───────────────────────────────────────────────────────

#[test]
fn test_generate_markdown_via_config_override() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("schema.json");
    let output = dir.path().join("doc.md");
    fs::write(&input, simple_schema()).unwrap();

    cmd()
        .args(["generate", input.to_str().unwrap(), output.to_str().unwrap()])
        .args(["--config", "template_name=md", "--no-minify"])
        .assert()
        .success();

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("# Person"));
    assert!(content.contains("Generated using schema-doc on"));
    // Markdown output copies no assets
    assert!(!dir.path().join("schema_doc.css").exists());
}

// ── Configuration file ──────────────────────────────────────────────────────

#[test]
fn test_config_file_is_honored() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("schema.json");
    let output = dir.path().join("doc.md");
    let config = dir.path().join("config.yaml");
    fs::write(&input, simple_schema()).unwrap();
    fs::write(&config, "template_name: md\nminify: false\n").unwrap();

    cmd()
        .args(["generate", input.to_str().unwrap(), output.to_str().unwrap()])
        .args(["--config-file", config.to_str().unwrap()])
        .assert()
        .success();

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("# Person"));
}

#[test]
fn test_flag_wins_over_config_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("schema.json");
    let output = dir.path().join("doc.md");
    let config = dir.path().join("config.json");
    fs::write(&input, simple_schema()).unwrap();
    fs::write(&config, r#"{"template_name": "md", "minify": true}"#).unwrap();

    cmd()
        .args(["generate", input.to_str().unwrap(), output.to_str().unwrap()])
        .args(["--config-file", config.to_str().unwrap(), "--no-minify"])
        .assert()
        .success();

    // Non-minified markdown keeps its blank lines
    let content = fs::read_to_string(&output).unwrap();
    assert!(content.contains("\n\n"));
}

// ── Error paths ─────────────────────────────────────────────────────────────

#[test]
fn test_missing_schema_file_fails() {
    let dir = TempDir::new().unwrap();
    cmd()
        .args([
            "generate",
            dir.path().join("absent.json").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty().not());
}

#[test]
fn test_malformed_schema_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("malformed.json");
    fs::write(&input, "this is not valid JSON at all {{{").unwrap();

    cmd()
        .args(["generate", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty().not());
}

#[test]
fn test_bad_config_override_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("schema.json");
    fs::write(&input, simple_schema()).unwrap();

    cmd()
        .args(["generate", input.to_str().unwrap()])
        .args(["--config", "recursive_detection_depth=banana"])
        .assert()
        .failure()
        .stderr(predicate::str::is_empty().not());
}
