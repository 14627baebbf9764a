//! End-to-end generation tests: schema in, rendered document out.

use std::collections::HashMap;

use schema_doc_core::{
    generate_from_filename, generate_from_schema, GenerationConfig, TemplateName,
};
use serde_json::{json, Value};

const LOCATION: &str = "mem://schema.json";

fn markdown_config() -> GenerationConfig {
    GenerationConfig {
        template_name: TemplateName::Md,
        minify: false,
        ..GenerationConfig::default()
    }
}

fn generate(schema: Value, config: &GenerationConfig) -> String {
    generate_from_schema(
        LOCATION,
        config,
        Some(HashMap::from([(LOCATION.to_string(), schema)])),
    )
    .expect("generation should succeed")
}

// ── Markdown output ─────────────────────────────────────────────────────────

#[test]
fn test_markdown_document_structure() {
    let output = generate(
        json!({
            "title": "Person",
            "type": "object",
            "description": "A single person.",
            "properties": {
                "name": { "type": "string", "title": "Full name" },
                "age": { "type": "integer", "minimum": 0 }
            },
            "required": ["name"]
        }),
        &markdown_config(),
    );

    assert!(output.starts_with("# Person"), "{output}");
    assert!(output.contains("A single person."));
    // TOC entries for both properties
    assert!(output.contains("](#name)"));
    assert!(output.contains("](#age)"));
    // Required properties are marked with "+" in the table
    assert!(output.contains("+ [name](#name)"));
    assert!(output.contains("- [age](#age)"));
    assert!(output.contains("Full name"));
    assert!(output.contains("Value must be greater or equal to `0`"));
    assert!(output.contains("Generated using schema-doc on"));
}

#[test]
fn test_markdown_enum_and_examples() {
    let output = generate(
        json!({
            "type": "object",
            "properties": {
                "color": {
                    "enum": ["red", "green"],
                    "examples": ["red"]
                }
            }
        }),
        &markdown_config(),
    );

    assert!(output.contains("Must be one of:"));
    assert!(output.contains("* `\"red\"`"));
    assert!(output.contains("* `\"green\"`"));
    assert!(output.contains("```json\n\"red\"\n```"));
}

#[test]
fn test_markdown_default_from_description_marker() {
    let config = GenerationConfig {
        default_from_description: true,
        ..markdown_config()
    };
    let output = generate(
        json!({
            "type": "object",
            "properties": {
                "retries": {
                    "type": "integer",
                    "description": "[Default - `3`] How many times to retry."
                }
            }
        }),
        &config,
    );

    // The marker is stripped from the displayed description
    assert!(output.contains("How many times to retry."));
    assert!(!output.contains("[Default - "));
}

#[test]
fn test_markdown_lists_undocumented_required_properties() {
    let output = generate(
        json!({
            "type": "object",
            "properties": { "known": { "type": "string" } },
            "required": ["known", "ghost"]
        }),
        &markdown_config(),
    );
    assert!(output.contains("+ [known](#known)"));
    assert!(output.contains("+ ghost"));
}

#[test]
fn test_markdown_minify_squashes_blank_lines() {
    let config = GenerationConfig {
        minify: true,
        ..markdown_config()
    };
    let output = generate(json!({"title": "T", "type": "object"}), &config);
    assert!(!output.contains("\n\n\n"));
}

#[test]
fn test_extended_reference_renders_inherited_content() {
    let output = generate(
        json!({
            "title": "Wrapper",
            "type": "object",
            "properties": {
                "thing": {
                    "$ref": "#/definitions/base",
                    "description": "Extra context."
                }
            },
            "definitions": {
                "base": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "minLength": 3 }
                    }
                }
            }
        }),
        &markdown_config(),
    );

    // The extending node keeps its own description and still lists the
    // referenced object's properties and their restrictions.
    assert!(output.contains("Extra context."));
    assert!(output.contains("[id](#thing_id)"));
    assert!(output.contains("**Min length**"));
}

// ── HTML output ─────────────────────────────────────────────────────────────

#[test]
fn test_html_document_structure() {
    let config = GenerationConfig {
        minify: false,
        ..GenerationConfig::default()
    };
    let output = generate(
        json!({
            "title": "Person",
            "type": "object",
            "properties": {
                "name": { "type": "string" }
            },
            "required": ["name"]
        }),
        &config,
    );

    assert!(output.contains("<!DOCTYPE html>"));
    assert!(output.contains("<title>Person</title>"));
    assert!(output.contains("id=\"name\""));
    assert!(output.contains("badge-required"));
    assert!(output.contains("schema_doc.css"));
}

#[test]
fn test_html_expand_buttons_are_opt_in() {
    let schema = json!({"type": "object"});
    let without = generate(schema.clone(), &GenerationConfig::default());
    assert!(!without.contains("Expand all"));

    let config = GenerationConfig {
        expand_buttons: true,
        ..GenerationConfig::default()
    };
    let with = generate(schema, &config);
    assert!(with.contains("Expand all"));
    assert!(with.contains("Collapse all"));
}

#[test]
fn test_html_escapes_description_content() {
    let output = generate(
        json!({
            "type": "object",
            "description": "Contains <script>alert(1)</script> tags"
        }),
        &GenerationConfig::default(),
    );
    assert!(!output.contains("<script>alert(1)</script>"));
    assert!(output.contains("&lt;script&gt;"));
}

// ── File output ─────────────────────────────────────────────────────────────

#[test]
fn test_generate_from_filename_writes_doc_and_assets() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("schema.json");
    let result_path = dir.path().join("out/doc.html");
    std::fs::create_dir(dir.path().join("out")).unwrap();
    std::fs::write(
        &schema_path,
        json!({"title": "T", "type": "object"}).to_string(),
    )
    .unwrap();

    generate_from_filename(&schema_path, &result_path, &GenerationConfig::default())
        .expect("generation should succeed");

    assert!(result_path.exists());
    // Assets land in the same directory as the result
    assert!(dir.path().join("out/schema_doc.css").exists());
    assert!(dir.path().join("out/schema_doc.min.js").exists());
}

#[test]
fn test_generate_from_filename_markdown_skips_assets() {
    let dir = tempfile::tempdir().unwrap();
    let schema_path = dir.path().join("schema.json");
    let result_path = dir.path().join("doc.md");
    std::fs::write(
        &schema_path,
        json!({"title": "T", "type": "object"}).to_string(),
    )
    .unwrap();

    generate_from_filename(&schema_path, &result_path, &markdown_config())
        .expect("generation should succeed");

    assert!(result_path.exists());
    assert!(!dir.path().join("schema_doc.css").exists());
}

#[test]
fn test_generation_is_deterministic() {
    let schema = json!({
        "title": "Det",
        "type": "object",
        "properties": {
            "a": { "$ref": "#/definitions/x" },
            "b": { "$ref": "#/definitions/x" }
        },
        "definitions": { "x": { "type": "string" } }
    });

    let first = generate(schema.clone(), &markdown_config());
    let second = generate(schema, &markdown_config());
    // Strip the timestamped footer before comparing
    let body = |text: &str| text.split("Generated using").next().unwrap().to_string();
    assert_eq!(body(&first), body(&second));
}
