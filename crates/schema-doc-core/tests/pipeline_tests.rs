//! Integration tests for graph building and reference resolution, exercised
//! through the public API only.

use std::collections::HashMap;

use schema_doc_core::circular::CircularRefDetector;
use schema_doc_core::query::{get_numeric_restrictions_text, get_type_name};
use schema_doc_core::{build_intermediate_representation, GenerationConfig, NodeRef, SchemaGraph};
use serde_json::{json, Value};

const LOCATION: &str = "mem://schema.json";

fn build(schema: Value) -> SchemaGraph {
    build_intermediate_representation(
        LOCATION,
        &GenerationConfig::default(),
        Some(HashMap::from([(LOCATION.to_string(), schema)])),
    )
    .expect("graph should build")
}

fn property<'a>(node: NodeRef<'a>, name: &str) -> NodeRef<'a> {
    node.properties()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .unwrap_or_else(|| panic!("property {name} should exist"))
}

// ── Basic graph shape ───────────────────────────────────────────────────────

#[test]
fn test_properties_become_nodes_with_stable_ids() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "age": { "type": "integer" }
        }
    }));

    let root = graph.root();
    assert_eq!(root.html_id(), "root");
    assert_eq!(root.depth(), 0);

    let name = property(root, "name");
    assert_eq!(name.html_id(), "name");
    assert_eq!(name.depth(), 1);
    assert_eq!(name.flat_path(), "name");
    assert!(name.is_property());
    assert_eq!(name.parent().map(|p| p.id()), Some(root.id()));
}

#[test]
fn test_node_content_has_exactly_one_shape() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "tags": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["tags"]
    }));

    // The root is a mapping: children, no literal, no sequence items.
    let root = graph.root();
    assert!(root.keywords().next().is_some());
    assert!(root.literal().is_none());
    assert!(root.array_items().next().is_none());

    // "type" is a scalar: a literal and nothing else.
    let type_kw = root.kw("type").expect("type keyword should exist");
    assert_eq!(type_kw.literal(), Some(&json!("object")));
    assert!(type_kw.keywords().next().is_none());
    assert!(type_kw.properties().next().is_none());
    assert!(type_kw.array_items().next().is_none());

    // "required" is a sequence: items and nothing else.
    let required = root.kw("required").expect("required keyword should exist");
    assert!(required.array_items().next().is_some());
    assert!(required.literal().is_none());
    assert!(required.keywords().next().is_none());
}

#[test]
fn test_pattern_properties_get_positional_ids() {
    let graph = build(json!({
        "type": "object",
        "patternProperties": {
            "^x-": { "type": "string" }
        }
    }));

    let pattern = graph
        .root()
        .pattern_properties()
        .next()
        .map(|(_, node)| node)
        .expect("pattern property should exist");
    assert_eq!(pattern.html_id(), "pattern1");
    assert!(pattern.is_pattern_property());
}

#[test]
fn test_additional_properties_false_sets_flag() {
    let graph = build(json!({
        "type": "object",
        "properties": { "a": { "type": "string" } },
        "additionalProperties": false
    }));

    let root = graph.root();
    assert!(root.explicit_no_additional_properties());
    assert!(root.additional_properties().is_none());
}

#[test]
fn test_required_properties_are_flagged() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "age": { "type": "integer" }
        },
        "required": ["name"]
    }));

    let root = graph.root();
    assert!(property(root, "name").is_required_property());
    assert!(!property(root, "age").is_required_property());
}

// ── Reference resolution ────────────────────────────────────────────────────

#[test]
fn test_reused_definition_resolves_to_one_target() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "home": { "$ref": "#/definitions/address" },
            "work": { "$ref": "#/definitions/address" }
        },
        "definitions": {
            "address": {
                "type": "object",
                "properties": { "street": { "type": "string" } }
            }
        }
    }));

    let root = graph.root();
    let home = property(root, "home");
    let work = property(root, "work");

    let home_target = home.refers_to().expect("home should resolve");
    let work_target = work.refers_to().expect("work should resolve");
    assert_eq!(home_target.identity(), work_target.identity());

    // Exactly one occurrence stays displayed, the other links to it.
    assert!(home.is_displayed());
    assert!(!work.is_displayed());
    assert_eq!(work.links_to().map(|n| n.id()), Some(home.id()));
}

#[test]
fn test_shallower_occurrence_wins_when_seen_second() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "wrap": {
                "type": "object",
                "properties": {
                    "inner": { "$ref": "#/definitions/thing" }
                }
            },
            "top": { "$ref": "#/definitions/thing" }
        },
        "definitions": { "thing": { "type": "string" } }
    }));

    let root = graph.root();
    let inner = property(property(root, "wrap"), "inner");
    let top = property(root, "top");

    // `top` is less nested, so it takes over even though `inner` came first.
    assert!(top.is_displayed());
    assert!(!inner.is_displayed());
    assert_eq!(inner.links_to().map(|n| n.id()), Some(top.id()));
}

#[test]
fn test_shallower_occurrence_wins_when_seen_first() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "top": { "$ref": "#/definitions/thing" },
            "wrap": {
                "type": "object",
                "properties": {
                    "inner": { "$ref": "#/definitions/thing" }
                }
            }
        },
        "definitions": { "thing": { "type": "string" } }
    }));

    let root = graph.root();
    let top = property(root, "top");
    let inner = property(property(root, "wrap"), "inner");

    assert!(top.is_displayed());
    assert!(!inner.is_displayed());
    assert_eq!(inner.links_to().map(|n| n.id()), Some(top.id()));
}

#[test]
fn test_extended_reference_merges_inherited_keywords() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "thing": { "$ref": "#/definitions/base", "description": "Extra context." }
        },
        "definitions": {
            "base": { "type": "integer", "minimum": 1 }
        }
    }));

    let thing = property(graph.root(), "thing");
    let merged = thing.merged_keywords();
    // Own keywords and the referenced node's are both present.
    assert!(merged.contains_key("description"));
    assert!(merged.contains_key("minimum"));
    assert_eq!(get_type_name(thing), "integer");
    assert_eq!(
        get_numeric_restrictions_text(thing, "", ""),
        "Value must be greater or equal to 1"
    );
}

#[test]
fn test_cross_file_reference_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.json");
    let shared = dir.path().join("shared.json");
    std::fs::write(
        &shared,
        json!({
            "definitions": {
                "id": { "type": "integer", "description": "A shared identifier" }
            }
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        &main,
        json!({
            "type": "object",
            "properties": {
                "id": { "$ref": "shared.json#/definitions/id" }
            }
        })
        .to_string(),
    )
    .unwrap();

    let graph = build_intermediate_representation(
        main.to_str().unwrap(),
        &GenerationConfig::default(),
        None,
    )
    .expect("graph should build");

    let id = property(graph.root(), "id");
    let target = id.refers_to().expect("reference should resolve");
    assert!(target.file().ends_with("shared.json"));
    assert_eq!(get_type_name(id), "integer");
}

#[test]
fn test_cross_file_target_shared_between_references() {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.json");
    let shared = dir.path().join("shared.json");
    std::fs::write(
        &shared,
        json!({
            "definitions": {
                "address": {
                    "type": "object",
                    "properties": { "street": { "type": "string" } }
                }
            }
        })
        .to_string(),
    )
    .unwrap();
    std::fs::write(
        &main,
        json!({
            "type": "object",
            "properties": {
                "home": { "$ref": "shared.json#/definitions/address" },
                "work": { "$ref": "shared.json#/definitions/address" }
            }
        })
        .to_string(),
    )
    .unwrap();

    let graph = build_intermediate_representation(
        main.to_str().unwrap(),
        &GenerationConfig::default(),
        None,
    )
    .expect("graph should build");

    let root = graph.root();
    let home = property(root, "home");
    let work = property(root, "work");

    // Both references resolve to the very same node: the document was
    // parsed once and the target built once.
    let home_target = home.refers_to().expect("home should resolve");
    let work_target = work.refers_to().expect("work should resolve");
    assert!(home_target.file().ends_with("shared.json"));
    assert_eq!(home_target.id(), work_target.id());

    // The referencing occurrences agree on the canonical one.
    assert!(home.is_displayed());
    assert!(!work.is_displayed());
    assert_eq!(work.links_to().map(|n| n.id()), Some(home.id()));
}

#[test]
fn test_missing_reference_target_is_fatal() {
    let result = build_intermediate_representation(
        LOCATION,
        &GenerationConfig::default(),
        Some(HashMap::from([(
            LOCATION.to_string(),
            json!({
                "type": "object",
                "properties": { "a": { "$ref": "#/definitions/absent" } }
            }),
        )])),
    );
    assert!(result.is_err());
}

// ── Cycles ──────────────────────────────────────────────────────────────────

#[test]
fn test_recursive_schema_builds_without_overflow() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "value": { "type": "string" },
            "children": {
                "type": "array",
                "items": { "$ref": "#" }
            }
        }
    }));

    let items = property(graph.root(), "children")
        .kw("items")
        .expect("items should exist");
    assert_eq!(
        items.links_to().map(|n| n.id()),
        Some(graph.root().id())
    );

    let config = GenerationConfig::default();
    let mut detector = CircularRefDetector::new(&graph, &config);
    assert!(detector.is_circular(items.id()));
}

#[test]
fn test_mutually_recursive_definitions_build() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "a": { "$ref": "#/definitions/a" }
        },
        "definitions": {
            "a": {
                "type": "object",
                "properties": { "b": { "$ref": "#/definitions/b" } }
            },
            "b": {
                "type": "object",
                "properties": { "a": { "$ref": "#/definitions/a" } }
            }
        }
    }));
    assert!(graph.node_count() > 0);
}

#[test]
fn test_detection_depth_bounds_the_search() {
    // A chain long enough that a tiny detection depth gives up before
    // reaching the cycle: a false negative, not an error.
    let graph = build(json!({
        "type": "object",
        "properties": {
            "children": {
                "type": "array",
                "items": { "$ref": "#" }
            }
        }
    }));
    let items = property(graph.root(), "children")
        .kw("items")
        .expect("items should exist");

    let shallow = GenerationConfig {
        recursive_detection_depth: 0,
        ..GenerationConfig::default()
    };
    let mut detector = CircularRefDetector::new(&graph, &shallow);
    assert!(!detector.is_circular(items.id()));
}

// ── Query helpers over real graphs ──────────────────────────────────────────

#[test]
fn test_type_name_inference() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "tags": { "type": "array", "items": { "type": "integer" } },
            "either": { "type": ["string", "null"] },
            "color": { "enum": ["red", "green", 3] },
            "fixed": { "const": 42 }
        }
    }));

    let root = graph.root();
    assert_eq!(get_type_name(property(root, "tags")), "array of integer");
    assert_eq!(get_type_name(property(root, "either")), "string or null");
    assert_eq!(
        get_type_name(property(root, "color")),
        "enum (of string or integer)"
    );
    assert_eq!(get_type_name(property(root, "fixed")), "const");
}

#[test]
fn test_numeric_restrictions_tighter_bound_wins() {
    let graph = build(json!({
        "type": "object",
        "properties": {
            "strict": { "type": "number", "minimum": 5, "exclusiveMinimum": 10 },
            "loose": { "type": "number", "minimum": 10, "exclusiveMinimum": 5 },
            "range": { "type": "number", "minimum": 0, "maximum": 10 }
        }
    }));

    let root = graph.root();
    assert_eq!(
        get_numeric_restrictions_text(property(root, "strict"), "", ""),
        "Value must be strictly greater than 10"
    );
    assert_eq!(
        get_numeric_restrictions_text(property(root, "loose"), "", ""),
        "Value must be greater or equal to 10"
    );
    assert_eq!(
        get_numeric_restrictions_text(property(root, "range"), "", ""),
        "Value must be greater or equal to 0 and lesser or equal to 10"
    );
}
