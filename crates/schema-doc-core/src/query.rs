//! Pure query helpers over built nodes: type names, descriptions, defaults,
//! numeric restriction phrasing, deprecation and required-ness.
//!
//! Each function is independent and idempotent; the ones that follow
//! `refers_to` chains are cycle-guarded with a seen-set.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::config::GenerationConfig;
use crate::node::NodeRef;

const TYPE_ARRAY: &str = "array";
const TYPE_CONST: &str = "const";
const TYPE_ENUM: &str = "enum";
const TYPE_OBJECT: &str = "object";

/// Number of 80-column line groups above which a description counts as long.
const SHORT_DESCRIPTION_NUMBER_OF_LINES: f64 = 8.0;

fn default_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\[Default - `([^`]+)`\])").expect("default marker pattern is valid")
    })
}

fn deprecated_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\[Deprecated").expect("deprecated marker pattern is valid"))
}

// ---------------------------------------------------------------------------
// Type names
// ---------------------------------------------------------------------------

/// The display type of a node, taking `const`, `enum` and array item types
/// into account. Falls back along `refers_to` chains and defaults to
/// "object" when nothing declares a type.
pub fn get_type_name(node: NodeRef<'_>) -> String {
    if let Some(name) = own_type_name(node) {
        return name;
    }

    let mut seen = HashSet::new();
    let mut current = node;
    while let Some(referenced) = current.refers_to() {
        if !seen.insert(current.id()) {
            break;
        }
        if let Some(name) = own_type_name(referenced) {
            return name;
        }
        current = referenced;
    }

    TYPE_OBJECT.to_string()
}

fn own_type_name(node: NodeRef<'_>) -> Option<String> {
    if node.has_keyword(TYPE_CONST) {
        return Some(TYPE_CONST.to_string());
    }
    if let Some(enum_node) = node.kw(TYPE_ENUM) {
        return Some(enum_type_name(enum_node));
    }

    let type_node = node.kw("type")?;
    let names: Vec<String> = if type_node.array_items().next().is_some() {
        type_node
            .array_items()
            .filter_map(|item| item.literal().and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    } else {
        vec![type_node.literal().and_then(Value::as_str)?.to_string()]
    };
    if names.is_empty() {
        return None;
    }

    let annotated: Vec<String> = names
        .into_iter()
        .map(|name| add_subtype_if_array(node, name))
        .collect();
    Some(join_with_or(&annotated))
}

/// "enum (of string or integer)" — the union of literal value types, in
/// encounter order.
fn enum_type_name(enum_node: NodeRef<'_>) -> String {
    let mut kinds: Vec<&str> = Vec::new();
    for item in enum_node.array_items() {
        let kind = item.literal().map(json_type_of).unwrap_or("string");
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        TYPE_ENUM.to_string()
    } else {
        format!("{} (of {})", TYPE_ENUM, kinds.join(" or "))
    }
}

fn json_type_of(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        // Strings and nulls both display as "string".
        Value::String(_) | Value::Null => "string",
    }
}

fn add_subtype_if_array(node: NodeRef<'_>, type_name: String) -> String {
    if type_name != TYPE_ARRAY {
        return type_name;
    }
    let Some(items) = node.kw("items") else {
        return type_name;
    };

    let mut subtype = items
        .kw("type")
        .and_then(|t| t.literal())
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(enum_node) = items.kw(TYPE_ENUM) {
        subtype = Some(enum_type_name(enum_node));
    }

    match subtype {
        // Too complex to guess the item type.
        None => type_name,
        Some(subtype) => format!("{} of {}", type_name, subtype),
    }
}

fn join_with_or(names: &[String]) -> String {
    match names.split_last() {
        None => String::new(),
        Some((last, rest)) if rest.is_empty() => last.clone(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}

// ---------------------------------------------------------------------------
// Descriptions and defaults
// ---------------------------------------------------------------------------

/// The node's own description, else the first one found along the
/// `refers_to` chain.
pub fn get_description(node: NodeRef<'_>) -> &str {
    if let Some(description) = own_description(node) {
        return description;
    }

    let mut seen = HashSet::new();
    let mut current = node;
    while let Some(referenced) = current.refers_to() {
        if !seen.insert(current.id()) {
            break;
        }
        if let Some(description) = own_description(referenced) {
            return description;
        }
        current = referenced;
    }
    ""
}

fn own_description(node: NodeRef<'_>) -> Option<&str> {
    node.kw("description")
        .and_then(|n| n.literal())
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

/// The description with any leading `[Default - `value`]` marker stripped.
pub fn get_description_remove_default(node: NodeRef<'_>) -> &str {
    let description = get_description(node);
    match default_pattern().captures(description) {
        Some(captures) => match captures.get(1) {
            Some(marker) => description[marker.end()..].trim_start(),
            None => description,
        },
        None => description,
    }
}

/// The default value for a node, as pre-formatted JSON text.
pub fn get_default(node: NodeRef<'_>) -> Option<&str> {
    node.default_value()
}

/// The default value, looked up in the description marker when the `default`
/// keyword is absent.
pub fn get_default_from_description(node: NodeRef<'_>) -> Option<&str> {
    if let Some(default) = node.default_value() {
        return Some(default);
    }
    let description = own_description(node)?;
    default_pattern()
        .captures(description)
        .and_then(|captures| captures.get(2))
        .map(|value| value.as_str())
}

// ---------------------------------------------------------------------------
// Numeric restrictions
// ---------------------------------------------------------------------------

/// Human-readable sentence for `minimum` / `exclusiveMinimum` / `maximum` /
/// `exclusiveMaximum` / `multipleOf`. When both an inclusive and an
/// exclusive bound are present, the numerically tighter one wins and the
/// other is discarded.
pub fn get_numeric_restrictions_text(
    node: NodeRef<'_>,
    before_value: &str,
    after_value: &str,
) -> String {
    let keywords = node.merged_keywords();
    let literal_number = |keyword: &str| -> Option<&Value> {
        keywords
            .get(keyword)
            .and_then(|n| n.literal())
            .filter(|value| value.is_number())
    };

    let multiple_of = literal_number("multipleOf");
    let mut minimum = literal_number("minimum");
    let mut exclusive_minimum = literal_number("exclusiveMinimum");
    let mut maximum = literal_number("maximum");
    let mut exclusive_maximum = literal_number("exclusiveMaximum");

    let as_f64 = |value: &Value| value.as_f64().unwrap_or(f64::NAN);

    if let (Some(min), Some(emin)) = (minimum, exclusive_minimum) {
        if as_f64(min) <= as_f64(emin) {
            minimum = None;
        } else {
            exclusive_minimum = None;
        }
    }
    if let (Some(max), Some(emax)) = (maximum, exclusive_maximum) {
        if as_f64(max) > as_f64(emax) {
            maximum = None;
        } else {
            exclusive_maximum = None;
        }
    }

    let mut minimum_fragment = String::new();
    if let Some(min) = minimum {
        minimum_fragment = format!("greater or equal to {}{}{}", before_value, min, after_value);
    }
    if let Some(emin) = exclusive_minimum {
        minimum_fragment = format!("strictly greater than {}{}{}", before_value, emin, after_value);
    }

    let mut maximum_fragment = String::new();
    if let Some(max) = maximum {
        maximum_fragment = format!("lesser or equal to {}{}{}", before_value, max, after_value);
    }
    if let Some(emax) = exclusive_maximum {
        maximum_fragment = format!("strictly lesser than {}{}{}", before_value, emax, after_value);
    }

    let mut fragments: Vec<String> = Vec::new();
    if !minimum_fragment.is_empty() {
        fragments.push(minimum_fragment);
    }
    if !maximum_fragment.is_empty() {
        fragments.push(maximum_fragment);
    }
    if let Some(multiple) = multiple_of {
        fragments.push(format!(
            "a multiple of {}{}{}",
            before_value, multiple, after_value
        ));
    }

    if fragments.is_empty() {
        String::new()
    } else {
        format!("Value must be {}", fragments.join(" and "))
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Whether the node composes sub-schemas with `anyOf`/`allOf`/`oneOf`/`not`.
pub fn is_combining(node: NodeRef<'_>) -> bool {
    ["anyOf", "allOf", "oneOf", "not"]
        .iter()
        .any(|keyword| node.has_keyword(keyword))
}

/// Whether a description is short enough to show uncollapsed. Counts one
/// line per source line plus one per started group of 80 characters.
pub fn is_text_short(text: &str) -> bool {
    let weight: f64 = text
        .lines()
        .map(|line| line.len() as f64 / 80.0 + 1.0)
        .sum();
    weight < SHORT_DESCRIPTION_NUMBER_OF_LINES
}

/// Whether the node is deprecated under the given configuration. Without
/// `deprecated_from_description` there is no dedicated flag to look at, so
/// this is always false.
pub fn is_deprecated(config: &GenerationConfig, node: NodeRef<'_>) -> bool {
    if !config.deprecated_from_description {
        return false;
    }
    own_description(node)
        .is_some_and(|description| deprecated_pattern().is_match(description))
}

/// Required property names that have no matching entry in `properties`.
pub fn get_undocumented_required_properties(node: NodeRef<'_>) -> Vec<String> {
    let documented: HashSet<&str> = node.properties().map(|(name, _)| name).collect();
    node.required_properties()
        .into_iter()
        .filter(|name| !documented.contains(name))
        .map(str::to_string)
        .collect()
}

/// The first declared property, whatever its name.
pub fn get_first_property(node: NodeRef<'_>) -> Option<NodeRef<'_>> {
    node.properties().next().map(|(_, property)| property)
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// First line of a text, truncated to `max_length`, with " ..." appended
/// when anything was cut.
pub fn first_line(text: &str, max_length: Option<usize>) -> String {
    let (line, rest) = match text.split_once('\n') {
        Some((line, rest)) => (line, Some(rest)),
        None => (text, None),
    };
    let truncated = max_length.is_some_and(|max| line.chars().count() > max);
    let mut result: String = match max_length {
        Some(max) => line.chars().take(max).collect(),
        None => line.to_string(),
    };
    if rest.is_some() || truncated {
        result.push_str(" ...");
    }
    result
}

/// Escape unsafe characters in a property name so it can be used as an HTML
/// id.
pub fn escape_property_name_for_id(property_name: &str) -> String {
    let escaped: String = property_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    match escaped.chars().next() {
        Some(first) if first.is_ascii_alphabetic() => escaped,
        _ => format!("a{}", escaped),
    }
}

/// A literal value as it should be displayed in JSON: `null`, `true`,
/// `false`, quoted strings, numbers as-is.
pub fn literal_to_json_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::String(text) if !text.starts_with('"') => format!("\"{}\"", text),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("one line", None), "one line");
        assert_eq!(first_line("first\nsecond", None), "first ...");
        assert_eq!(first_line("a long line here", Some(6)), "a long ...");
    }

    #[test]
    fn test_escape_property_name_for_id() {
        assert_eq!(escape_property_name_for_id("simple"), "simple");
        assert_eq!(escape_property_name_for_id("with space"), "with_space");
        assert_eq!(escape_property_name_for_id("0start"), "a0start");
        assert_eq!(escape_property_name_for_id(""), "a");
    }

    #[test]
    fn test_literal_to_json_text() {
        assert_eq!(literal_to_json_text(&Value::Null), "null");
        assert_eq!(literal_to_json_text(&Value::Bool(true)), "true");
        assert_eq!(
            literal_to_json_text(&Value::String("hello".to_string())),
            "\"hello\""
        );
        assert_eq!(literal_to_json_text(&serde_json::json!(42)), "42");
    }

    #[test]
    fn test_is_text_short() {
        assert!(is_text_short("short"));
        let long: String = "line\n".repeat(10);
        assert!(!is_text_short(&long));
    }

    #[test]
    fn test_default_marker_pattern() {
        let captures = default_pattern()
            .captures("[Default - `42`] The answer.")
            .expect("marker should match");
        assert_eq!(&captures[2], "42");
        assert!(default_pattern().captures("No marker here").is_none());
    }
}
