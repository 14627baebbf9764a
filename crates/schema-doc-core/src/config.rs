//! Configuration for documentation generation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GenerateError;

/// Output renderer family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateName {
    /// HTML with collapsible sections and anchor links (default).
    Js,
    /// Markdown with numbered headings and tables.
    Md,
}

/// Markdown-renderer-specific options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateMdOptions {
    /// Render badges as shields.io image links instead of plain text.
    pub badge_as_image: bool,
}

impl Default for TemplateMdOptions {
    fn default() -> Self {
        Self {
            badge_as_image: false,
        }
    }
}

/// Options for generating documentation for a schema.
///
/// Field names are the public contract for config files (JSON or YAML) and
/// for `--config name=value` CLI overrides, so they stay `snake_case`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Collapse output whitespace (HTML minification / blank-line squashing).
    pub minify: bool,
    /// Interpret description text as Markdown before embedding in HTML.
    pub description_is_markdown: bool,
    /// Detect deprecation from a leading `[Deprecated` marker in the
    /// description instead of a dedicated flag.
    pub deprecated_from_description: bool,
    /// Render the ancestor path above each section.
    pub show_breadcrumbs: bool,
    /// Visually collapse descriptions exceeding the line-count heuristic.
    pub collapse_long_descriptions: bool,
    /// Extract the default value from a `[Default - `value`]` marker in the
    /// description instead of the `default` keyword.
    pub default_from_description: bool,
    /// Render "Expand all" / "Collapse all" controls.
    pub expand_buttons: bool,
    /// Copy the companion CSS file next to the output.
    pub copy_css: bool,
    /// Copy the companion JS file next to the output.
    pub copy_js: bool,
    /// Always render reused references as links rather than only when the
    /// reference is circular.
    pub link_to_reused_ref: bool,
    /// Bound on the circular-reference breadth-first search.
    pub recursive_detection_depth: usize,
    /// Which renderer to use.
    pub template_name: TemplateName,
    /// Pass-through options for the Markdown-to-HTML converter.
    pub markdown_options: Value,
    /// Markdown-renderer-specific options.
    pub template_md_options: TemplateMdOptions,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            minify: true,
            description_is_markdown: true,
            deprecated_from_description: false,
            show_breadcrumbs: true,
            collapse_long_descriptions: true,
            default_from_description: false,
            expand_buttons: false,
            copy_css: true,
            copy_js: true,
            link_to_reused_ref: true,
            recursive_detection_depth: 25,
            template_name: TemplateName::Js,
            markdown_options: json!({
                "break-on-newline": true,
                "fenced-code-blocks": { "cssclass": "highlight" },
                "tables": null,
            }),
            template_md_options: TemplateMdOptions::default(),
        }
    }
}

impl GenerationConfig {
    /// Load a configuration from a JSON or YAML file.
    ///
    /// Any key absent from the file keeps its default. Malformed content is
    /// fatal before any schema is processed.
    pub fn from_file(path: &Path) -> Result<Self, GenerateError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GenerateError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let parsed: Self = if is_json {
            serde_json::from_str(&content).map_err(|e| {
                GenerateError::Config(format!("cannot parse {}: {}", path.display(), e))
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| {
                GenerateError::Config(format!("cannot parse {}: {}", path.display(), e))
            })?
        };
        Ok(parsed)
    }

    /// Apply `name=value` override strings on top of this configuration.
    ///
    /// A bare `name` sets the option to true; a `no_name` / `no-name` prefix
    /// sets it to false. Values are parsed as JSON when possible, otherwise
    /// kept as strings, so `--config recursive_detection_depth=10` and
    /// `--config template_name=md` both work.
    pub fn apply_overrides(&self, overrides: &[String]) -> Result<Self, GenerateError> {
        if overrides.is_empty() {
            return Ok(self.clone());
        }

        let mut as_value = serde_json::to_value(self)
            .map_err(|e| GenerateError::Config(e.to_string()))?;
        let map = as_value
            .as_object_mut()
            .expect("config serializes to an object");

        for parameter in overrides {
            let (name, value) = match parameter.split_once('=') {
                Some((name, raw)) => {
                    let value = serde_json::from_str(raw)
                        .unwrap_or_else(|_| Value::String(raw.to_string()));
                    (name.to_string(), value)
                }
                None => {
                    if let Some(stripped) = parameter
                        .strip_prefix("no_")
                        .or_else(|| parameter.strip_prefix("no-"))
                    {
                        (stripped.to_string(), Value::Bool(false))
                    } else {
                        (parameter.clone(), Value::Bool(true))
                    }
                }
            };
            map.insert(name, value);
        }

        serde_json::from_value(as_value)
            .map_err(|e| GenerateError::Config(format!("invalid override: {}", e)))
    }
}
