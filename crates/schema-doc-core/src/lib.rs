//! Generate human-readable documentation from a JSON Schema.
//!
//! A schema document (JSON or YAML, local or remote) is resolved into an
//! annotated node graph with every `$ref` followed, then rendered to a
//! standalone HTML page or a Markdown document.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use schema_doc_core::{generate_from_filename, GenerationConfig};
//! use std::path::Path;
//!
//! let config = GenerationConfig::default();
//! generate_from_filename(
//!     Path::new("schema.json"),
//!     Path::new("schema_doc.html"),
//!     &config,
//! )?;
//! # Ok::<(), schema_doc_core::GenerateError>(())
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

pub mod circular;
pub mod config;
pub mod error;
pub mod loader;
pub mod node;
pub mod query;
pub mod render;
pub mod resolver;

pub use config::{GenerationConfig, TemplateName};
pub use error::{GenerateError, LoadError};
pub use node::{NodeRef, SchemaGraph};
pub use render::{copy_assets_to_target, MarkdownConverter, PlainMarkdownConverter};
pub use resolver::build_intermediate_representation;

/// Generate documentation text for the schema at `schema_location`.
///
/// `preloaded` optionally maps canonical locations to already-parsed
/// documents, so a caller holding schemas in memory can skip the filesystem.
/// The output format follows `config.template_name`.
pub fn generate_from_schema(
    schema_location: &str,
    config: &GenerationConfig,
    preloaded: Option<HashMap<String, Value>>,
) -> Result<String, GenerateError> {
    let graph = resolver::build_intermediate_representation(schema_location, config, preloaded)?;
    tracing::debug!(nodes = graph.node_count(), "schema graph built");
    Ok(render::render(&graph, config))
}

/// Generate documentation for `schema_location` and write it to
/// `result_path`, copying the CSS and JS assets next to it for HTML output.
pub fn generate_from_filename(
    schema_location: &Path,
    result_path: &Path,
    config: &GenerationConfig,
) -> Result<(), GenerateError> {
    let location = schema_location.to_string_lossy();
    let output = generate_from_schema(&location, config, None)?;

    std::fs::write(result_path, output).map_err(|e| GenerateError::Output {
        path: result_path.display().to_string(),
        source: e,
    })?;
    tracing::info!(result = %result_path.display(), "documentation written");

    if matches!(config.template_name, TemplateName::Js) {
        copy_assets_to_target(result_path, config)?;
    }
    Ok(())
}
