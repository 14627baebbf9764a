//! Renderers turning the node graph into output text.
//!
//! The graph is exposed to renderers exclusively through [`NodeRef`] and the
//! query helpers; renderers never reach into the arena directly.

mod assets;
mod html;
mod markdown;

pub use assets::{copy_assets_to_target, CSS_FILE_NAME, JS_FILE_NAME};

use serde_json::Value;

use crate::config::{GenerationConfig, TemplateName};
use crate::node::SchemaGraph;

/// Markdown-to-HTML conversion of description strings is an external
/// collaborator; the core only needs this interface.
pub trait MarkdownConverter {
    /// Convert Markdown `text` to HTML. `options` is the pass-through
    /// `markdown_options` configuration value.
    fn convert(&self, text: &str, options: &Value) -> String;
}

/// Fallback converter: escapes HTML and wraps blank-line-separated chunks in
/// paragraphs. Replace with a real Markdown engine for richer output.
pub struct PlainMarkdownConverter;

impl MarkdownConverter for PlainMarkdownConverter {
    fn convert(&self, text: &str, _options: &Value) -> String {
        text.split("\n\n")
            .filter(|chunk| !chunk.trim().is_empty())
            .map(|chunk| format!("<p>{}</p>", escape_html(chunk.trim())))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the resolved graph with the renderer selected by
/// `config.template_name`.
pub fn render(graph: &SchemaGraph, config: &GenerationConfig) -> String {
    match config.template_name {
        TemplateName::Md => markdown::MarkdownRenderer::new(graph, config).render(),
        TemplateName::Js => {
            html::HtmlRenderer::new(graph, config, &PlainMarkdownConverter).render()
        }
    }
}

/// Local time for the "generated on" footer.
pub(crate) fn local_time() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d at %H:%M:%S %z")
        .to_string()
}
