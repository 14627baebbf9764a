//! HTML renderer: a standalone page with anchored nested sections,
//! breadcrumbs, badges and collapsible long descriptions.

use std::collections::HashSet;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::circular::CircularRefDetector;
use crate::config::GenerationConfig;
use crate::node::{NodeId, NodeRef, SchemaGraph};
use crate::query::{
    first_line, get_default_from_description, get_description, get_description_remove_default,
    get_numeric_restrictions_text, get_type_name, is_combining, is_deprecated, is_text_short,
    literal_to_json_text,
};

use super::{escape_html, MarkdownConverter, CSS_FILE_NAME, JS_FILE_NAME};

const COMBINING_KEYWORDS: [&str; 4] = ["allOf", "anyOf", "oneOf", "not"];

pub(crate) struct HtmlRenderer<'a> {
    graph: &'a SchemaGraph,
    config: &'a GenerationConfig,
    converter: &'a dyn MarkdownConverter,
    detector: CircularRefDetector<'a>,
    /// Sections currently being rendered, to cut re-entrant recursion.
    active: HashSet<NodeId>,
}

impl<'a> HtmlRenderer<'a> {
    pub(crate) fn new(
        graph: &'a SchemaGraph,
        config: &'a GenerationConfig,
        converter: &'a dyn MarkdownConverter,
    ) -> Self {
        Self {
            graph,
            config,
            converter,
            detector: CircularRefDetector::new(graph, config),
            active: HashSet::new(),
        }
    }

    pub(crate) fn render(&mut self) -> String {
        let root = self.graph.root();
        let title = escape_html(root.title().unwrap_or("Schema Docs"));

        let mut body = String::new();
        self.render_section(&mut body, root, 0);

        let expand_buttons = if self.config.expand_buttons {
            concat!(
                "<div class=\"expand-controls\">",
                "<button id=\"expand-all\" class=\"btn btn-primary\">Expand all</button>",
                "<button id=\"collapse-all\" class=\"btn btn-secondary\">Collapse all</button>",
                "</div>\n"
            )
        } else {
            ""
        };

        let output = format!(
            "<!DOCTYPE html>\n\
             <html lang=\"en\">\n\
             <head>\n\
             <meta charset=\"utf-8\"/>\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\"/>\n\
             <link rel=\"stylesheet\" type=\"text/css\" href=\"{css}\"/>\n\
             <script src=\"{js}\"></script>\n\
             <title>{title}</title>\n\
             </head>\n\
             <body>\n\
             <h1>{title}</h1>\n\
             {expand_buttons}{body}\
             <footer><p class=\"generated-by-footer\">Generated using schema-doc on {time}</p></footer>\n\
             </body>\n\
             </html>\n",
            css = CSS_FILE_NAME,
            js = JS_FILE_NAME,
            title = title,
            expand_buttons = expand_buttons,
            body = body,
            time = super::local_time(),
        );

        if self.config.minify {
            minify_html(&output)
        } else {
            output
        }
    }

    fn render_section(&mut self, out: &mut String, node: NodeRef<'a>, depth: usize) {
        out.push_str(&format!(
            "<div class=\"schema-section\" id=\"{}\">\n",
            escape_html(node.html_id())
        ));

        if depth > 0 {
            let title = node
                .property_display_name()
                .map(str::to_string)
                .unwrap_or_else(|| node.name_for_breadcrumbs().to_string());
            // h2 through h6, then stay at h6.
            let level = (depth + 1).min(6);
            out.push_str(&format!(
                "<h{level}>{}{}</h{level}>\n",
                escape_html(&title),
                self.badges(node),
            ));
        } else if let Some(badges) = Some(self.badges(node)).filter(|b| !b.is_empty()) {
            out.push_str(&format!("<p>{}</p>\n", badges));
        }

        if self.config.show_breadcrumbs && depth > 0 {
            let crumbs: Vec<String> = node
                .nodes_from_root()
                .iter()
                .map(|n| escape_html(n.name_for_breadcrumbs()))
                .filter(|name| !name.is_empty())
                .collect();
            if !crumbs.is_empty() {
                out.push_str(&format!(
                    "<div class=\"breadcrumbs\">{}</div>\n",
                    crumbs.join(" &gt; ")
                ));
            }
        }

        if node.should_be_a_link(self.config, &mut self.detector) {
            if let Some(target) = node.links_to() {
                out.push_str(&self.same_definition_as(target));
            }
            out.push_str("</div>\n");
            return;
        }

        if !self.active.insert(node.id()) {
            let target = node.links_to().or_else(|| node.refers_to()).unwrap_or(node);
            out.push_str(&self.same_definition_as(target));
            out.push_str("</div>\n");
            return;
        }

        out.push_str(&format!(
            "<span class=\"badge badge-type\">Type: {}</span>\n",
            escape_html(&if is_combining(node) {
                "combining".to_string()
            } else {
                get_type_name(node)
            })
        ));

        self.render_description(out, node);

        let body = effective_body(node);
        // Own keywords overlaid on the referenced node's, so a `$ref`
        // extended with extra keywords renders the inherited content too.
        let inherited = body.merged_keywords();

        let default = if self.config.default_from_description {
            get_default_from_description(node)
        } else {
            node.default_value()
        };
        if let Some(default) = default {
            out.push_str(&format!(
                "<p><span class=\"badge badge-default\">Default: <code>{}</code></span></p>\n",
                escape_html(default)
            ));
        }

        self.render_restrictions(out, body, &inherited);

        if let Some(const_node) = inherited.get("const").copied() {
            if let Some(value) = const_node.literal() {
                out.push_str(&format!(
                    "<p>Specific value: <code>{}</code></p>\n",
                    escape_html(&literal_to_json_text(value))
                ));
            }
        }

        if let Some(enum_node) = inherited.get("enum").copied() {
            out.push_str("<p>Must be one of:</p>\n<ul class=\"enum-values\">\n");
            for item in enum_node.array_items() {
                if let Some(value) = item.literal() {
                    out.push_str(&format!(
                        "<li><code>{}</code></li>\n",
                        escape_html(&literal_to_json_text(value))
                    ));
                }
            }
            out.push_str("</ul>\n");
        }

        for keyword in COMBINING_KEYWORDS {
            let Some(combining) = inherited.get(keyword).copied() else {
                continue;
            };
            out.push_str(&format!(
                "<div class=\"combining\"><p class=\"combining-kind\">{}</p>\n",
                escape_html(keyword)
            ));
            if combining.array_items().next().is_some() {
                for item in combining.array_items() {
                    self.render_section(out, item, depth + 1);
                }
            } else {
                self.render_section(out, combining, depth + 1);
            }
            out.push_str("</div>\n");
        }

        for keyword in ["if", "then", "else"] {
            if let Some(conditional) = inherited.get(keyword).copied() {
                out.push_str(&format!(
                    "<div class=\"conditional\"><p class=\"conditional-kind\">{}</p>\n",
                    keyword
                ));
                self.render_section(out, conditional, depth + 1);
                out.push_str("</div>\n");
            }
        }

        if get_type_name(node).starts_with("array") {
            for item in items_of(&inherited) {
                self.render_section(out, item, depth + 1);
            }
        }

        let properties: Vec<NodeRef<'a>> = properties_source(body).iter_properties().collect();
        for property in properties {
            self.render_section(out, property, depth + 1);
        }

        let examples = if node.examples().is_empty() {
            body.examples()
        } else {
            node.examples()
        };
        if !examples.is_empty() {
            out.push_str("<p class=\"examples-label\">Examples:</p>\n");
            for example in examples {
                out.push_str(&format!(
                    "<pre class=\"example\"><code>{}</code></pre>\n",
                    escape_html(example)
                ));
            }
        }

        self.active.remove(&node.id());
        out.push_str("</div>\n");
    }

    fn badges(&self, node: NodeRef<'a>) -> String {
        let mut badges = String::new();
        if node.is_required_property() {
            badges.push_str("<span class=\"badge badge-required\">Required</span>");
        }
        if is_deprecated(self.config, node) {
            badges.push_str("<span class=\"badge badge-deprecated\">Deprecated</span>");
        }
        badges
    }

    fn same_definition_as(&self, target: NodeRef<'a>) -> String {
        format!(
            "<p>Same definition as <a href=\"#{}\">{}</a></p>\n",
            escape_html(target.html_id()),
            escape_html(target.link_name())
        )
    }

    /// Long descriptions collapse behind a one-line summary when
    /// `collapse_long_descriptions` is set.
    fn render_description(&self, out: &mut String, node: NodeRef<'a>) {
        let description = if self.config.default_from_description {
            get_description_remove_default(node)
        } else {
            get_description(node)
        };
        if description.is_empty() {
            return;
        }

        let converted = if self.config.description_is_markdown {
            self.converter
                .convert(description, &self.config.markdown_options)
        } else {
            format!("<p>{}</p>", escape_html(description))
        };

        if self.config.collapse_long_descriptions && !is_text_short(description) {
            out.push_str(&format!(
                "<details class=\"description-collapsed\">\
                 <summary>{}</summary>\n{}\n</details>\n",
                escape_html(&first_line(description, Some(80))),
                converted
            ));
        } else {
            out.push_str(&format!(
                "<div class=\"description\">{}</div>\n",
                converted
            ));
        }
    }

    fn render_restrictions(
        &self,
        out: &mut String,
        node: NodeRef<'a>,
        keywords: &IndexMap<&'a str, NodeRef<'a>>,
    ) {
        let mut lines = Vec::new();

        if let Some(min_length) = keywords.get("minLength").and_then(|n| n.literal()) {
            lines.push(format!("Must be at least <code>{}</code> characters long", min_length));
        }
        if let Some(max_length) = keywords.get("maxLength").and_then(|n| n.literal()) {
            lines.push(format!("Must be at most <code>{}</code> characters long", max_length));
        }
        if let Some(pattern) = keywords
            .get("pattern")
            .and_then(|n| n.literal())
            .and_then(Value::as_str)
        {
            lines.push(format!(
                "Must match regular expression <code>{}</code>",
                escape_html(pattern)
            ));
        }
        let numeric = get_numeric_restrictions_text(node, "<code>", "</code>");
        if !numeric.is_empty() {
            lines.push(numeric);
        }

        for line in lines {
            out.push_str(&format!("<p class=\"restriction\">{}</p>\n", line));
        }
    }
}

/// Follow `$ref`-only nodes to the node carrying the actual content.
fn effective_body(node: NodeRef<'_>) -> NodeRef<'_> {
    let mut seen = HashSet::new();
    let mut current = node;
    while current.properties().next().is_none()
        && current.keywords().next().is_none()
        && seen.insert(current.id())
    {
        match current.refers_to() {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

/// Follow the `refers_to` chain to the node carrying `properties`, so a
/// reference extended with extra keywords still lists the target's
/// properties.
fn properties_source(node: NodeRef<'_>) -> NodeRef<'_> {
    let mut seen = HashSet::new();
    let mut current = node;
    while current.iter_properties().next().is_none() && seen.insert(current.id()) {
        match current.refers_to() {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

/// `items` can be a single schema or a tuple of schemas.
fn items_of<'a>(keywords: &IndexMap<&'a str, NodeRef<'a>>) -> Vec<NodeRef<'a>> {
    let Some(items) = keywords.get("items").copied() else {
        return Vec::new();
    };
    let tuple: Vec<NodeRef<'a>> = items.array_items().collect();
    if tuple.is_empty() {
        vec![items]
    } else {
        tuple
    }
}

fn minify_html(html: &str) -> String {
    static BETWEEN_TAGS: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let between_tags =
        BETWEEN_TAGS.get_or_init(|| Regex::new(r">\s+<").expect("minify pattern is valid"));
    between_tags.replace_all(html.trim(), "><").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::render::PlainMarkdownConverter;
    use serde_json::json;
    use std::collections::HashMap;

    fn graph_for(value: serde_json::Value) -> SchemaGraph {
        crate::resolver::build_intermediate_representation(
            "mem://schema.json",
            &GenerationConfig::default(),
            Some(HashMap::from([("mem://schema.json".to_string(), value)])),
        )
        .expect("fixture builds")
    }

    #[test]
    fn test_document_links_assets_and_titles() {
        let graph = graph_for(json!({"title": "Person", "type": "object"}));
        let config = GenerationConfig::default();
        let html = HtmlRenderer::new(&graph, &config, &PlainMarkdownConverter).render();

        assert!(html.contains("<title>Person</title>"));
        assert!(html.contains("schema_doc.css"));
        assert!(html.contains("schema_doc.min.js"));
        assert!(html.contains("Generated using schema-doc on"));
    }

    #[test]
    fn test_required_property_carries_badge() {
        let graph = graph_for(json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        }));
        let config = GenerationConfig::default();
        let html = HtmlRenderer::new(&graph, &config, &PlainMarkdownConverter).render();
        assert!(html.contains("badge-required"));
    }

    #[test]
    fn test_minify_collapses_between_tags() {
        assert_eq!(minify_html("<p>a</p>\n  <p>b</p>"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_long_description_collapses() {
        let long = "word ".repeat(400);
        let graph = graph_for(json!({"type": "object", "description": long}));
        let config = GenerationConfig {
            minify: false,
            ..GenerationConfig::default()
        };
        let html = HtmlRenderer::new(&graph, &config, &PlainMarkdownConverter).render();
        assert!(html.contains("<details class=\"description-collapsed\">"));
    }
}
