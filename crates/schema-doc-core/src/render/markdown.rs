//! Markdown renderer: auto-numbered headings with anchors, a table of
//! contents, badges and padded tables.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::circular::CircularRefDetector;
use crate::config::GenerationConfig;
use crate::node::{NodeId, NodeRef, SchemaGraph};
use crate::query::{
    first_line, get_default_from_description, get_description, get_description_remove_default,
    get_numeric_restrictions_text, get_type_name, get_undocumented_required_properties,
    is_combining, is_deprecated, literal_to_json_text,
};

const COMBINING_KEYWORDS: [&str; 4] = ["allOf", "anyOf", "oneOf", "not"];

struct TocEntry {
    depth: usize,
    menu: String,
}

pub(crate) struct MarkdownRenderer<'a> {
    graph: &'a SchemaGraph,
    config: &'a GenerationConfig,
    detector: CircularRefDetector<'a>,
    /// Last heading number per depth.
    headings: BTreeMap<usize, usize>,
    auto_generated_heading: usize,
    toc: Vec<TocEntry>,
    /// Sections currently being rendered, to cut re-entrant recursion.
    active: HashSet<NodeId>,
}

impl<'a> MarkdownRenderer<'a> {
    pub(crate) fn new(graph: &'a SchemaGraph, config: &'a GenerationConfig) -> Self {
        Self {
            graph,
            config,
            detector: CircularRefDetector::new(graph, config),
            headings: BTreeMap::new(),
            auto_generated_heading: 0,
            toc: Vec::new(),
            active: HashSet::new(),
        }
    }

    pub(crate) fn render(&mut self) -> String {
        let mut body = String::new();
        self.render_section(&mut body, self.graph.root(), 0);

        let toc = self.toc_text();
        let mut output = String::new();
        match body.split_once('\n') {
            Some((first_heading, rest)) => {
                output.push_str(first_heading);
                output.push('\n');
                if !toc.is_empty() {
                    output.push('\n');
                    output.push_str(&toc);
                }
                output.push_str(rest);
            }
            None => output.push_str(&body),
        }

        output.push_str(&format!(
            "\n---\n\nGenerated using schema-doc on {}\n",
            super::local_time()
        ));

        if self.config.minify {
            squash_blank_lines(&output)
        } else {
            output
        }
    }

    // ── Section assembly ────────────────────────────────────────────────

    fn render_section(&mut self, out: &mut String, node: NodeRef<'a>, depth: usize) {
        let title = if depth == 0 {
            node.title().unwrap_or("Schema Docs").to_string()
        } else {
            node.property_display_name()
                .map(str::to_string)
                .unwrap_or_else(|| node.name_for_breadcrumbs().to_string())
        };
        let heading = self.heading(&title, depth, Some(node.html_id()));
        out.push_str(&heading);
        out.push_str("\n\n");

        if self.config.show_breadcrumbs && depth > 0 {
            let crumbs: Vec<&str> = node
                .nodes_from_root()
                .iter()
                .map(|n| n.name_for_breadcrumbs())
                .filter(|name| !name.is_empty())
                .collect();
            if !crumbs.is_empty() {
                out.push_str(&format!("*Path: {}*\n\n", crumbs.join(" > ")));
            }
        }

        let mut badges = Vec::new();
        if node.is_required_property() {
            badges.push(self.badge("Required", "blue", ""));
        }
        if is_deprecated(self.config, node) {
            badges.push(self.badge("Deprecated", "red", ""));
        }
        if !badges.is_empty() {
            out.push_str(&badges.join(" "));
            out.push_str("\n\n");
        }

        if node.should_be_a_link(self.config, &mut self.detector) {
            if let Some(target) = node.links_to() {
                out.push_str(&format!(
                    "Same definition as {}\n\n",
                    self.link(target.link_name(), target.html_id())
                ));
            }
            return;
        }

        // A section re-entered through an undetected reference cycle falls
        // back to a link instead of recursing forever.
        if !self.active.insert(node.id()) {
            let target = node.links_to().or_else(|| node.refers_to()).unwrap_or(node);
            out.push_str(&format!(
                "Same definition as {}\n\n",
                self.link(target.link_name(), target.html_id())
            ));
            return;
        }

        let description = if self.config.default_from_description {
            get_description_remove_default(node)
        } else {
            get_description(node)
        };
        if !description.is_empty() {
            out.push_str(description);
            out.push_str("\n\n");
        }

        let type_info = self.type_info_table(node);
        out.push_str(&self.generate_table(&type_info));
        out.push('\n');

        let body = effective_body(node);
        // Own keywords overlaid on the referenced node's, so a `$ref`
        // extended with extra keywords renders the inherited content too.
        let inherited = body.merged_keywords();

        let restrictions = self.restrictions_table(body, &inherited);
        if !restrictions.is_empty() {
            out.push_str(&self.generate_table(&restrictions));
            out.push('\n');
        }

        if let Some(const_node) = inherited.get("const").copied() {
            if let Some(value) = const_node.literal() {
                out.push_str(&format!(
                    "Specific value: `{}`\n\n",
                    self.escape_for_table(&literal_to_json_text(value))
                ));
            }
        }

        if let Some(enum_node) = inherited.get("enum").copied() {
            out.push_str("Must be one of:\n");
            for item in enum_node.array_items() {
                if let Some(value) = item.literal() {
                    out.push_str(&format!("* `{}`\n", literal_to_json_text(value)));
                }
            }
            out.push('\n');
        }

        let numeric = get_numeric_restrictions_text(body, "`", "`");
        if !numeric.is_empty() {
            out.push_str(&numeric);
            out.push_str("\n\n");
        }

        for keyword in COMBINING_KEYWORDS {
            let Some(combining) = inherited.get(keyword).copied() else {
                continue;
            };
            if combining.array_items().next().is_some() {
                for item in combining.array_items() {
                    self.render_section(out, item, depth + 1);
                }
            } else {
                self.render_section(out, combining, depth + 1);
            }
        }

        for keyword in ["if", "then", "else"] {
            if let Some(conditional) = inherited.get(keyword).copied() {
                self.render_section(out, conditional, depth + 1);
            }
        }

        if get_type_name(node).starts_with("array") {
            let array_restrictions = self.array_restrictions(&inherited);
            out.push_str(&self.generate_table(&array_restrictions));
            out.push('\n');

            let items_restrictions = self.array_items_restrictions(&inherited);
            if !items_restrictions.is_empty() {
                out.push_str(&self.generate_table(&items_restrictions));
                out.push('\n');
            }
            for item in items_of(&inherited) {
                self.render_section(out, item, depth + 1);
            }
        }

        let props = properties_source(body);
        if props.iter_properties().next().is_some() {
            let table = self.properties_table(props);
            out.push_str(&self.generate_table(&table));
            out.push('\n');
            let properties: Vec<NodeRef<'a>> = props.iter_properties().collect();
            for property in properties {
                self.render_section(out, property, depth + 1);
            }
        }

        let examples = if node.examples().is_empty() {
            body.examples()
        } else {
            node.examples()
        };
        if !examples.is_empty() {
            out.push_str("Examples:\n\n");
            for example in examples {
                out.push_str(&format!("```json\n{}\n```\n\n", example));
            }
        }

        self.active.remove(&node.id());
    }

    // ── Headings and table of contents ──────────────────────────────────

    /// Build a heading line with an auto-computed section number and an
    /// anchor, and record it for the table of contents.
    fn heading(&mut self, title: &str, depth: usize, html_id: Option<&str>) -> String {
        let html_id = match html_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                self.auto_generated_heading += 1;
                format!("autogenerated_heading_{}", self.auto_generated_heading)
            }
        };

        let title = if title.trim().is_empty() {
            "Auto generated title".to_string()
        } else {
            title.trim().to_string()
        };

        // Deeper levels restart their numbering under a new parent.
        let stale: Vec<usize> = self
            .headings
            .keys()
            .copied()
            .filter(|&level| level > depth)
            .collect();
        for level in stale {
            self.headings.remove(&level);
        }

        let mut numbers = String::new();
        for level in 0..=depth {
            let counter = self.headings.entry(level).or_insert(0);
            if level == depth || *counter == 0 {
                *counter += 1;
            }
            if level != 0 {
                numbers.push_str(&format!("{}.", *self.headings.get(&level).unwrap_or(&1)));
            }
        }

        let hashes = "#".repeat(depth + 1);
        let menu = if depth == 0 {
            format!("{} {}", hashes, title)
        } else {
            format!("{} <a name=\"{}\"></a>{} {}", hashes, html_id, numbers, title)
        };

        self.toc.push(TocEntry {
            depth,
            menu: format!("[{} {}](#{})", numbers, title, html_id),
        });

        menu
    }

    fn toc_text(&self) -> String {
        let mut out = String::new();
        // The first heading is the document title and stays out of the TOC;
        // the second one sets the base indentation.
        let base_depth = match self.toc.get(1) {
            Some(entry) => entry.depth,
            None => return out,
        };
        for entry in self.toc.iter().skip(1) {
            let indent = "  ".repeat(entry.depth.saturating_sub(base_depth));
            out.push_str(&format!("{}- {}\n", indent, entry.menu));
        }
        out
    }

    // ── Links and badges ────────────────────────────────────────────────

    fn link(&self, title: &str, anchor: &str) -> String {
        format!("[{}](#{})", title, anchor)
    }

    /// Badge as a shields.io image link when `badge_as_image` is set,
    /// otherwise as plain text.
    fn badge(&self, name: &str, color: &str, value: &str) -> String {
        if self.config.template_md_options.badge_as_image {
            let value_part = if value.is_empty() {
                String::new()
            } else {
                format!("-{}", quote_plus(value))
            };
            format!(
                "![badge](https://img.shields.io/badge/{}{}-{})",
                quote_plus(name),
                value_part,
                quote_plus(color)
            )
        } else if value.is_empty() {
            format!("[{}]", name)
        } else {
            format!("[{}: {}]", name, value)
        }
    }

    fn escape_for_table(&self, text: &str) -> String {
        text.replace('|', "\\|").replace('`', "\\`")
    }

    /// First line for table cells, with backticks swapped for quotes so a
    /// lone backtick cannot break the table.
    fn table_first_line(&self, text: &str, max_length: usize) -> String {
        first_line(text, Some(max_length)).replace('`', "'")
    }

    // ── Tables ──────────────────────────────────────────────────────────

    fn properties_table(&mut self, node: NodeRef<'a>) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let properties: Vec<NodeRef<'a>> = node.iter_properties().collect();

        for property in properties {
            let mut row = Vec::new();

            let marker = if property.is_required_property() {
                "+ "
            } else {
                "- "
            };
            let name = property.property_display_name().unwrap_or("");
            row.push(format!(
                "{}{}",
                marker,
                self.link(&self.escape_for_table(name), property.html_id())
            ));

            row.push(if property.is_pattern_property() {
                "Yes".to_string()
            } else {
                "No".to_string()
            });

            row.push(if is_combining(property) {
                "Combination".to_string()
            } else {
                self.escape_for_table(&get_type_name(property))
            });

            row.push(if is_deprecated(self.config, property) {
                self.badge("Deprecated", "red", "")
            } else {
                "No".to_string()
            });

            if property.should_be_a_link(self.config, &mut self.detector) {
                let target = property.links_to().unwrap_or(property);
                row.push(format!(
                    "Same as {}",
                    self.link(target.link_name(), target.html_id())
                ));
            } else if property.refers_to().is_some() {
                row.push(format!("In {}", property.ref_path().unwrap_or("")));
            } else {
                row.push("-".to_string());
            }

            let description = match property.title() {
                Some(title) => title.to_string(),
                None => {
                    let text = if self.config.default_from_description {
                        get_description_remove_default(property)
                    } else {
                        get_description(property)
                    };
                    if text.is_empty() {
                        "-".to_string()
                    } else {
                        text.to_string()
                    }
                }
            };
            row.push(self.escape_for_table(&self.table_first_line(&description, 80)));

            rows.push(row);
        }

        // Names listed in `required` without a matching `properties` entry
        // still show up, without a link.
        for name in get_undocumented_required_properties(node) {
            rows.push(vec![
                format!("+ {}", self.escape_for_table(&name)),
                "No".to_string(),
                "object".to_string(),
                "No".to_string(),
                "-".to_string(),
                "-".to_string(),
            ]);
        }

        if !rows.is_empty() {
            rows.insert(
                0,
                vec![
                    "Property".to_string(),
                    "Pattern".to_string(),
                    "Type".to_string(),
                    "Deprecated".to_string(),
                    "Definition".to_string(),
                    "Title/Description".to_string(),
                ],
            );
        }
        rows
    }

    fn type_info_table(&mut self, node: NodeRef<'a>) -> Vec<Vec<String>> {
        let mut rows = Vec::new();

        let type_cell = if is_combining(node) {
            "`combining`".to_string()
        } else {
            format!("`{}`", get_type_name(node))
        };
        rows.push(vec!["Type".to_string(), type_cell]);

        if is_deprecated(self.config, node) {
            rows.push(vec![
                "**Deprecated**".to_string(),
                self.badge("Deprecated", "red", ""),
            ]);
        }

        rows.push(vec![
            "**Additional properties**".to_string(),
            self.additional_properties_badge(node),
        ]);

        let default = if self.config.default_from_description {
            get_default_from_description(node)
        } else {
            node.default_value()
        };
        if let Some(default) = default {
            rows.push(vec!["**Default**".to_string(), format!("`{}`", default)]);
        }

        if node.should_be_a_link(self.config, &mut self.detector) {
            if let Some(target) = node.links_to() {
                rows.push(vec![
                    "**Same definition as**".to_string(),
                    self.link(target.link_name(), target.html_id()),
                ]);
            }
        } else if node.refers_to().is_some() {
            rows.push(vec![
                "**Defined in**".to_string(),
                node.ref_path().unwrap_or("").to_string(),
            ]);
        }

        rows
    }

    fn additional_properties_badge(&self, node: NodeRef<'a>) -> String {
        for property in node.iter_properties() {
            if property.is_additional_properties() {
                return if property.is_additional_properties_schema() {
                    format!(
                        "[{}](#{} \"Each additional property must conform to the following schema\")",
                        self.badge("Should-conform", "blue", ""),
                        property.html_id()
                    )
                } else {
                    format!(
                        "[{}](# \"Additional Properties of any type are allowed.\")",
                        self.badge("Any type", "green", "allowed")
                    )
                };
            }
        }

        if node.explicit_no_additional_properties() {
            format!(
                "[{}](# \"Additional Properties not allowed.\")",
                self.badge("Not allowed", "red", "")
            )
        } else {
            format!(
                "[{}](# \"Additional Properties of any type are allowed.\")",
                self.badge("Any type", "green", "allowed")
            )
        }
    }

    fn array_restrictions(&self, keywords: &IndexMap<&'a str, NodeRef<'a>>) -> Vec<Vec<String>> {
        let literal_cell = |keyword: &str| -> String {
            keywords
                .get(keyword)
                .and_then(|n| n.literal())
                .map(|v| v.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        };
        let bool_cell = |keyword: &str| -> String {
            let set = keywords
                .get(keyword)
                .and_then(|n| n.literal())
                .map(|v| v == &Value::Bool(true))
                .unwrap_or(false);
            if set { "True" } else { "False" }.to_string()
        };

        let tuple_validation = if keywords.contains_key("items") || keywords.contains_key("contains")
        {
            "See below".to_string()
        } else {
            "N/A".to_string()
        };

        vec![
            vec!["".to_string(), "Array restrictions".to_string()],
            vec!["**Min items**".to_string(), literal_cell("minItems")],
            vec!["**Max items**".to_string(), literal_cell("maxItems")],
            vec!["**Items unicity**".to_string(), bool_cell("uniqueItems")],
            vec![
                "**Additional items**".to_string(),
                bool_cell("additionalItems"),
            ],
            vec!["**Tuple validation**".to_string(), tuple_validation],
        ]
    }

    fn array_items_restrictions(&self, keywords: &IndexMap<&'a str, NodeRef<'a>>) -> Vec<Vec<String>> {
        let items = items_of(keywords);
        if items.is_empty() {
            return Vec::new();
        }
        let mut rows = vec![vec![
            "Each item of this array must be".to_string(),
            "Description".to_string(),
        ]];
        for (idx, item) in items.iter().enumerate() {
            let label = if item.name_for_breadcrumbs().is_empty() {
                format!("Array Item {}", idx)
            } else {
                item.name_for_breadcrumbs().to_string()
            };
            let description = {
                let text = get_description(*item);
                if text.is_empty() { "-" } else { text }
            };
            rows.push(vec![
                self.link(&label, item.html_id()),
                self.escape_for_table(&self.table_first_line(description, 80)),
            ]);
        }
        rows
    }

    fn restrictions_table(
        &self,
        node: NodeRef<'a>,
        keywords: &IndexMap<&'a str, NodeRef<'a>>,
    ) -> Vec<Vec<String>> {
        let mut rows = Vec::new();

        if let Some(min_length) = keywords.get("minLength").and_then(|n| n.literal()) {
            rows.push(vec!["**Min length**".to_string(), min_length.to_string()]);
        }
        if let Some(max_length) = keywords.get("maxLength").and_then(|n| n.literal()) {
            rows.push(vec!["**Max length**".to_string(), max_length.to_string()]);
        }
        if let Some(pattern) = keywords
            .get("pattern")
            .and_then(|n| n.literal())
            .and_then(Value::as_str)
        {
            let code = pattern.replace('|', "\\|");
            let mut test_url = format!("https://regex101.com/?regex={}", quote_plus(pattern));
            if let Some(example) = node.examples().first() {
                test_url.push_str(&format!("&testString={}", quote_plus(example)));
            }
            rows.push(vec![
                "**Must match regular expression**".to_string(),
                format!("```{}``` [Test]({})", code, test_url),
            ]);
        }
        if let Some(multiple_of) = keywords.get("multipleOf").and_then(|n| n.literal()) {
            rows.push(vec!["**Multiple of**".to_string(), multiple_of.to_string()]);
        }
        if keywords.contains_key("minimum") || keywords.contains_key("exclusiveMinimum") {
            rows.push(vec![
                "**Minimum**".to_string(),
                self.numeric_minimum_restriction(keywords),
            ]);
        }
        if keywords.contains_key("maximum") || keywords.contains_key("exclusiveMaximum") {
            rows.push(vec![
                "**Maximum**".to_string(),
                self.numeric_maximum_restriction(keywords),
            ]);
        }

        if !rows.is_empty() {
            rows.insert(0, vec!["Restrictions".to_string(), " ".to_string()]);
        }
        rows
    }

    fn numeric_minimum_restriction(&self, keywords: &IndexMap<&'a str, NodeRef<'a>>) -> String {
        let value = |keyword: &str| {
            keywords
                .get(keyword)
                .and_then(|n| n.literal())
                .filter(|v| v.is_number())
                .cloned()
        };
        let mut minimum = value("minimum");
        let mut exclusive = value("exclusiveMinimum");
        // The tighter bound wins when both forms are present.
        if let (Some(min), Some(emin)) = (&minimum, &exclusive) {
            if min.as_f64() <= emin.as_f64() {
                minimum = None;
            } else {
                exclusive = None;
            }
        }
        if let Some(emin) = exclusive {
            format!("&gt; {}", emin)
        } else if let Some(min) = minimum {
            format!("&ge; {}", min)
        } else {
            "N/A".to_string()
        }
    }

    fn numeric_maximum_restriction(&self, keywords: &IndexMap<&'a str, NodeRef<'a>>) -> String {
        let value = |keyword: &str| {
            keywords
                .get(keyword)
                .and_then(|n| n.literal())
                .filter(|v| v.is_number())
                .cloned()
        };
        let mut maximum = value("maximum");
        let mut exclusive = value("exclusiveMaximum");
        if let (Some(max), Some(emax)) = (&maximum, &exclusive) {
            if max.as_f64() > emax.as_f64() {
                maximum = None;
            } else {
                exclusive = None;
            }
        }
        if let Some(emax) = exclusive {
            format!("&lt; {}", emax)
        } else if let Some(max) = maximum {
            format!("&le; {}", max)
        } else {
            "N/A".to_string()
        }
    }

    /// Pretty-print a table: every column padded to its widest cell, a
    /// separator under the header row, an empty row at the bottom.
    fn generate_table(&self, table: &[Vec<String>]) -> String {
        if table.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = Vec::new();
        for row in table {
            for (col, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                if col >= widths.len() {
                    widths.push(len);
                } else if len > widths[col] {
                    widths[col] = len;
                }
            }
        }

        let mut output = String::new();
        for (row_idx, row) in table.iter().enumerate() {
            for (col, cell) in row.iter().enumerate() {
                output.push_str(&format!("| {:<width$} ", cell, width = widths[col]));
            }
            output.push_str("|\n");
            if row_idx == 0 {
                for width in widths.iter().take(row.len()) {
                    output.push_str(&format!("| {} ", "-".repeat(*width)));
                }
                output.push_str("|\n");
            }
        }
        for width in &widths {
            output.push_str(&format!("| {} ", " ".repeat(*width)));
        }
        output.push_str("|\n");

        output
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

/// `application/x-www-form-urlencoded` escaping (space becomes `+`).
fn quote_plus(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

fn squash_blank_lines(text: &str) -> String {
    // Multiple contiguous blank lines collapse to one.
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"\n\s*\n").expect("blank line pattern is valid"));
    pattern.replace_all(text, "\n\n").into_owned()
}
