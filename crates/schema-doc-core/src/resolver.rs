//! The recursive tree-walk that builds the annotated node graph.
//!
//! [`build_intermediate_representation`] walks a raw schema document,
//! materializes a [`SchemaNode`] per fragment, resolves every `$ref`
//! (including cross-file, cross-URL and cyclic ones) and decides, for each
//! reused target, which referencing occurrence is rendered in full and which
//! ones become links to it. The less nested occurrence wins, so the full
//! body sits closer to where the reader is.
//!
//! All per-run state (the node arena, the loaded-documents cache, the
//! resolved-reference table and the reference-users table) lives in a
//! [`Builder`] session — nothing is process-wide, so repeated invocations
//! cannot contaminate each other.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde_json::Value;
use url::Url;

use crate::config::GenerationConfig;
use crate::error::{GenerateError, LoadError};
use crate::loader::{canonicalize_location, SchemaLoader};
use crate::node::{
    NodeContent, NodeId, ObjectContent, PathSegment, SchemaGraph, SchemaNode,
    KW_ADDITIONAL_PROPERTIES, KW_PATTERN_PROPERTIES, KW_PROPERTIES,
};
use crate::query::escape_property_name_for_id;

/// Keywords that are structural only and never rendered directly.
/// `definitions` entries are reached through `$ref`, not by recursion.
const SKIPPED_KEYWORDS: [&str; 4] = ["$id", "$ref", "$schema", "definitions"];

/// Build the annotated node graph for the schema at `schema_location`.
///
/// `schema_location` is a local path or a URL. `preloaded` optionally maps
/// canonical locations to already-parsed documents, merged into the loader
/// cache so the caller can inject documents it already holds in memory.
///
/// Any load, parse or reference failure aborts the whole build.
pub fn build_intermediate_representation(
    schema_location: &str,
    _config: &GenerationConfig,
    preloaded: Option<HashMap<String, Value>>,
) -> Result<SchemaGraph, GenerateError> {
    let loader = match preloaded {
        Some(documents) => SchemaLoader::with_preloaded(documents),
        None => SchemaLoader::new(),
    };
    let mut builder = Builder {
        nodes: Vec::new(),
        loader,
        resolved_references: HashMap::new(),
        reference_users: HashMap::new(),
    };

    let root_location = canonicalize_location(schema_location)?;
    let root_document = builder.loader.load(&root_location, &[])?;
    let root = builder.build_node(
        0,
        "",
        "root",
        &root_location,
        Vec::new(),
        &root_document,
        None,
        None,
    )?;

    Ok(SchemaGraph::new(builder.nodes, root))
}

/// One generation session: the arena under construction plus the per-run
/// reference bookkeeping.
struct Builder {
    nodes: Vec<SchemaNode>,
    loader: SchemaLoader,
    /// `(file, flat path)` → the node built for that schema element.
    resolved_references: HashMap<(String, String), NodeId>,
    /// `(file, anchor)` → every node whose `$ref` reached that target.
    reference_users: HashMap<(String, String), Vec<NodeId>>,
}

impl Builder {
    fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.index()]
    }

    /// Recursively build the node for one schema fragment.
    ///
    /// The node is recorded in the resolved-reference table before its
    /// children are built, so children and later siblings can detect a
    /// reference back to it.
    #[allow(clippy::too_many_arguments)]
    fn build_node(
        &mut self,
        depth: usize,
        html_id: &str,
        breadcrumb_name: &str,
        file: &str,
        path_to_element: Vec<PathSegment>,
        schema: &Value,
        parent: Option<NodeId>,
        parent_key: Option<&str>,
    ) -> Result<NodeId, GenerateError> {
        let html_id = if html_id.is_empty() {
            let derived = path_to_element
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join("_");
            if derived.is_empty() {
                "root".to_string()
            } else {
                derived
            }
        } else {
            html_id.to_string()
        };
        // Children append to the parent's id, except at the root where ids
        // start fresh.
        let id_base = if html_id == "root" {
            String::new()
        } else {
            html_id.clone()
        };

        let flat_path = PathSegment::join(&path_to_element);
        let path = path_to_element.clone();

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SchemaNode {
            depth,
            file: file.to_string(),
            path_to_element,
            html_id,
            breadcrumb_name: breadcrumb_name.to_string(),
            parent,
            parent_key: parent_key.map(str::to_string),
            ref_path: schema
                .get("$ref")
                .and_then(Value::as_str)
                .map(str::to_string),
            content: NodeContent::Scalar(Value::Null),
            links_to: None,
            refers_to: None,
            is_displayed: true,
        });
        self.resolved_references
            .insert((file.to_string(), flat_path), id);

        match schema {
            Value::Object(map) => {
                let mut content = ObjectContent::default();
                let mut pattern_id = 1usize;

                for (key, value) in map {
                    if SKIPPED_KEYWORDS.contains(&key.as_str()) {
                        continue;
                    }

                    // Examples and defaults are shown as JSON text, they do
                    // not become nodes.
                    if key == "examples" {
                        content.examples = format_examples(value);
                        continue;
                    }
                    if key == "default" {
                        content.default = Some(value.to_string());
                        continue;
                    }

                    if key == KW_PROPERTIES {
                        if let Value::Object(entries) = value {
                            for (name, property_schema) in entries {
                                let child = self.build_node(
                                    depth + 1,
                                    &child_html_id(&id_base, &escape_property_name_for_id(name)),
                                    name,
                                    file,
                                    extend_path(&path, PathSegment::Key(name.clone())),
                                    property_schema,
                                    Some(id),
                                    Some(name),
                                )?;
                                content.properties.insert(name.clone(), child);
                            }
                            continue;
                        }
                    } else if key == KW_PATTERN_PROPERTIES {
                        if let Value::Object(entries) = value {
                            for (name, property_schema) in entries {
                                // Pattern strings are not safe identifiers,
                                // so ids are positional.
                                let suffix = format!("pattern{}", pattern_id);
                                pattern_id += 1;
                                let child = self.build_node(
                                    depth + 1,
                                    &child_html_id(&id_base, &suffix),
                                    name,
                                    file,
                                    extend_path(&path, PathSegment::Key(name.clone())),
                                    property_schema,
                                    Some(id),
                                    Some(name),
                                )?;
                                content.pattern_properties.insert(name.clone(), child);
                            }
                            continue;
                        }
                    } else if key == KW_ADDITIONAL_PROPERTIES {
                        if value == &Value::Bool(false) {
                            content.no_additional_properties = true;
                        } else {
                            let child = self.build_node(
                                depth + 1,
                                &child_html_id(&id_base, KW_ADDITIONAL_PROPERTIES),
                                KW_ADDITIONAL_PROPERTIES,
                                file,
                                extend_path(
                                    &path,
                                    PathSegment::Key(KW_ADDITIONAL_PROPERTIES.to_string()),
                                ),
                                value,
                                Some(id),
                                Some(KW_ADDITIONAL_PROPERTIES),
                            )?;
                            content.additional_properties = Some(child);
                        }
                        continue;
                    }

                    // Every other keyword becomes a keyword child.
                    let suffix = if parent_key == Some(KW_PATTERN_PROPERTIES) {
                        let s = format!("pattern{}", pattern_id);
                        pattern_id += 1;
                        s
                    } else {
                        escape_property_name_for_id(key)
                    };
                    let child = self.build_node(
                        depth + 1,
                        &child_html_id(&id_base, &suffix),
                        key,
                        file,
                        extend_path(&path, PathSegment::Key(key.clone())),
                        value,
                        Some(id),
                        Some(key),
                    )?;
                    content.keywords.insert(key.clone(), child);
                }

                self.node_mut(id).content = NodeContent::Object(Box::new(content));
            }
            Value::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for (i, element) in elements.iter().enumerate() {
                    let child = self.build_node(
                        depth + 1,
                        &child_html_id(&id_base, &format!("i{}", i)),
                        &format!("item {}", i),
                        file,
                        extend_path(&path, PathSegment::Index(i)),
                        element,
                        Some(id),
                        None,
                    )?;
                    items.push(child);
                }
                self.node_mut(id).content = NodeContent::Array(items);
            }
            literal => {
                self.node_mut(id).content = NodeContent::Scalar(literal.clone());
            }
        }

        let (links_to, refers_to) = self.resolve_ref(id, schema)?;
        let node = self.node_mut(id);
        node.links_to = links_to;
        node.refers_to = refers_to;

        Ok(id)
    }

    /// Resolve the `$ref` of a freshly built node.
    ///
    /// Returns `(links_to, refers_to)`:
    /// - no `$ref` → `(None, None)`;
    /// - never-seen target → built now, returned as both;
    /// - already-built target → the depth contest decides which occurrence
    ///   stays displayed (see module docs), and a reference loop back to the
    ///   current node yields `(None, None)` to break the cycle.
    fn resolve_ref(
        &mut self,
        current: NodeId,
        schema: &Value,
    ) -> Result<(Option<NodeId>, Option<NodeId>), GenerateError> {
        let Some(ref_value) = schema.get("$ref") else {
            return Ok((None, None));
        };
        let Some(reference_path) = ref_value.as_str() else {
            return Err(GenerateError::Reference {
                ref_path: ref_value.to_string(),
                path: self.node(current).flat_path(),
                reason: "$ref must be a string".to_string(),
            });
        };
        if reference_path.is_empty() {
            return Ok((None, None));
        }

        // "#/a/b", "file.json#/a/b", or "file.json"
        let (uri_part, anchor_part) = match reference_path.split_once('#') {
            Some((uri, anchor)) => (uri, anchor.trim_matches('/')),
            None => (reference_path, ""),
        };
        let referenced_schema_path =
            self.resolve_ref_location(current, reference_path, uri_part)?;

        let found = self
            .resolved_references
            .get(&(referenced_schema_path.clone(), anchor_part.to_string()))
            .copied();

        if found == Some(current) {
            // The ref resolves to the node itself; re-building the target
            // would recurse forever, so the node carries no usable reference.
            tracing::debug!(
                ref_path = reference_path,
                "breaking direct self-reference"
            );
            return Ok((None, None));
        }

        let target_key = (referenced_schema_path.clone(), anchor_part.to_string());

        if let Some(found_id) = found {
            let users_snapshot = self
                .reference_users
                .get(&target_key)
                .cloned()
                .unwrap_or_default();
            self.reference_users
                .entry(target_key)
                .or_default()
                .push(current);

            // An earlier node may itself reference the current one; if the
            // chain of users leads back here, drop the reference to break
            // the loop.
            if self.user_chain_reaches(current) {
                tracing::debug!(
                    ref_path = reference_path,
                    "reference loop detected, dropping reference"
                );
                return Ok((None, None));
            }

            // Follow refers_to forward to the nearest displayed node.
            let mut found_id = found_id;
            loop {
                let node = self.node(found_id);
                if node.is_displayed {
                    break;
                }
                match node.refers_to {
                    Some(next) if next != current => found_id = next,
                    _ => break,
                }
            }

            if !users_snapshot.is_empty() {
                if let Some(result) =
                    self.contest_canonical(current, found_id, &users_snapshot)
                {
                    return Ok(result);
                }
            }

            return Ok((Some(found_id), Some(found_id)));
        }

        self.reference_users
            .entry(target_key)
            .or_default()
            .push(current);

        // Never-seen target: build it now, inheriting the referencing
        // node's depth, id and breadcrumb so it renders in place.
        let segments = parse_anchor(anchor_part);
        let fragment = self
            .loader
            .load(&referenced_schema_path, &segments)
            .map_err(GenerateError::Load)?;
        let (depth, html_id, breadcrumb, parent, parent_key) = {
            let node = self.node(current);
            (
                node.depth,
                node.html_id.clone(),
                node.breadcrumb_name.clone(),
                node.parent,
                node.parent_key.clone(),
            )
        };
        let new_id = self.build_node(
            depth,
            &html_id,
            &breadcrumb,
            &referenced_schema_path,
            segments,
            &fragment,
            parent,
            parent_key.as_deref(),
        )?;
        Ok((Some(new_id), Some(new_id)))
    }

    /// Resolve the location part of a `$ref` against the referencing node's
    /// own file.
    fn resolve_ref_location(
        &self,
        current: NodeId,
        reference_path: &str,
        uri_part: &str,
    ) -> Result<String, GenerateError> {
        let current_file = &self.node(current).file;
        if uri_part.is_empty() {
            return Ok(current_file.clone());
        }
        if uri_part.starts_with("http") {
            return Ok(uri_part.to_string());
        }
        if current_file.starts_with("http") {
            // Relative reference inside a remote document.
            return Url::parse(current_file)
                .and_then(|base| base.join(uri_part))
                .map(|url| url.to_string())
                .map_err(|e| GenerateError::Reference {
                    ref_path: reference_path.to_string(),
                    path: self.node(current).flat_path(),
                    reason: e.to_string(),
                });
        }
        let parent_dir = Path::new(current_file)
            .parent()
            .unwrap_or_else(|| Path::new(""));
        let joined = parent_dir.join(uri_part);
        let canonical = std::fs::canonicalize(&joined).map_err(|e| {
            GenerateError::Load(LoadError::Io {
                location: joined.display().to_string(),
                source: e,
            })
        })?;
        Ok(canonical.to_string_lossy().into_owned())
    }

    /// Decide who stays canonical between the current node and the prior
    /// users of the same target. Returns `None` when no prior displayed user
    /// competes, in which case the caller links straight to the target.
    fn contest_canonical(
        &mut self,
        current: NodeId,
        found_id: NodeId,
        users_snapshot: &[NodeId],
    ) -> Option<(Option<NodeId>, Option<NodeId>)> {
        let current_depth = self.node(current).depth;
        let mut other_user: Option<NodeId> = None;
        let mut other_is_better = false;
        let mut i_am_better = false;

        for &user in users_snapshot {
            if user == current || !self.node(user).is_displayed {
                continue;
            }
            let user_depth = self.node(user).depth;
            match other_user {
                None => other_user = Some(user),
                Some(other) if user_depth < self.node(other).depth => other_user = Some(user),
                _ => {}
            }
            if let Some(other) = other_user {
                let other_depth = self.node(other).depth;
                if other_depth < current_depth {
                    other_user = Some(user);
                    other_is_better = true;
                    i_am_better = false;
                } else if other_depth > current_depth {
                    other_is_better = false;
                    i_am_better = true;
                }
            }
        }

        let other = other_user?;
        if other_is_better {
            // The prior user is nearer to the reader: it gets the full body,
            // the current node becomes a link to it.
            self.node_mut(other).is_displayed = true;
            self.node_mut(current).is_displayed = false;
            tracing::debug!(?other, "shallower prior user stays canonical");
            Some((Some(other), Some(found_id)))
        } else if i_am_better {
            // The current node is less nested: it takes over as the
            // documented instance and the prior user flips to a link.
            self.node_mut(other).is_displayed = false;
            self.node_mut(other).links_to = Some(current);
            self.node_mut(current).is_displayed = true;
            tracing::debug!(?current, "current node takes over as canonical");
            Some((Some(found_id), Some(found_id)))
        } else if self.node(other).refers_to.is_some() {
            // Same depth: first seen remains canonical.
            self.node_mut(current).is_displayed = false;
            Some((Some(other), Some(found_id)))
        } else {
            None
        }
    }

    /// Walk the "who references whom" records starting from the users of the
    /// current node; true when the chain leads back to the current node.
    fn user_chain_reaches(&self, current: NodeId) -> bool {
        let key_of = |node: &SchemaNode| (node.file.clone(), node.flat_path());

        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut frontier: Vec<NodeId> = self
            .reference_users
            .get(&key_of(self.node(current)))
            .cloned()
            .unwrap_or_default();

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for user in frontier {
                if user == current {
                    return true;
                }
                if !seen.insert(user) {
                    continue;
                }
                if let Some(users) = self.reference_users.get(&key_of(self.node(user))) {
                    next.extend(users.iter().copied());
                }
            }
            frontier = next;
        }
        false
    }
}

fn child_html_id(base: &str, suffix: &str) -> String {
    if base.is_empty() {
        suffix.to_string()
    } else {
        format!("{}_{}", base, suffix)
    }
}

fn extend_path(path: &[PathSegment], segment: PathSegment) -> Vec<PathSegment> {
    let mut extended = path.to_vec();
    extended.push(segment);
    extended
}

/// Parse the in-document anchor of a `$ref` into path segments. Numeric
/// segments become indices so anchors can address array elements.
fn parse_anchor(anchor: &str) -> Vec<PathSegment> {
    anchor
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.parse::<usize>() {
            Ok(index) => PathSegment::Index(index),
            Err(_) => PathSegment::Key(segment.to_string()),
        })
        .collect()
}

fn format_examples(value: &Value) -> Vec<String> {
    match value {
        Value::Array(examples) => examples.iter().map(pretty_json).collect(),
        other => vec![pretty_json(other)],
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anchor_mixed_segments() {
        assert_eq!(
            parse_anchor("definitions/a/0/b"),
            vec![
                PathSegment::Key("definitions".to_string()),
                PathSegment::Key("a".to_string()),
                PathSegment::Index(0),
                PathSegment::Key("b".to_string()),
            ]
        );
        assert_eq!(parse_anchor(""), Vec::<PathSegment>::new());
    }

    #[test]
    fn test_child_html_id() {
        assert_eq!(child_html_id("", "first"), "first");
        assert_eq!(child_html_id("first", "second"), "first_second");
    }
}
