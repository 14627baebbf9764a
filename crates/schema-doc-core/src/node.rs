//! The annotated schema node graph.
//!
//! Nodes live in a single arena ([`SchemaGraph`]) and reference each other
//! through [`NodeId`] handles — `parent`, `links_to` and `refers_to` are
//! back/cross-references that never own their target, so reference cycles in
//! the schema cannot create ownership cycles here.
//!
//! [`NodeRef`] is the read-only view handed to renderers: every derived
//! property (names, breadcrumbs, required flags, property iteration, keyword
//! lookups) lives on it.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::circular::CircularRefDetector;
use crate::config::GenerationConfig;

pub const KW_ADDITIONAL_PROPERTIES: &str = "additionalProperties";
pub const KW_PATTERN_PROPERTIES: &str = "patternProperties";
pub const KW_PROPERTIES: &str = "properties";

/// Handle to a node in a [`SchemaGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// One step in the path from a document root to a schema fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    pub fn join(path: &[PathSegment]) -> String {
        path.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// Node identity: two nodes built from the same `(file, path)` are the same
/// schema element regardless of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    pub file: String,
    pub path: String,
}

/// The shape of the schema fragment a node was built from.
///
/// Exactly one representation holds per node: a mapping, a sequence, or a
/// scalar literal.
#[derive(Debug)]
pub enum NodeContent {
    Object(Box<ObjectContent>),
    Array(Vec<NodeId>),
    Scalar(Value),
}

/// Children of a mapping fragment.
#[derive(Debug, Default)]
pub struct ObjectContent {
    /// Every keyword that is not handled specially, in schema order.
    pub keywords: IndexMap<String, NodeId>,
    /// `properties` entries, in schema order.
    pub properties: IndexMap<String, NodeId>,
    /// `patternProperties` entries, in schema order.
    pub pattern_properties: IndexMap<String, NodeId>,
    /// `additionalProperties` when it is a schema.
    pub additional_properties: Option<NodeId>,
    /// True iff `additionalProperties` is explicitly `false`.
    pub no_additional_properties: bool,
    /// `examples` values pre-formatted as JSON text.
    pub examples: Vec<String>,
    /// `default` value pre-formatted as JSON text.
    pub default: Option<String>,
}

/// A part of a JSON Schema with metadata added to help rendering.
#[derive(Debug)]
pub struct SchemaNode {
    /// Number of levels from the root of the schema to this node. Used when
    /// the same target is referenced twice to pick the less nested occurrence
    /// as the fully documented one.
    pub(crate) depth: usize,
    /// Canonical source location (absolute local path or URL).
    pub(crate) file: String,
    /// Path from the document root to this fragment.
    pub(crate) path_to_element: Vec<PathSegment>,
    /// Anchor identifier for this node.
    pub(crate) html_id: String,
    pub(crate) breadcrumb_name: String,
    pub(crate) parent: Option<NodeId>,
    /// The key under which this node sits in its parent (property name or
    /// keyword name).
    pub(crate) parent_key: Option<String>,
    /// The raw `$ref` string that produced this node, if any.
    pub(crate) ref_path: Option<String>,
    pub(crate) content: NodeContent,
    /// When the same element is documented elsewhere, the node documenting it.
    pub(crate) links_to: Option<NodeId>,
    /// The node this node's `$ref` resolves to.
    pub(crate) refers_to: Option<NodeId>,
    /// False means: render only a link and description, the full body lives
    /// at `links_to` / `refers_to`.
    pub(crate) is_displayed: bool,
}

impl SchemaNode {
    pub(crate) fn flat_path(&self) -> String {
        PathSegment::join(&self.path_to_element)
    }

    pub(crate) fn identity(&self) -> NodeIdentity {
        NodeIdentity {
            file: self.file.clone(),
            path: self.flat_path(),
        }
    }
}

/// The resolved node graph for one schema document tree.
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
    root: NodeId,
}

impl SchemaGraph {
    pub(crate) fn new(nodes: Vec<SchemaNode>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { graph: self, id }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn get(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.index()]
    }
}

/// Read-only view of one node, carrying the graph for derived lookups.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    graph: &'a SchemaGraph,
    id: NodeId,
}

impl<'a> PartialEq for NodeRef<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.raw().file == other.raw().file
            && self.raw().path_to_element == other.raw().path_to_element
    }
}

impl<'a> NodeRef<'a> {
    fn raw(&self) -> &'a SchemaNode {
        self.graph.get(self.id)
    }

    fn resolve(&self, id: NodeId) -> NodeRef<'a> {
        NodeRef {
            graph: self.graph,
            id,
        }
    }

    fn object(&self) -> Option<&'a ObjectContent> {
        match &self.raw().content {
            NodeContent::Object(content) => Some(content),
            _ => None,
        }
    }

    // ── Plain attributes ────────────────────────────────────────────────

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.raw().depth
    }

    pub fn file(&self) -> &'a str {
        &self.raw().file
    }

    pub fn path_to_element(&self) -> &'a [PathSegment] {
        &self.raw().path_to_element
    }

    pub fn html_id(&self) -> &'a str {
        &self.raw().html_id
    }

    pub fn breadcrumb_name(&self) -> &'a str {
        &self.raw().breadcrumb_name
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.raw().parent.map(|id| self.resolve(id))
    }

    pub fn parent_key(&self) -> Option<&'a str> {
        self.raw().parent_key.as_deref()
    }

    pub fn ref_path(&self) -> Option<&'a str> {
        self.raw().ref_path.as_deref()
    }

    pub fn links_to(&self) -> Option<NodeRef<'a>> {
        self.raw().links_to.map(|id| self.resolve(id))
    }

    pub fn refers_to(&self) -> Option<NodeRef<'a>> {
        self.raw().refers_to.map(|id| self.resolve(id))
    }

    pub fn is_displayed(&self) -> bool {
        self.raw().is_displayed
    }

    pub fn identity(&self) -> NodeIdentity {
        self.raw().identity()
    }

    /// The literal value when the fragment is a scalar.
    pub fn literal(&self) -> Option<&'a Value> {
        match &self.raw().content {
            NodeContent::Scalar(value) => Some(value),
            _ => None,
        }
    }

    // ── Structural children ─────────────────────────────────────────────

    pub fn keywords(&self) -> impl Iterator<Item = (&'a str, NodeRef<'a>)> + '_ {
        self.object()
            .into_iter()
            .flat_map(|content| content.keywords.iter())
            .map(|(name, id)| (name.as_str(), self.resolve(*id)))
    }

    pub fn has_keyword(&self, name: &str) -> bool {
        self.object()
            .is_some_and(|content| content.keywords.contains_key(name))
    }

    /// Look up a keyword child by name.
    pub fn kw(&self, name: &str) -> Option<NodeRef<'a>> {
        self.object()
            .and_then(|content| content.keywords.get(name))
            .map(|id| self.resolve(*id))
    }

    pub fn array_items(&self) -> impl Iterator<Item = NodeRef<'a>> + '_ {
        let items: &[NodeId] = match &self.raw().content {
            NodeContent::Array(items) => items,
            _ => &[],
        };
        items.iter().map(|id| self.resolve(*id))
    }

    pub fn properties(&self) -> impl Iterator<Item = (&'a str, NodeRef<'a>)> + '_ {
        self.object()
            .into_iter()
            .flat_map(|content| content.properties.iter())
            .map(|(name, id)| (name.as_str(), self.resolve(*id)))
    }

    pub fn pattern_properties(&self) -> impl Iterator<Item = (&'a str, NodeRef<'a>)> + '_ {
        self.object()
            .into_iter()
            .flat_map(|content| content.pattern_properties.iter())
            .map(|(name, id)| (name.as_str(), self.resolve(*id)))
    }

    pub fn additional_properties(&self) -> Option<NodeRef<'a>> {
        self.object()
            .and_then(|content| content.additional_properties)
            .map(|id| self.resolve(id))
    }

    pub fn no_additional_properties(&self) -> bool {
        self.object()
            .is_some_and(|content| content.no_additional_properties)
    }

    /// True when `additionalProperties` is set and false, as opposed to not
    /// being set at all.
    pub fn explicit_no_additional_properties(&self) -> bool {
        let Some(content) = self.object() else {
            return false;
        };
        (!content.properties.is_empty() || !content.pattern_properties.is_empty())
            && content.no_additional_properties
            && content.additional_properties.is_none()
    }

    /// Pre-formatted `examples` values.
    pub fn examples(&self) -> &'a [String] {
        self.object()
            .map(|content| content.examples.as_slice())
            .unwrap_or(&[])
    }

    /// This node's own pre-formatted `default` text, without following
    /// references.
    pub fn own_default(&self) -> Option<&'a str> {
        self.object().and_then(|content| content.default.as_deref())
    }

    /// The effective default: the node's own, else the first one found along
    /// the `refers_to` chain (cycle-guarded). Chain candidates sitting in
    /// property position are skipped, so a sibling property's schema is never
    /// mistaken for a default.
    pub fn default_value(&self) -> Option<&'a str> {
        if let Some(default) = self.own_default() {
            return Some(default);
        }
        let mut seen = std::collections::HashSet::new();
        let mut current = *self;
        while let Some(referenced) = current.refers_to() {
            if !seen.insert(current.id) {
                return None;
            }
            if !referenced.is_a_property_node() {
                if let Some(default) = referenced.own_default() {
                    return Some(default);
                }
            }
            current = referenced;
        }
        None
    }

    // ── Names ───────────────────────────────────────────────────────────

    pub fn title(&self) -> Option<&'a str> {
        self.kw("title").and_then(|n| n.literal()).and_then(Value::as_str)
    }

    /// The text to display when this node is the title of a section.
    pub fn definition_name(&self) -> &'a str {
        if self.is_property() {
            if let Some(name) = self.parent_key() {
                return name;
            }
        }
        if let Some(title) = self.title() {
            return title;
        }
        if let Some(ref_path) = self.ref_path() {
            return ref_path.rsplit('/').next().unwrap_or(ref_path);
        }
        ""
    }

    /// The text to display when linking to this node from elsewhere.
    pub fn link_name(&self) -> &'a str {
        let name = self.definition_name();
        if name.is_empty() {
            self.html_id()
        } else {
            name
        }
    }

    pub fn name_for_breadcrumbs(&self) -> &'a str {
        let name = self.definition_name();
        if name.is_empty() {
            self.breadcrumb_name()
        } else {
            name
        }
    }

    pub fn property_name(&self) -> Option<&'a str> {
        self.parent_key()
    }

    /// The name to display in documentation for this property. Pattern
    /// properties prefer their title since the pattern itself is unreadable.
    pub fn property_display_name(&self) -> Option<&'a str> {
        if self.is_pattern_property() {
            return self.title().or_else(|| self.parent_key());
        }
        if self.is_additional_properties() {
            return Some("Additional Properties");
        }
        self.parent_key()
    }

    // ── Position classification ─────────────────────────────────────────

    pub fn is_property(&self) -> bool {
        match (self.parent(), self.parent_key()) {
            (Some(parent), Some(key)) => parent
                .object()
                .is_some_and(|content| content.properties.contains_key(key)),
            _ => false,
        }
    }

    pub fn is_pattern_property(&self) -> bool {
        match (self.parent(), self.parent_key()) {
            (Some(parent), Some(key)) => parent
                .object()
                .is_some_and(|content| content.pattern_properties.contains_key(key)),
            _ => false,
        }
    }

    pub fn is_additional_properties(&self) -> bool {
        self.parent_key() == Some(KW_ADDITIONAL_PROPERTIES)
    }

    pub fn is_a_property_node(&self) -> bool {
        self.is_property() || self.is_pattern_property() || self.is_additional_properties()
    }

    pub fn is_additional_properties_schema(&self) -> bool {
        self.is_additional_properties() && self.literal() != Some(&Value::Bool(true))
    }

    // ── Property iteration and required-ness ────────────────────────────

    /// Effective properties: own, then pattern, then additional.
    pub fn iter_properties(&self) -> impl Iterator<Item = NodeRef<'a>> + '_ {
        self.properties()
            .map(|(_, node)| node)
            .chain(self.pattern_properties().map(|(_, node)| node))
            .chain(self.additional_properties())
    }

    /// The names listed in this node's `required` keyword.
    pub fn required_properties(&self) -> Vec<&'a str> {
        let Some(required) = self.kw("required") else {
            return Vec::new();
        };
        required
            .array_items()
            .filter_map(|item| item.literal().and_then(Value::as_str))
            .collect()
    }

    /// Whether this node is a property required by its parent.
    pub fn is_required_property(&self) -> bool {
        match (self.parent(), self.property_name()) {
            (Some(parent), Some(name)) => parent.required_properties().contains(&name),
            _ => false,
        }
    }

    // ── Paths and breadcrumbs ───────────────────────────────────────────

    /// The chain of nodes from the document root down to this node. Empty
    /// when the node is the root itself.
    pub fn nodes_from_root(&self) -> Vec<NodeRef<'a>> {
        let mut nodes = vec![*self];
        let mut current = *self;
        while let Some(parent) = current.parent() {
            nodes.push(parent);
            current = parent;
        }
        if nodes.len() == 1 {
            return Vec::new();
        }
        nodes.reverse();
        nodes
    }

    /// Human-readable path from the schema root to this node.
    pub fn path_to_property(&self) -> String {
        self.path_to_element()
            .iter()
            .filter(|segment| {
                !matches!(segment, PathSegment::Key(key)
                    if key == KW_PROPERTIES || key == KW_PATTERN_PROPERTIES)
            })
            .map(|segment| match segment {
                PathSegment::Key(key) => key.clone(),
                PathSegment::Index(index) => format!("Item {}", index),
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn flat_path(&self) -> String {
        self.raw().flat_path()
    }

    // ── References ──────────────────────────────────────────────────────

    /// The referenced node's keywords overlaid with this node's own, so an
    /// "extended" schema (a `$ref` plus extra keywords) displays merged.
    pub fn merged_keywords(&self) -> IndexMap<&'a str, NodeRef<'a>> {
        let mut merged: IndexMap<&'a str, NodeRef<'a>> = IndexMap::new();
        if let Some(referenced) = self.refers_to() {
            for (name, node) in referenced.keywords() {
                merged.insert(name, node);
            }
        }
        for (name, node) in self.keywords() {
            merged.insert(name, node);
        }
        merged
    }

    /// Whether `candidate` is this node or a structural ancestor of it
    /// (same file, path prefix match).
    pub fn node_is_parent(&self, candidate: NodeRef<'a>) -> bool {
        if self.raw().file != candidate.raw().file {
            return false;
        }
        let own_path = self.path_to_element();
        let candidate_path = candidate.path_to_element();
        if candidate_path.len() > own_path.len() {
            return false;
        }
        own_path
            .iter()
            .zip(candidate_path.iter())
            .all(|(a, b)| a == b)
    }

    /// Whether this node should render as a link to another section instead
    /// of a full body, under the given configuration.
    pub fn should_be_a_link(
        &self,
        config: &GenerationConfig,
        detector: &mut CircularRefDetector<'a>,
    ) -> bool {
        if self.links_to().is_none() || self.is_displayed() {
            return false;
        }
        if config.link_to_reused_ref {
            return true;
        }
        detector.is_circular(self.id)
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("file", &self.file())
            .field("path", &self.flat_path())
            .finish()
    }
}
