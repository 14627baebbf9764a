//! Circular reference detection.
//!
//! A node is circular when following its `links_to`, keyword children and
//! array items leads back to the node itself or to one of its structural
//! parents. The search is breadth-first and bounded: going past
//! `recursive_detection_depth` frontier expansions without a match counts as
//! non-circular. That bound is a deliberate approximation, not a proof of
//! acyclicity.
//!
//! Detection only ever changes rendering behavior (link instead of infinite
//! expansion); it is never an error.

use std::collections::{HashMap, HashSet};

use crate::config::GenerationConfig;
use crate::node::{NodeContent, NodeId, SchemaGraph};

/// Memoized circular-reference checks over one graph.
///
/// The memo is scoped to this detector, so independent generation runs (which
/// can reuse `(file, path)` identities) never contaminate each other.
pub struct CircularRefDetector<'a> {
    graph: &'a SchemaGraph,
    memo: HashMap<NodeId, bool>,
    max_depth: usize,
}

impl<'a> CircularRefDetector<'a> {
    pub fn new(graph: &'a SchemaGraph, config: &GenerationConfig) -> Self {
        Self {
            graph,
            memo: HashMap::new(),
            max_depth: config.recursive_detection_depth,
        }
    }

    pub fn is_circular(&mut self, id: NodeId) -> bool {
        if let Some(&cached) = self.memo.get(&id) {
            return cached;
        }
        let result = self.search(id);
        self.memo.insert(id, result);
        result
    }

    fn search(&self, id: NodeId) -> bool {
        let node = self.graph.node(id);
        let Some(start) = node.links_to() else {
            return false;
        };

        let mut to_check: HashSet<NodeId> = HashSet::from([start.id()]);
        let mut iteration_count = 0;

        while !to_check.is_empty() && iteration_count < self.max_depth {
            for &candidate_id in &to_check {
                let candidate = self.graph.node(candidate_id);
                // Matching a parent path is enough: expanding the parent
                // would re-expand this node.
                if candidate_id == id || node.node_is_parent(candidate) {
                    return true;
                }
            }

            let mut next: HashSet<NodeId> = HashSet::new();
            for &candidate_id in &to_check {
                let raw = self.graph.get(candidate_id);
                if let Some(linked) = raw.links_to {
                    next.insert(linked);
                }
                match &raw.content {
                    NodeContent::Object(content) => {
                        next.extend(content.keywords.values().copied());
                    }
                    NodeContent::Array(items) => {
                        next.extend(items.iter().copied());
                    }
                    NodeContent::Scalar(_) => {}
                }
            }
            to_check = next;
            iteration_count += 1;
        }

        false
    }
}
