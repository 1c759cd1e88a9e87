//! Store-native graph elements and the fragments strategies harvest.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Property map in store order.
pub type Properties = Map<String, Value>;

/// A node as the store returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Store identity (element id or numeric id rendered as text).
    pub id: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: Properties,
}

impl RawNode {
    pub fn new(id: impl Into<String>, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id: id.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A relationship as the store returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    pub id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub properties: Properties,
}

impl RawEdge {
    pub fn new(
        id: impl Into<String>,
        start: impl Into<String>,
        rel_type: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            rel_type: rel_type.into(),
            start: start.into(),
            end: end.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    fn signature(&self) -> (String, String, String) {
        (self.start.clone(), self.rel_type.clone(), self.end.clone())
    }
}

/// Nodes and relationships harvested by one retrieval strategy.
///
/// Nodes are unique by store identity; relationships by
/// `(start, type, end)`. Insertion order is first-seen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFragment {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
    #[serde(skip)]
    seen_nodes: HashSet<String>,
    #[serde(skip)]
    seen_edges: HashSet<(String, String, String)>,
}

impl GraphFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Returns `false` when a node with the same identity is already present.
    pub fn add_node(&mut self, node: RawNode) -> bool {
        if self.nodes.len() != self.seen_nodes.len() {
            self.reindex();
        }
        if !self.seen_nodes.insert(node.id.clone()) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    /// Returns `false` when the same `(start, type, end)` is already present.
    pub fn add_edge(&mut self, edge: RawEdge) -> bool {
        if self.edges.len() != self.seen_edges.len() {
            self.reindex();
        }
        if !self.seen_edges.insert(edge.signature()) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    /// Append everything from `other` not already present.
    pub fn absorb(&mut self, other: GraphFragment) {
        for node in other.nodes {
            self.add_node(node);
        }
        for edge in other.edges {
            self.add_edge(edge);
        }
    }

    /// Concatenate fragments in order, deduplicating as it goes.
    pub fn concat(fragments: impl IntoIterator<Item = GraphFragment>) -> Self {
        let mut out = Self::new();
        for fragment in fragments {
            out.absorb(fragment);
        }
        out
    }

    pub fn node(&self, id: &str) -> Option<&RawNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    // `nodes`/`edges` are public, so the lookup sets can fall behind after a
    // deserialize or a direct push.
    fn reindex(&mut self) {
        let mut nodes = std::mem::take(&mut self.nodes);
        let mut edges = std::mem::take(&mut self.edges);
        self.seen_nodes.clear();
        self.seen_edges.clear();
        nodes.retain(|n| self.seen_nodes.insert(n.id.clone()));
        edges.retain(|e| self.seen_edges.insert(e.signature()));
        self.nodes = nodes;
        self.edges = edges;
    }
}

impl PartialEq for GraphFragment {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

/// Render a scalar property for use in keys and labels.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fragment_dedupes_nodes_and_edges() {
        let mut f = GraphFragment::new();
        assert!(f.add_node(RawNode::new("1", ["Player"])));
        assert!(!f.add_node(RawNode::new("1", ["Player"]).with_property("x", 1)));
        assert!(f.add_node(RawNode::new("2", ["Fixture"])));

        assert!(f.add_edge(RawEdge::new("r1", "1", "PLAYED_IN", "2")));
        // different relationship id, same signature
        assert!(!f.add_edge(RawEdge::new("r9", "1", "PLAYED_IN", "2")));
        assert!(f.add_edge(RawEdge::new("r2", "2", "HAS_HOME_TEAM", "1")));

        assert_eq!(f.nodes.len(), 2);
        assert_eq!(f.edges.len(), 2);
        assert!(f.nodes[0].properties.is_empty());
    }

    #[test]
    fn deserialized_fragment_still_dedupes() {
        let mut f: GraphFragment = serde_json::from_value(json!({
            "nodes": [{"id": "1", "labels": ["Team"], "properties": {"name": "Arsenal"}}],
            "edges": []
        }))
        .unwrap();
        assert!(!f.add_node(RawNode::new("1", ["Team"])));
        assert_eq!(f.nodes.len(), 1);
    }

    #[test]
    fn concat_keeps_first_seen_order() {
        let mut a = GraphFragment::new();
        a.add_node(RawNode::new("b", ["Team"]));
        let mut b = GraphFragment::new();
        b.add_node(RawNode::new("a", ["Team"]));
        b.add_node(RawNode::new("b", ["Team"]));
        let c = GraphFragment::concat([a, b]);
        let ids: Vec<_> = c.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn scalar_text_renders_numbers_and_rejects_lists() {
        assert_eq!(scalar_text(&json!(7)).as_deref(), Some("7"));
        assert_eq!(scalar_text(&json!("2022-23")).as_deref(), Some("2022-23"));
        assert_eq!(scalar_text(&json!([1, 2])), None);
    }
}
