//! Cross-strategy graph canonicalization.
//!
//! Template queries and nearest-neighbour search both return topology, but
//! they reach the same real-world entity through different rows. This module
//! folds their fragments into one display graph:
//!
//! ```text
//!   authoritative (template fragments, intent order)     secondary (vector)
//!          │                                                  │
//!          ▼                                                  ▼
//!   seed canonical set ──── merge key / raw id ────► fold or insert
//!          │                                                  │
//!          └──────────────► identity map (raw → canonical) ◄──┘
//!                                     │
//!                                     ▼
//!                    remap edges, drop dangling, dedupe (from, type, to)
//! ```
//!
//! Authoritative values always win; secondary nodes only contribute
//! attributes the canonical node lacks. Nodes keep first-seen order and
//! edges follow their endpoints' node order.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::model::{scalar_text, GraphFragment, Properties, RawEdge, RawNode};

// ============================================================================
// Canonical graph
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalNode {
    pub id: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub attributes: Properties,
}

impl CanonicalNode {
    /// Explicit type: the first store label.
    pub fn node_type(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub attributes: Properties,
}

/// Deduplicated, merge-resolved graph. Every edge endpoint is a node id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalGraph {
    pub nodes: Vec<CanonicalNode>,
    pub edges: Vec<CanonicalEdge>,
}

impl CanonicalGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&CanonicalNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// View this graph as a fragment whose raw ids are the canonical ids, so
    /// it can be merged again.
    pub fn to_fragment(&self) -> GraphFragment {
        let mut fragment = GraphFragment::new();
        for node in &self.nodes {
            fragment.add_node(RawNode {
                id: node.id.clone(),
                labels: node.labels.clone(),
                properties: node.attributes.clone(),
            });
        }
        for edge in &self.edges {
            fragment.add_edge(RawEdge {
                id: format!("{}-{}-{}", edge.from, edge.rel_type, edge.to),
                rel_type: edge.rel_type.clone(),
                start: edge.from.clone(),
                end: edge.to.clone(),
                properties: edge.attributes.clone(),
            });
        }
        fragment
    }
}

// ============================================================================
// Merge keys
// ============================================================================

/// Derives a strategy-independent identity for a node.
///
/// `None` means "no key": the node is identified by its raw id only.
pub trait MergeKeyPolicy: Send + Sync {
    fn merge_key(&self, labels: &[String], properties: &Properties) -> Option<String>;
}

/// Keys from the graph's uniqueness constraints.
///
/// | label    | key                                  |
/// |----------|--------------------------------------|
/// | Player   | `Player::<player_element>`           |
/// | Team     | `Team::<name>`                       |
/// | Position | `Position::<name>`                   |
/// | Season   | `Season::<season_name>`              |
/// | Gameweek | `Gameweek::<season>/<GW_number>`     |
/// | Fixture  | `Fixture::<season>/<fixture_number>` |
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalKeyPolicy;

const NATURAL_KEYS: &[(&str, &[&str])] = &[
    ("Player", &["player_element"]),
    ("Team", &["name"]),
    ("Position", &["name"]),
    ("Season", &["season_name"]),
    ("Gameweek", &["season", "GW_number"]),
    ("Fixture", &["season", "fixture_number"]),
];

impl MergeKeyPolicy for NaturalKeyPolicy {
    fn merge_key(&self, labels: &[String], properties: &Properties) -> Option<String> {
        labels.iter().find_map(|label| {
            let (_, fields) = NATURAL_KEYS.iter().find(|(l, _)| *l == label.as_str())?;
            let parts = fields
                .iter()
                .map(|f| properties.get(*f).and_then(scalar_text))
                .collect::<Option<Vec<_>>>()?;
            Some(format!("{label}::{}", parts.join("/")))
        })
    }
}

// ============================================================================
// Canonicalizer
// ============================================================================

/// Folds fragments from several strategies into one [`CanonicalGraph`].
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer<P = NaturalKeyPolicy> {
    policy: P,
}

impl Canonicalizer<NaturalKeyPolicy> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: MergeKeyPolicy> Canonicalizer<P> {
    pub fn with_policy(policy: P) -> Self {
        Self { policy }
    }

    /// Merge one authoritative fragment with one secondary fragment.
    pub fn merge(&self, authoritative: &GraphFragment, secondary: &GraphFragment) -> CanonicalGraph {
        let mut round = MergeRound::new(&self.policy);

        for node in &authoritative.nodes {
            round.seed(node);
        }
        for node in &secondary.nodes {
            round.fold(node);
        }
        for edge in authoritative.edges.iter().chain(&secondary.edges) {
            round.connect(edge);
        }

        let graph = round.finish();
        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "canonical graph merged"
        );
        graph
    }

    /// Merge several authoritative fragments (concatenated in order) with an
    /// optional secondary fragment.
    pub fn merge_all<'a>(
        &self,
        authoritative: impl IntoIterator<Item = &'a GraphFragment>,
        secondary: Option<&GraphFragment>,
    ) -> CanonicalGraph {
        let combined = GraphFragment::concat(authoritative.into_iter().cloned());
        let empty = GraphFragment::new();
        self.merge(&combined, secondary.unwrap_or(&empty))
    }
}

/// State for one merge; the identity map never outlives it.
struct MergeRound<'p, P> {
    policy: &'p P,
    nodes: Vec<CanonicalNode>,
    by_id: HashMap<String, usize>,
    by_key: HashMap<String, usize>,
    identity: HashMap<String, usize>,
    edges: Vec<CanonicalEdge>,
    edge_seen: HashSet<(String, String, String)>,
}

impl<'p, P: MergeKeyPolicy> MergeRound<'p, P> {
    fn new(policy: &'p P) -> Self {
        Self {
            policy,
            nodes: Vec::new(),
            by_id: HashMap::new(),
            by_key: HashMap::new(),
            identity: HashMap::new(),
            edges: Vec::new(),
            edge_seen: HashSet::new(),
        }
    }

    /// Authoritative node: canonical id is its merge key when it has one.
    fn seed(&mut self, node: &RawNode) {
        let key = self.policy.merge_key(&node.labels, &node.properties);
        if let Some(idx) = self.existing(node, key.as_deref()) {
            self.absorb(idx, node, key);
            return;
        }
        let id = key.clone().unwrap_or_else(|| node.id.clone());
        self.insert(id, node, key);
    }

    /// Secondary node: folds into a matching canonical node, else enters
    /// under its own raw id.
    fn fold(&mut self, node: &RawNode) {
        let key = self.policy.merge_key(&node.labels, &node.properties);
        if let Some(idx) = self.existing(node, key.as_deref()) {
            self.absorb(idx, node, key);
            return;
        }
        self.insert(node.id.clone(), node, key);
    }

    fn existing(&self, node: &RawNode, key: Option<&str>) -> Option<usize> {
        key.and_then(|k| self.by_key.get(k))
            .or_else(|| self.identity.get(&node.id))
            .or_else(|| self.by_id.get(&node.id))
            .copied()
    }

    fn insert(&mut self, id: String, node: &RawNode, key: Option<String>) {
        let idx = self.nodes.len();
        self.nodes.push(CanonicalNode {
            id: id.clone(),
            labels: node.labels.clone(),
            attributes: node.properties.clone(),
        });
        self.by_id.insert(id, idx);
        if let Some(key) = key {
            self.by_key.entry(key).or_insert(idx);
        }
        self.identity.insert(node.id.clone(), idx);
    }

    fn absorb(&mut self, idx: usize, node: &RawNode, key: Option<String>) {
        let target = &mut self.nodes[idx];
        for label in &node.labels {
            if !target.labels.contains(label) {
                target.labels.push(label.clone());
            }
        }
        for (k, v) in &node.properties {
            if !target.attributes.contains_key(k) {
                target.attributes.insert(k.clone(), v.clone());
            }
        }
        if let Some(key) = key {
            self.by_key.entry(key).or_insert(idx);
        }
        self.identity.entry(node.id.clone()).or_insert(idx);
    }

    fn connect(&mut self, edge: &RawEdge) {
        let (Some(&from), Some(&to)) = (self.identity.get(&edge.start), self.identity.get(&edge.end)) else {
            return;
        };
        let from = self.nodes[from].id.clone();
        let to = self.nodes[to].id.clone();
        if !self
            .edge_seen
            .insert((from.clone(), edge.rel_type.clone(), to.clone()))
        {
            return;
        }
        self.edges.push(CanonicalEdge {
            from,
            to,
            rel_type: edge.rel_type.clone(),
            attributes: edge.properties.clone(),
        });
    }

    /// Edges come out grouped by endpoint position in node order, so the
    /// result does not depend on which fragment contributed an edge first.
    fn finish(mut self) -> CanonicalGraph {
        let by_id = &self.by_id;
        let pos = |id: &str| by_id.get(id).copied().unwrap_or(usize::MAX);
        self.edges.sort_by(|a, b| {
            (pos(&a.from), pos(&a.to), &a.rel_type).cmp(&(pos(&b.from), pos(&b.to), &b.rel_type))
        });
        CanonicalGraph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}
