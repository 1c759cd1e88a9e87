//! Canonical graph → presentation objects.
//!
//! The projection is renderer-agnostic: [`VisNode`]/[`VisEdge`] serialize to
//! the shape vis-network expects, but nothing here depends on a renderer.
//! Detail payloads never carry embeddings, vectors or raw identifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{CanonicalEdge, CanonicalGraph, CanonicalNode};
use crate::model::{scalar_text, Properties};

pub const NODE_FONT_SIZE: u32 = 14;
pub const EDGE_FONT_SIZE: u32 = 12;

/// Attribute names tried, in order, for a node's display label.
const LABEL_KEYS: &[&str] = &[
    "name",
    "player_name",
    "team_name",
    "position_name",
    "season_name",
    "title",
];

/// Never shown in a detail payload.
pub const HIDDEN_KEYS: &[&str] = &[
    "embedding",
    "embeddings",
    "embedding_node2vec",
    "embedding_fastrp",
    "vector",
    "id",
    "element_id",
];

/// Identifier-like attributes skipped when falling back to "first attribute".
const IDENTIFIER_KEYS: &[&str] = &["elementId", "player_element", "source_node_id", "labels"];

const DEFAULT_TYPE: &str = "default";

fn node_color(node_type: &str) -> &'static str {
    match node_type {
        "Player" => "#3498db",
        "Team" => "#e74c3c",
        "Fixture" => "#f39c12",
        "Gameweek" => "#9b59b6",
        "Position" => "#1abc9c",
        "Season" => "#34495e",
        "Stat" => "#27ae60",
        _ => "#95a5a6",
    }
}

fn edge_color(rel_type: &str) -> &'static str {
    match rel_type {
        "PLAYS_FOR" => "#e74c3c",
        "HAS_POSITION" | "PLAYS_AS" => "#1abc9c",
        "PLAYED_IN" => "#f39c12",
        "IN_SEASON" => "#34495e",
        "HAS_STATS" => "#27ae60",
        _ => "#7f8c8d",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisFont {
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisNode {
    pub id: String,
    pub label: String,
    /// Node type, used by renderers for grouping.
    pub group: String,
    pub color: String,
    /// Pretty-printed detail payload.
    pub title: String,
    pub font: VisFont,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisEdge {
    pub from: String,
    pub to: String,
    pub label: String,
    pub color: String,
    pub title: String,
    pub arrows: String,
    pub font: VisFont,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisGraph {
    pub nodes: Vec<VisNode>,
    pub edges: Vec<VisEdge>,
}

impl VisGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Project every node and edge of `graph`.
pub fn project(graph: &CanonicalGraph) -> VisGraph {
    VisGraph {
        nodes: graph.nodes.iter().map(project_node).collect(),
        edges: graph.edges.iter().map(project_edge).collect(),
    }
}

pub fn project_node(node: &CanonicalNode) -> VisNode {
    let node_type = node_type(node);
    VisNode {
        id: node.id.clone(),
        label: node_label(&node.attributes),
        color: node_color(&node_type).to_string(),
        group: node_type,
        title: detail_payload(&node.attributes),
        font: VisFont {
            size: NODE_FONT_SIZE,
        },
    }
}

pub fn project_edge(edge: &CanonicalEdge) -> VisEdge {
    VisEdge {
        from: edge.from.clone(),
        to: edge.to.clone(),
        label: edge.rel_type.clone(),
        color: edge_color(&edge.rel_type).to_string(),
        title: detail_payload(&edge.attributes),
        arrows: "to".to_string(),
        font: VisFont {
            size: EDGE_FONT_SIZE,
        },
    }
}

/// First present label attribute, else the first non-identifier attribute,
/// else `Unknown`.
pub fn node_label(attributes: &Properties) -> String {
    LABEL_KEYS
        .iter()
        .find_map(|k| attributes.get(*k).and_then(display_text))
        .or_else(|| {
            attributes
                .iter()
                .filter(|(k, _)| !is_hidden(k) && !IDENTIFIER_KEYS.contains(&k.as_str()))
                .find_map(|(_, v)| display_text(v))
        })
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Explicit type (first label, or a `labels` attribute), else inferred from
/// attribute names, else `default`.
pub fn node_type(node: &CanonicalNode) -> String {
    if let Some(t) = node.node_type() {
        return t.to_string();
    }
    match node.attributes.get("labels") {
        Some(Value::Array(labels)) => {
            if let Some(first) = labels.first().and_then(Value::as_str) {
                return first.to_string();
            }
        }
        Some(Value::String(label)) if !label.is_empty() => return label.clone(),
        _ => {}
    }
    infer_type(&node.attributes).to_string()
}

fn infer_type(attributes: &Properties) -> &'static str {
    let has = |k: &str| attributes.contains_key(k);
    if has("player_name") {
        "Player"
    } else if has("team_name") {
        "Team"
    } else if has("GW_number") || has("gameweek") {
        "Gameweek"
    } else if has("fixture_number") || has("kickoff_time") {
        "Fixture"
    } else if has("season_name") {
        "Season"
    } else {
        DEFAULT_TYPE
    }
}

/// Pretty JSON of the attributes with deny-listed keys removed.
pub fn detail_payload(attributes: &Properties) -> String {
    let visible: Properties = attributes
        .iter()
        .filter(|(k, _)| !is_hidden(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::to_string_pretty(&Value::Object(visible)).unwrap_or_default()
}

fn is_hidden(key: &str) -> bool {
    HIDDEN_KEYS.contains(&key)
}

fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => scalar_text(other),
    }
}
