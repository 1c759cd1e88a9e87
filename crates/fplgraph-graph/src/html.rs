//! Standalone HTML view of a projected graph (vis-network, loaded from a CDN).

use crate::projector::VisGraph;

pub const DEFAULT_HEIGHT_PX: u32 = 600;

pub fn render_html(graph: &VisGraph, title: &str) -> Result<String, serde_json::Error> {
    render_html_with_height(graph, title, DEFAULT_HEIGHT_PX)
}

pub fn render_html_with_height(
    graph: &VisGraph,
    title: &str,
    height_px: u32,
) -> Result<String, serde_json::Error> {
    // `</` inside attribute payloads must not close the script tag.
    let json = serde_json::to_string(graph)?.replace("</", "<\\/");

    let template = include_str!("../templates/graph_view.html");
    Ok(template
        .replace("{{TITLE}}", &escape_text(title))
        .replace("{{HEIGHT}}", &height_px.to_string())
        .replace("{{NODES_COUNT}}", &graph.nodes.len().to_string())
        .replace("{{EDGES_COUNT}}", &graph.edges.len().to_string())
        .replace("{{GRAPH_JSON}}", &json))
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
