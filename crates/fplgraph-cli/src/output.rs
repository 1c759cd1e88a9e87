//! Terminal rendering for `ask` and friends.

use colored::Colorize;
use serde_json::Value;

use fplgraph_cypher::Param;
use fplgraph_retrieval::PipelineOutcome;

pub fn param_list(params: &[Param]) -> String {
    if params.is_empty() {
        return "-".to_string();
    }
    params.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
}

/// Compact one-line rendering of a row value.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.2}"),
            _ => n.to_string(),
        },
        Value::Array(items) => items.iter().map(format_value).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

pub fn print_outcome(outcome: &PipelineOutcome) {
    let entities = serde_json::to_string(&outcome.entities).unwrap_or_default();
    println!("{} {}", "entities:".dimmed(), entities);
    println!("{} {}", "mode:".dimmed(), outcome.mode);

    if outcome.results.is_empty() && outcome.vector.is_none() {
        println!("{}", "no data for this question".yellow());
    }

    for result in &outcome.results {
        println!();
        println!("{} {}", "▶".green(), result.intent.bold());
        if result.rows.is_empty() {
            println!("  {}", "(no rows)".dimmed());
        }
        for row in &result.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|(k, v)| format!("{}={}", k.dimmed(), format_value(v)))
                .collect();
            println!("  {}", cells.join("  "));
        }
    }

    for failed in &outcome.failed {
        println!(
            "{} {}: {}",
            "✗".yellow(),
            failed.intent,
            failed.error.as_deref().unwrap_or("failed")
        );
    }

    if let Some(vector) = &outcome.vector {
        println!();
        println!("{} {} ({})", "▶".green(), "vector search".bold(), vector.model);
        println!("  {} {}", "query:".dimmed(), vector.query_text);
        for hit in &vector.hits {
            println!("  #{:<6} distance {:.4}", hit.embedding_node_id, hit.distance);
        }
        for source in &vector.sources {
            let text = source.get("text").map(format_value).unwrap_or_default();
            println!("  {}", text);
        }
    }

    println!();
    println!(
        "{} {} nodes, {} edges",
        "graph:".dimmed(),
        outcome.graph.nodes.len(),
        outcome.graph.edges.len()
    );
}
