use petgraph::Direction;

use crate::config::Layout;
use crate::model::CitationGraph;

/// Attach in- and out-degree centrality (`degree / (n - 1)`) to every node.
///
/// Centrality is undefined for fewer than two nodes; the attributes are then
/// left absent.
pub fn apply_degree_centrality(graph: &mut CitationGraph) {
    let n = graph.graph.node_count();
    if n < 2 {
        tracing::debug!(nodes = n, "skipping degree centrality");
        return;
    }
    let scale = 1.0 / (n - 1) as f64;

    for idx in graph.graph.node_indices() {
        let indeg = graph.graph.neighbors_directed(idx, Direction::Incoming).count();
        let outdeg = graph.graph.neighbors_directed(idx, Direction::Outgoing).count();
        let node = &mut graph.graph[idx];
        node.in_degree_centrality = Some(indeg as f64 * scale);
        node.out_degree_centrality = Some(outdeg as f64 * scale);
    }
}

/// Decade bucket for circular layouts (`"1990s"`), `"unknown"` without a year.
pub fn decade_group(year: Option<i32>) -> String {
    match year {
        Some(y) => format!("{}s", y.div_euclid(10) * 10),
        None => "unknown".to_string(),
    }
}

/// Tag nodes for the configured layout. Hierarchical layouts get a two-tier
/// `level`; circular layouts get a `group`; force layouts need nothing.
pub fn apply_layout_tags(graph: &mut CitationGraph) {
    let layout = graph.layout;
    for node in graph.graph.node_weights_mut() {
        match layout {
            Layout::Force => {}
            Layout::Hierarchical => node.level = Some(if node.is_main() { 0 } else { 1 }),
            Layout::Circular => {
                node.group = Some(if node.is_main() {
                    "main".to_string()
                } else {
                    decade_group(node.year)
                });
            }
        }
    }
}
