use petgraph::Direction;
use petgraph::algo::connected_components;
use petgraph::graph::NodeIndex;
use serde::Serialize;

use crate::model::CitationGraph;

/// How many citation nodes [`GraphStatistics::top_cited`] lists.
pub const TOP_CITED: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitedNode {
    pub id: String,
    pub label: String,
    pub in_degree: usize,
}

/// Graph-level summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub main_nodes: usize,
    pub citation_nodes: usize,
    /// `E / (N * (N - 1))`; zero for fewer than two nodes.
    pub density: f64,
    /// Connected when edge direction is ignored. An empty graph is not.
    pub is_weakly_connected: bool,
    /// Range of publication years over all nodes that have one.
    pub year_range: Option<YearRange>,
    pub nodes_with_year: usize,
    /// Citation nodes with the most inbound edges, ties broken by id.
    pub top_cited: Vec<CitedNode>,
}

impl CitationGraph {
    pub fn statistics(&self) -> GraphStatistics {
        let g = &self.graph;
        let n = g.node_count();
        let e = g.edge_count();

        let density = if n < 2 {
            0.0
        } else {
            e as f64 / (n * (n - 1)) as f64
        };

        let years: Vec<i32> = g.node_weights().filter_map(|node| node.year).collect();
        let year_range = match (years.iter().min(), years.iter().max()) {
            (Some(&min), Some(&max)) => Some(YearRange { min, max }),
            _ => None,
        };

        // Ties fall back to creation order, so citation_2 precedes citation_10.
        let mut cited: Vec<(usize, NodeIndex)> = g
            .node_indices()
            .filter(|&idx| !g[idx].is_main())
            .map(|idx| (g.neighbors_directed(idx, Direction::Incoming).count(), idx))
            .collect();
        cited.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        let top_cited: Vec<CitedNode> = cited
            .into_iter()
            .take(TOP_CITED)
            .map(|(in_degree, idx)| CitedNode {
                id: g[idx].id.clone(),
                label: g[idx].label.clone(),
                in_degree,
            })
            .collect();

        let main_nodes = self.main_nodes().count();

        GraphStatistics {
            node_count: n,
            edge_count: e,
            main_nodes,
            citation_nodes: n - main_nodes,
            density,
            is_weakly_connected: n > 0 && connected_components(g) == 1,
            year_range,
            nodes_with_year: years.len(),
            top_cited,
        }
    }
}
