//! Node-link JSON for the rendering side.
//!
//! The shape follows the common node-link convention (`directed`, `nodes`,
//! `links` with `source`/`target` ids) so graph viewers can load it directly.

use serde::Serialize;

use crate::config::Layout;
use crate::model::{CitationGraph, CitesEdge, GraphNode};
use crate::stats::GraphStatistics;

#[derive(Debug, Clone, Serialize)]
pub struct GraphMeta {
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize)]
pub struct Link<'a> {
    pub source: &'a str,
    pub target: &'a str,
    #[serde(flatten)]
    pub edge: &'a CitesEdge,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeLink<'a> {
    pub directed: bool,
    pub multigraph: bool,
    pub graph: GraphMeta,
    pub nodes: Vec<&'a GraphNode>,
    pub links: Vec<Link<'a>>,
    pub statistics: GraphStatistics,
}

impl CitationGraph {
    /// Borrowing node-link view of the graph, statistics included.
    pub fn to_node_link(&self) -> NodeLink<'_> {
        NodeLink {
            directed: true,
            multigraph: false,
            graph: GraphMeta {
                layout: self.layout,
            },
            nodes: self.nodes().collect(),
            links: self
                .edges()
                .map(|(source, target, edge)| Link {
                    source,
                    target,
                    edge,
                })
                .collect(),
            statistics: self.statistics(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self.to_node_link())
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_node_link())
    }
}
