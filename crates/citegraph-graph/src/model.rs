use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use citegraph_core::Author;

use crate::attributes::Category;
use crate::config::Layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A source paper whose references were extracted.
    Main,
    /// A referenced work.
    Citation,
}

/// A node with every attribute the renderer consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Main nodes: number of input citations attributed to this paper.
    /// Citation nodes: the citation count reported by metadata, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_count: Option<u64>,
    pub color: String,
    pub size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub influence_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_degree_centrality: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_degree_centrality: Option<f64>,
    /// Hierarchical layout tier: 0 for main, 1 for citations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// Circular layout bucket: `main`, a decade such as `2010s`, or `unknown`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl GraphNode {
    pub fn is_main(&self) -> bool {
        self.kind == NodeKind::Main
    }
}

/// A `cites` edge from a main paper to a referenced work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitesEdge {
    pub citation_type: &'static str,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_paper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

impl Default for CitesEdge {
    fn default() -> Self {
        Self {
            citation_type: "direct",
            confidence: 1.0,
            source_paper: None,
            context: None,
            page_number: None,
        }
    }
}

/// The built citation graph: main and citation nodes joined by `cites`
/// edges. Built from scratch by [`GraphBuilder`](crate::GraphBuilder) and not
/// mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct CitationGraph {
    pub(crate) graph: DiGraph<GraphNode, CitesEdge>,
    pub(crate) by_id: HashMap<String, NodeIndex>,
    pub(crate) layout: Layout,
}

impl CitationGraph {
    pub(crate) fn new(layout: Layout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }

    pub(crate) fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.by_id.insert(id, idx);
        idx
    }

    /// Add `from -> to` unless the edge already exists. Returns whether an
    /// edge was added.
    pub(crate) fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: CitesEdge) -> bool {
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, edge);
        true
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.by_id.get(id).map(|&idx| &self.graph[idx])
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    /// Edges in insertion order as `(source id, target id, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &CitesEdge)> {
        self.graph.edge_indices().filter_map(move |e| {
            let (from, to) = self.graph.edge_endpoints(e)?;
            Some((
                self.graph[from].id.as_str(),
                self.graph[to].id.as_str(),
                &self.graph[e],
            ))
        })
    }

    pub fn main_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes().filter(|n| n.is_main())
    }

    pub fn citation_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes().filter(|n| !n.is_main())
    }

    pub fn in_degree(&self, id: &str) -> Option<usize> {
        let idx = *self.by_id.get(id)?;
        Some(self.graph.neighbors_directed(idx, Direction::Incoming).count())
    }

    pub fn out_degree(&self, id: &str) -> Option<usize> {
        let idx = *self.by_id.get(id)?;
        Some(self.graph.neighbors_directed(idx, Direction::Outgoing).count())
    }

    /// Ids of the papers citing `id`.
    pub fn cited_by(&self, id: &str) -> Vec<&str> {
        let Some(&idx) = self.by_id.get(id) else {
            return Vec::new();
        };
        let mut sources: Vec<&str> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].id.as_str())
            .collect();
        sources.sort_unstable();
        sources
    }

    /// The underlying petgraph graph, for callers running their own
    /// algorithms.
    pub fn inner(&self) -> &DiGraph<GraphNode, CitesEdge> {
        &self.graph
    }
}
