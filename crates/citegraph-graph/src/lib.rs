//! Citation graph assembly.
//!
//! [`GraphBuilder`] turns source papers and their (possibly enriched)
//! citations into a directed [`CitationGraph`] whose nodes carry presentation
//! attributes. The graph is rebuilt from scratch on every call and exported
//! as node-link JSON for a renderer.

pub mod attributes;
pub mod builder;
pub mod config;
pub mod export;
pub mod metrics;
pub mod model;
pub mod stats;

pub use attributes::{Category, DEFAULT_HIGH_IMPACT_VENUES};
pub use builder::{GraphBuilder, source_matches};
pub use config::{GraphConfig, Layout};
pub use export::NodeLink;
pub use model::{CitationGraph, CitesEdge, GraphNode, NodeKind};
pub use stats::{CitedNode, GraphStatistics, YearRange};

use citegraph_core::{Citation, MainPaper};

/// Build a graph with the default configuration.
pub fn build_graph(papers: &[MainPaper], citations: Vec<Citation>) -> CitationGraph {
    GraphBuilder::default().build(papers, citations)
}
