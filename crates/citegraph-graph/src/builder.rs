use std::collections::HashMap;

use petgraph::graph::NodeIndex;

use citegraph_core::{Citation, CitationKey, Deduplicator, MainPaper};

use crate::attributes::{
    MAIN_NODE_COLOR, MAIN_NODE_SIZE, categorize, influence_score, node_size, truncate_label,
};
use crate::config::GraphConfig;
use crate::metrics::{apply_degree_centrality, apply_layout_tags};
use crate::model::{CitationGraph, CitesEdge, GraphNode, NodeKind};

/// Builds a [`CitationGraph`] from source papers and their citations.
///
/// Building is deterministic: node ids are positional (`main_0`,
/// `citation_0`, ...). Citation nodes are numbered paper by paper, in input
/// order within each paper.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    config: GraphConfig,
    deduplicator: Deduplicator,
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            deduplicator: Deduplicator::default(),
        }
    }

    pub fn with_deduplicator(mut self, deduplicator: Deduplicator) -> Self {
        self.deduplicator = deduplicator;
        self
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Build the graph.
    ///
    /// Citations are attached to the main paper whose title equals their
    /// `source_paper`, else the first whose title matches it loosely (main
    /// paper 0 when none does), and deduplicated
    /// within each paper. A citation whose [`CitationKey`] already has a node
    /// only gains an edge, so a work cited by several papers is a single
    /// node. Without any main paper there is nothing to attach citations to
    /// and the graph is empty.
    pub fn build(&self, papers: &[MainPaper], citations: Vec<Citation>) -> CitationGraph {
        let mut graph = CitationGraph::new(self.config.layout);

        let main_nodes: Vec<NodeIndex> = papers
            .iter()
            .enumerate()
            .map(|(i, paper)| {
                let count = citations
                    .iter()
                    .filter(|c| source_matches(&paper.title, c.source_paper.as_deref()))
                    .count();
                graph.add_node(main_node(i, paper, count as u64))
            })
            .collect();

        if main_nodes.is_empty() {
            if !citations.is_empty() {
                tracing::debug!(citations = citations.len(), "no main papers, citations dropped");
            }
            return graph;
        }

        // Group by source paper first so a work cited by two papers survives
        // deduplication once per paper and can gain an edge from each.
        let mut groups: Vec<Vec<Citation>> = vec![Vec::new(); papers.len()];
        for citation in citations {
            let source = source_index(papers, citation.source_paper.as_deref());
            groups[source].push(citation);
        }

        let mut by_key: HashMap<CitationKey, NodeIndex> = HashMap::new();
        let mut created = 0usize;
        let mut reused = 0usize;

        for (source, group) in groups.into_iter().enumerate() {
            let from = main_nodes[source];
            for citation in self.deduplicator.dedupe(group) {
                let edge = CitesEdge {
                    source_paper: citation.source_paper.clone(),
                    context: citation.context.clone(),
                    page_number: citation.page_number,
                    ..CitesEdge::default()
                };

                // Untitled records have no meaningful key; each gets its own node.
                let key = citation.has_title().then(|| CitationKey::of(&citation));
                if let Some(&existing) = key.as_ref().and_then(|k| by_key.get(k)) {
                    if graph.add_edge(from, existing, edge) {
                        reused += 1;
                    }
                    continue;
                }

                let node = citation_node(created, &citation, &self.config);
                created += 1;
                let to = graph.add_node(node);
                graph.add_edge(from, to, edge);
                if let Some(key) = key {
                    by_key.insert(key, to);
                }
            }
        }

        apply_degree_centrality(&mut graph);
        apply_layout_tags(&mut graph);

        tracing::debug!(
            main = main_nodes.len(),
            citations = created,
            shared = reused,
            edges = graph.edge_count(),
            "built citation graph"
        );
        graph
    }
}

/// Heuristic join between a paper title and a citation's `source_paper`:
/// after stripping a `.pdf` suffix, either contains the other
/// (case-insensitive).
pub fn source_matches(title: &str, source_paper: Option<&str>) -> bool {
    let Some(source) = source_paper else {
        return false;
    };
    let source = normalize_source(source);
    let title = title.trim().to_lowercase();
    if source.is_empty() || title.is_empty() {
        return false;
    }
    title.contains(&source) || source.contains(&title)
}

/// Index of the main paper a citation belongs to. A paper whose title equals
/// `source_paper` wins over an earlier paper that merely contains it, so
/// titles that are substrings of each other still pair up. Falls back to 0.
fn source_index(papers: &[MainPaper], source_paper: Option<&str>) -> usize {
    let exact = source_paper.map(normalize_source).and_then(|source| {
        papers
            .iter()
            .position(|p| !source.is_empty() && p.title.trim().to_lowercase() == source)
    });
    exact
        .or_else(|| papers.iter().position(|p| source_matches(&p.title, source_paper)))
        .unwrap_or(0)
}

fn normalize_source(source: &str) -> String {
    strip_pdf_suffix(source.trim()).trim().to_lowercase()
}

fn strip_pdf_suffix(name: &str) -> &str {
    let len = name.len();
    if len >= 4 && name.is_char_boundary(len - 4) && name[len - 4..].eq_ignore_ascii_case(".pdf") {
        &name[..len - 4]
    } else {
        name
    }
}

fn main_node(index: usize, paper: &MainPaper, citation_count: u64) -> GraphNode {
    GraphNode {
        id: format!("main_{index}"),
        kind: NodeKind::Main,
        label: truncate_label(&paper.title),
        title: paper.title.clone(),
        year: paper.year,
        authors: paper.authors.clone(),
        venue: paper.venue.clone(),
        abstract_text: paper.abstract_text.clone(),
        doi: paper.doi.clone(),
        url: None,
        citation_count: Some(citation_count),
        reference_count: None,
        color: MAIN_NODE_COLOR.to_string(),
        size: MAIN_NODE_SIZE,
        category: None,
        influence_score: None,
        in_degree_centrality: None,
        out_degree_centrality: None,
        level: None,
        group: None,
    }
}

fn citation_node(index: usize, citation: &Citation, config: &GraphConfig) -> GraphNode {
    let category = categorize(citation, config);
    let influence = influence_score(citation, config);
    // Untitled works are shown by their reference text, or by position.
    let title = if citation.has_title() {
        citation.title().to_string()
    } else {
        citation
            .raw_text
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map_or_else(|| format!("Paper {index}"), str::to_string)
    };
    GraphNode {
        id: format!("citation_{index}"),
        kind: NodeKind::Citation,
        label: truncate_label(&title),
        title,
        year: citation.year,
        authors: citation.authors.clone(),
        venue: citation.venue.clone(),
        abstract_text: citation.abstract_text.clone(),
        doi: citation.doi.clone(),
        url: citation.url.clone(),
        citation_count: citation.citation_count,
        reference_count: citation.reference_count,
        color: category.color().to_string(),
        size: node_size(influence),
        category: Some(category),
        influence_score: Some(influence),
        in_degree_centrality: None,
        out_degree_centrality: None,
        level: None,
        group: None,
    }
}
