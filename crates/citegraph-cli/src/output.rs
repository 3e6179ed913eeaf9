use std::io::Write;

use citegraph_core::{Citation, EnrichStats};
use citegraph_graph::GraphStatistics;
use citegraph_parsing::ExtractionResult;
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Shorten `text` to `max` characters, appending `...` when cut.
pub fn truncate_display(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Print the extraction summary for one document.
pub fn print_extraction_summary(
    w: &mut dyn Write,
    file_name: &str,
    extraction: &ExtractionResult,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Extracting references from {}...", file_name)?;

    let detail = match (extraction.header_page, extraction.strategy) {
        (Some(page), Some(strategy)) => {
            format!("(references header on page {}, {} segmentation)", page + 1, strategy)
        }
        (None, Some(strategy)) => format!("(no references header, {} segmentation)", strategy),
        (_, None) => "(no references recognized)".to_string(),
    };

    writeln!(w, "Found {} references", extraction.references.len())?;
    if color.enabled() {
        writeln!(w, "{}", detail.dimmed())?;
    } else {
        writeln!(w, "{}", detail)?;
    }
    Ok(())
}

/// Print one extracted reference with its heuristic parse.
pub fn print_parsed_reference(
    w: &mut dyn Write,
    index: usize,
    citation: &Citation,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", format!("[{}]", index + 1).bold().yellow())?;
    } else {
        writeln!(w, "[{}]", index + 1)?;
    }

    writeln!(w, "  Title:   {}", citation.title.as_deref().unwrap_or("(none)"))?;
    let authors: Vec<&str> = citation.authors.iter().map(|a| a.name.as_str()).collect();
    writeln!(
        w,
        "  Authors: {}",
        if authors.is_empty() {
            "(none)".to_string()
        } else {
            authors.join("; ")
        }
    )?;
    if let Some(year) = citation.year {
        writeln!(w, "  Year:    {}", year)?;
    }
    if let Some(ref venue) = citation.venue {
        writeln!(w, "  Venue:   {}", venue)?;
    }
    if let Some(ref doi) = citation.doi {
        writeln!(w, "  DOI:     {}", doi)?;
    }
    if let Some(ref url) = citation.url {
        writeln!(w, "  URL:     {}", url)?;
    }

    let raw = truncate_display(citation.raw_text.as_deref().unwrap_or(""), 200);
    if color.enabled() {
        writeln!(w, "  Raw:     {}", raw.dimmed())?;
    } else {
        writeln!(w, "  Raw:     {}", raw)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Print how enrichment went for one document.
pub fn print_enrich_stats(
    w: &mut dyn Write,
    stats: &EnrichStats,
    color: ColorMode,
) -> std::io::Result<()> {
    let found = format!("{} enriched", stats.found);
    let fallback = format!(
        "{} parsed locally ({} not found, {} failed, {} skipped)",
        stats.not_found + stats.failed + stats.skipped,
        stats.not_found,
        stats.failed,
        stats.skipped
    );
    if color.enabled() {
        writeln!(w, "  {}, {}", found.green(), fallback.yellow())?;
    } else {
        writeln!(w, "  {}, {}", found, fallback)?;
    }
    Ok(())
}

/// Print the graph statistics block.
pub fn print_graph_summary(
    w: &mut dyn Write,
    stats: &GraphStatistics,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "CITATION GRAPH".bold())?;
    } else {
        writeln!(w, "CITATION GRAPH")?;
    }
    writeln!(
        w,
        "  Nodes:     {} ({} papers, {} cited works)",
        stats.node_count, stats.main_nodes, stats.citation_nodes
    )?;
    writeln!(w, "  Edges:     {}", stats.edge_count)?;
    writeln!(w, "  Density:   {:.4}", stats.density)?;
    writeln!(
        w,
        "  Connected: {}",
        if stats.is_weakly_connected { "yes" } else { "no" }
    )?;
    match stats.year_range {
        Some(range) => writeln!(
            w,
            "  Years:     {}-{} ({} nodes dated)",
            range.min, range.max, stats.nodes_with_year
        )?,
        None => writeln!(w, "  Years:     unknown")?,
    }

    let shared: Vec<_> = stats.top_cited.iter().filter(|n| n.in_degree > 1).collect();
    if !shared.is_empty() {
        writeln!(w)?;
        writeln!(w, "  Cited by several papers:")?;
        for node in shared {
            let label = truncate_display(&node.label, 70);
            if color.enabled() {
                writeln!(w, "    {} {}", format!("{}x", node.in_degree).cyan(), label)?;
            } else {
                writeln!(w, "    {}x {}", node.in_degree, label)?;
            }
        }
    }
    Ok(())
}
