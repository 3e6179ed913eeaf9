use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use citegraph_core::config_file::{self, ConfigFile};
use citegraph_core::{
    Citation, Config, EnrichEvent, EnrichStats, Enricher, MainPaper, PlainTextBackend,
};
use citegraph_graph::{CitationGraph, GraphBuilder, GraphConfig, Layout};
use citegraph_parsing::{ParsingConfigBuilder, ReferenceExtractor, parse_citation};

mod output;

use output::ColorMode;

/// Citation graph builder - extract references from papers and map what they cite
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Read configuration from this file instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract and parse the references of a text document (no network)
    Extract {
        /// Path to the document text (pages separated by form feeds)
        file_path: PathBuf,

        /// Print the parsed citations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract, enrich, and build a citation graph from one or more documents
    Analyze {
        /// Document text files; each one is a source paper
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Title of each source paper, in file order (default: file stem)
        #[arg(long = "title")]
        titles: Vec<String>,

        /// Skip metadata lookups and use the heuristic parse only
        #[arg(long)]
        offline: bool,

        /// Layout hint: force, hierarchical or circular
        #[arg(long)]
        layout: Option<Layout>,

        /// Write the graph JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Semantic Scholar API key
        #[arg(long)]
        s2_api_key: Option<String>,

        /// Contact address sent to CrossRef
        #[arg(long)]
        crossref_mailto: Option<String>,

        /// Comma-separated list of metadata sources to disable
        #[arg(long, value_delimiter = ',')]
        disable_sources: Vec<String>,

        /// Only look up the first N references of each document
        #[arg(long)]
        max_lookups: Option<usize>,

        /// Year that recency is measured against (default: current year)
        #[arg(long)]
        reference_year: Option<i32>,
    },

    /// Build a citation graph from pre-enriched JSON
    Graph {
        /// JSON array of source papers ({title, year, authors, ...})
        #[arg(long)]
        papers: PathBuf,

        /// JSON array of citations, each optionally tagged with source_paper
        #[arg(long)]
        citations: PathBuf,

        /// Layout hint: force, hierarchical or circular
        #[arg(long)]
        layout: Option<Layout>,

        /// Write the graph JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Year that recency is measured against (default: current year)
        #[arg(long)]
        reference_year: Option<i32>,
    },

    /// Show the effective configuration file
    Config {
        /// Save the effective configuration to the platform config directory
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let file_config = match &cli.config {
        Some(path) => config_file::load_from_path(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?,
        None => config_file::load_config(),
    };
    let color = ColorMode(!cli.no_color);

    match cli.command {
        Command::Extract { file_path, json } => extract(&file_path, json, &file_config, color),
        Command::Analyze {
            files,
            titles,
            offline,
            layout,
            output,
            s2_api_key,
            crossref_mailto,
            disable_sources,
            max_lookups,
            reference_year,
        } => {
            let overrides = EnrichOverrides {
                s2_api_key,
                crossref_mailto,
                disable_sources,
                max_lookups,
            };
            let graph_config = resolve_graph_config(&file_config, layout, reference_year);
            analyze(
                &files,
                &titles,
                offline,
                overrides,
                &file_config,
                graph_config,
                output,
                color,
            )
            .await
        }
        Command::Graph {
            papers,
            citations,
            layout,
            output,
            reference_year,
        } => {
            let graph_config = resolve_graph_config(&file_config, layout, reference_year);
            graph_from_json(&papers, &citations, graph_config, output, color)
        }
        Command::Config { save } => show_config(file_config, save),
    }
}

/// Install the tracing subscriber. `RUST_LOG` applies unless `-v` is given;
/// the default level is `warn`. With `--log-file` logs go to that file
/// through a non-blocking writer whose guard must outlive `main`.
fn init_tracing(
    verbose: u8,
    log_file: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", path.display()))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(writer)
        .init();
    Ok(Some(guard))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_extractor(file_config: &ConfigFile) -> anyhow::Result<ReferenceExtractor> {
    let builder = match &file_config.parsing {
        Some(section) => ParsingConfigBuilder::from_section(section),
        None => ParsingConfigBuilder::new(),
    };
    let config = builder
        .build()
        .context("Invalid section header or end marker in [parsing] config")?;
    Ok(ReferenceExtractor::with_config(config))
}

fn resolve_graph_config(
    file_config: &ConfigFile,
    layout: Option<Layout>,
    reference_year: Option<i32>,
) -> GraphConfig {
    let mut config = match &file_config.graph {
        Some(section) => GraphConfig::from_section(section),
        None => GraphConfig::default(),
    };
    if let Some(layout) = layout {
        config.layout = layout;
    }
    if let Some(year) = reference_year {
        config.reference_year = year;
    }
    config
}

fn extract(
    file_path: &Path,
    json: bool,
    file_config: &ConfigFile,
    color: ColorMode,
) -> anyhow::Result<()> {
    if !file_path.exists() {
        bail!("File not found: {}", file_path.display());
    }
    let extractor = build_extractor(file_config)?;
    let extraction = extractor
        .extract_via_backend(file_path, &PlainTextBackend)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;

    let mut out = std::io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &extraction.citations())?;
        writeln!(out)?;
        return Ok(());
    }

    output::print_extraction_summary(&mut out, &file_name_of(file_path), &extraction, color)?;
    writeln!(out)?;
    for (i, citation) in extraction.citations().iter().enumerate() {
        output::print_parsed_reference(&mut out, i, citation, color)?;
    }
    writeln!(out, "Total: {} references", extraction.references.len())?;
    Ok(())
}

/// Enrichment settings given on the command line.
struct EnrichOverrides {
    s2_api_key: Option<String>,
    crossref_mailto: Option<String>,
    disable_sources: Vec<String>,
    max_lookups: Option<usize>,
}

/// Resolve enrichment config: CLI flags > env vars > config file > defaults.
fn resolve_enrich_config(file_config: &ConfigFile, overrides: EnrichOverrides) -> Config {
    let mut config = Config::default();
    file_config.apply_to(&mut config);

    if let Ok(key) = std::env::var("S2_API_KEY") {
        config.s2_api_key = Some(key);
    }
    if let Ok(mailto) = std::env::var("CROSSREF_MAILTO") {
        config.crossref_mailto = Some(mailto);
    }

    if overrides.s2_api_key.is_some() {
        config.s2_api_key = overrides.s2_api_key;
    }
    if overrides.crossref_mailto.is_some() {
        config.crossref_mailto = overrides.crossref_mailto;
    }
    if !overrides.disable_sources.is_empty() {
        config.disabled_sources = overrides.disable_sources;
    }
    if overrides.max_lookups.is_some() {
        config.max_lookups = overrides.max_lookups;
    }
    config.finalize()
}

#[allow(clippy::too_many_arguments)]
async fn analyze(
    files: &[PathBuf],
    titles: &[String],
    offline: bool,
    overrides: EnrichOverrides,
    file_config: &ConfigFile,
    graph_config: GraphConfig,
    output: Option<PathBuf>,
    color: ColorMode,
) -> anyhow::Result<()> {
    for path in files {
        if !path.exists() {
            bail!("File not found: {}", path.display());
        }
    }
    if titles.len() > files.len() {
        bail!("Got {} titles for {} files", titles.len(), files.len());
    }

    // Human-readable output goes to stderr when the graph JSON uses stdout.
    let mut report: Box<dyn Write> = if output.is_some() {
        Box::new(std::io::stdout())
    } else {
        Box::new(std::io::stderr())
    };

    let extractor = build_extractor(file_config)?;
    let enricher = if offline {
        None
    } else {
        let enricher = Enricher::new(Arc::new(resolve_enrich_config(file_config, overrides)))
            .context("Failed to create HTTP client")?;
        tracing::info!(sources = ?enricher.source_names(), "metadata sources");
        Some(enricher)
    };

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let mut papers = Vec::with_capacity(files.len());
    let mut citations: Vec<Citation> = Vec::new();

    for (i, path) in files.iter().enumerate() {
        let file_name = file_name_of(path);
        let title = titles.get(i).cloned().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| file_name.clone())
        });

        let extraction = extractor
            .extract_via_backend(path, &PlainTextBackend)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        output::print_extraction_summary(&mut report, &file_name, &extraction, color)?;

        let parsed: Vec<Citation> = match &enricher {
            Some(enricher) if !extraction.is_empty() => {
                let bar = progress_bar(color);
                let progress = {
                    let bar = bar.clone();
                    move |event: EnrichEvent| match event {
                        EnrichEvent::Started { total, .. } => bar.set_length(total as u64),
                        EnrichEvent::Result { .. } => bar.inc(1),
                        EnrichEvent::BatchPause { .. } | EnrichEvent::Looking { .. } => {}
                    }
                };
                let outcomes = enricher
                    .enrich(&extraction.references, progress, &cancel)
                    .await;
                bar.finish_and_clear();
                output::print_enrich_stats(&mut report, &EnrichStats::from_outcomes(&outcomes), color)?;
                outcomes
                    .into_iter()
                    .map(|o| o.into_citation(parse_citation))
                    .collect()
            }
            _ => extraction.citations(),
        };

        // Tag with the paper title so the graph builder pairs it with its main node.
        citations.extend(parsed.into_iter().map(|mut c| {
            c.source_paper = Some(title.clone());
            c.standardized()
        }));
        papers.push(MainPaper::new(title));
        writeln!(report)?;
    }

    let graph = GraphBuilder::new(graph_config).build(&papers, citations);
    write_graph(&graph, output.as_deref())?;
    output::print_graph_summary(&mut report, &graph.statistics(), color)?;
    Ok(())
}

/// Progress bar for lookups. Hidden when color is off, so piped or logged
/// runs stay clean.
fn progress_bar(color: ColorMode) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

    let bar = ProgressBar::new(0);
    if !color.enabled() {
        bar.set_draw_target(ProgressDrawTarget::hidden());
        return bar;
    }
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} Looking up [{bar:40.cyan/dim}] {pos}/{len}")
            .unwrap()
            .progress_chars("=> "),
    );
    bar
}

fn graph_from_json(
    papers_path: &Path,
    citations_path: &Path,
    graph_config: GraphConfig,
    output: Option<PathBuf>,
    color: ColorMode,
) -> anyhow::Result<()> {
    let papers: Vec<MainPaper> = read_json(papers_path)?;
    let citations: Vec<Citation> = read_json(citations_path)?;
    let citations: Vec<Citation> = citations
        .into_iter()
        .map(Citation::standardized)
        .filter(Citation::is_valid)
        .collect();

    let graph = GraphBuilder::new(graph_config).build(&papers, citations);
    write_graph(&graph, output.as_deref())?;

    let mut report: Box<dyn Write> = if output.is_some() {
        Box::new(std::io::stdout())
    } else {
        Box::new(std::io::stderr())
    };
    output::print_graph_summary(&mut report, &graph.statistics(), color)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn write_graph(graph: &CitationGraph, output: Option<&Path>) -> anyhow::Result<()> {
    let json = graph.to_json_pretty()?;
    match output {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

fn show_config(file_config: ConfigFile, save: bool) -> anyhow::Result<()> {
    let mut shown = file_config.clone();
    if let Some(keys) = shown.api_keys.as_mut()
        && keys.s2_api_key.is_some()
    {
        keys.s2_api_key = Some("***".to_string());
    }

    match config_file::config_path() {
        Some(path) => println!("# platform config: {}", path.display()),
        None => println!("# platform config: (no config directory)"),
    }
    println!("{}", toml::to_string_pretty(&shown)?);

    if save {
        let path = config_file::save_config(&file_config).map_err(anyhow::Error::msg)?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use citegraph_core::config_file::{EnrichmentConfig, GraphSection};

    #[test]
    fn cli_parses_analyze() {
        let cli = Cli::try_parse_from([
            "citegraph",
            "-vv",
            "analyze",
            "a.txt",
            "b.txt",
            "--title",
            "Paper A",
            "--offline",
            "--layout",
            "circular",
            "--disable-sources",
            "crossref,semantic scholar",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Analyze {
                files,
                titles,
                offline,
                layout,
                disable_sources,
                ..
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(titles, vec!["Paper A".to_string()]);
                assert!(offline);
                assert_eq!(layout, Some(Layout::Circular));
                assert_eq!(disable_sources.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_layout() {
        assert!(Cli::try_parse_from(["citegraph", "analyze", "a.txt", "--layout", "radial"]).is_err());
    }

    #[test]
    fn flags_override_file_config() {
        let file_config = ConfigFile {
            enrichment: Some(EnrichmentConfig {
                max_lookups: Some(3),
                disabled_sources: Some(vec!["CrossRef".into()]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = resolve_enrich_config(
            &file_config,
            EnrichOverrides {
                s2_api_key: Some("flag-key".into()),
                crossref_mailto: None,
                disable_sources: vec![],
                max_lookups: Some(10),
            },
        );
        assert_eq!(config.s2_api_key.as_deref(), Some("flag-key"));
        assert_eq!(config.max_lookups, Some(10));
        assert_eq!(config.disabled_sources, vec!["CrossRef".to_string()]);
    }

    #[test]
    fn graph_config_precedence() {
        let file_config = ConfigFile {
            graph: Some(GraphSection {
                layout: Some("hierarchical".into()),
                reference_year: Some(2020),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = resolve_graph_config(&file_config, None, Some(2024));
        assert_eq!(config.layout, Layout::Hierarchical);
        assert_eq!(config.reference_year, 2024);

        let config = resolve_graph_config(&file_config, Some(Layout::Force), None);
        assert_eq!(config.layout, Layout::Force);
        assert_eq!(config.reference_year, 2020);
    }

    #[test]
    fn graph_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let papers = dir.path().join("papers.json");
        let citations = dir.path().join("citations.json");
        let out = dir.path().join("graph.json");
        std::fs::write(&papers, r#"[{"title": "Survey of Graphs", "year": 2022}]"#).unwrap();
        std::fs::write(
            &citations,
            r#"[
                {"title": "Graph Theory Basics", "year": 2001},
                {"title": "graph theory basics", "year": 2001},
                {"raw_text": "   "}
            ]"#,
        )
        .unwrap();

        graph_from_json(
            &papers,
            &citations,
            GraphConfig::default().with_reference_year(2024),
            Some(out.clone()),
            ColorMode(false),
        )
        .unwrap();

        let json: serde_json::Value = read_json(&out).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(json["links"].as_array().unwrap().len(), 1);
        assert_eq!(json["nodes"][0]["label"], "Survey of Graphs");
    }

    async fn analyze_offline(
        files: &[(&str, &str)],
        titles: &[&str],
    ) -> serde_json::Value {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = files
            .iter()
            .map(|(name, text)| {
                let path = dir.path().join(name);
                std::fs::write(&path, text).unwrap();
                path
            })
            .collect();
        let titles: Vec<String> = titles.iter().map(|t| t.to_string()).collect();
        let out = dir.path().join("graph.json");
        analyze(
            &paths,
            &titles,
            true,
            EnrichOverrides {
                s2_api_key: None,
                crossref_mailto: None,
                disable_sources: vec![],
                max_lookups: None,
            },
            &ConfigFile::default(),
            GraphConfig::default().with_reference_year(2024),
            Some(out.clone()),
            ColorMode(false),
        )
        .await
        .unwrap();
        read_json(&out).unwrap()
    }

    fn link_pairs(json: &serde_json::Value) -> Vec<(String, String)> {
        json["links"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| {
                (
                    l["source"].as_str().unwrap().to_string(),
                    l["target"].as_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    const DOC_A: &str =
        "Intro.\nReferences\n[1] Smith, J. (2020). A Great Paper on Graphs. In Proc. ICML.\n";
    const DOC_B: &str =
        "Intro.\nReferences\n[1] Doe, A. (2019). Another Paper about Trees. Journal of Things.\n";

    #[tokio::test]
    async fn analyze_attributes_citations_to_their_paper() {
        let json = analyze_offline(&[("a.txt", DOC_A), ("b.txt", DOC_B)], &["Paper A", "Paper B"]).await;
        assert_eq!(
            link_pairs(&json),
            vec![
                ("main_0".to_string(), "citation_0".to_string()),
                ("main_1".to_string(), "citation_1".to_string()),
            ]
        );
        assert_eq!(json["nodes"][0]["citation_count"], 1);
        assert_eq!(json["nodes"][1]["label"], "Paper B");
        assert_eq!(json["nodes"][1]["citation_count"], 1);
        assert_eq!(json["links"][1]["source_paper"], "Paper B");
    }

    #[tokio::test]
    async fn analyze_pairs_overlapping_file_stems() {
        let json = analyze_offline(&[("a.txt", DOC_A), ("ab.txt", DOC_B)], &[]).await;
        assert_eq!(
            link_pairs(&json),
            vec![
                ("main_0".to_string(), "citation_0".to_string()),
                ("main_1".to_string(), "citation_1".to_string()),
            ]
        );
    }

    #[test]
    fn read_json_reports_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let err = read_json::<Vec<MainPaper>>(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
    }
}
