use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ignore::WalkBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docgraph::config::Config;
use docgraph::embedder::{Embedder, MockEmbedder};
use docgraph::extraction::{ExtractionProvider, HeuristicExtractor};
use docgraph::retrieval::{KnowledgeStore, RetrievalCoordinator};

#[derive(Parser)]
#[command(name = "docgraph")]
#[command(about = "Index a directory into an in-memory vector index and entity graph")]
struct Cli {
    /// Directory to ingest (respects .gitignore)
    directory: PathBuf,

    /// Query to run after ingestion
    #[arg(long)]
    query: Option<String>,

    /// Override the configured number of results
    #[arg(long)]
    top_k: Option<usize>,

    /// Print detected communities and cluster statistics
    #[arg(long)]
    communities: bool,

    /// Show entities within the configured hop distance of this one
    #[arg(long)]
    related: Option<String>,

    /// Path to the JSON configuration file
    #[arg(long, default_value = "config.json")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    config.validate().context("invalid configuration")?;

    let embedder: Arc<dyn Embedder> = Arc::new(MockEmbedder::new(config.model.dimensions));
    let store = KnowledgeStore::new();
    let coordinator = config.coordinator(store.clone(), embedder)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding work");
            on_signal.cancel();
        }
    });

    ingest_directory(&coordinator, &config, &cli.directory, &cancel).await?;

    let stats = store.stats().await;
    println!(
        "Indexed {} chunks; graph has {} entities and {} relationships",
        stats.chunks, stats.graph.entities, stats.graph.relationships
    );

    if let Some(query) = &cli.query {
        let top_k = cli.top_k.unwrap_or(config.search_top_k);
        info!("Running query '{query}' (top {top_k})");
        let results = coordinator.query(query, top_k).await?;

        println!("\n=== Results for '{query}' ===\n");
        if results.is_empty() {
            println!("No results found.");
        }
        for (idx, res) in results.iter().enumerate() {
            println!("{}. score: {:.3} | {}", idx + 1, res.score, res.reference);
            println!("   {}", truncate(&res.content.replace('\n', " "), 240));
        }
    }

    if let Some(name) = &cli.related {
        let graph = store.graph.read().await;
        let reached = graph.within_hops(name, config.traversal_max_depth);
        println!("\n=== Within {} hops of '{name}' ===\n", config.traversal_max_depth);
        if reached.is_empty() {
            println!("Nothing related.");
        }
        for (entity, hops) in reached {
            println!("  [{hops}] {} ({})", entity.name, entity.entity_type);
        }
    }

    if cli.communities {
        let analysis = coordinator.analyze().await;
        println!(
            "\n=== {} communities (modularity {:.3}) ===\n",
            analysis.communities.community_count, analysis.communities.modularity
        );
        for cluster in analysis.clusters.iter().filter(|c| c.size() > 1) {
            println!(
                "#{} size {} density {:.2} types [{}]",
                cluster.id,
                cluster.size(),
                cluster.density,
                cluster.top_relationship_types.join(", ")
            );
            println!("   {}", truncate(&cluster.member_names.join(", "), 240));
        }
    }

    Ok(())
}

/// Walk `dir`, ingesting every accepted file and extracting its graph.
async fn ingest_directory(
    coordinator: &RetrievalCoordinator,
    config: &Config,
    dir: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    let extractor: Arc<dyn ExtractionProvider> = Arc::new(HeuristicExtractor::new());
    let walker = WalkBuilder::new(dir).hidden(false).build();

    for entry in walker.filter_map(|e| e.ok()) {
        if cancel.is_cancelled() {
            break;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let accepted = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| config.accepts_extension(ext));
        if !accepted {
            continue;
        }

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {e}", path.display());
                continue;
            }
        };
        let rel_path = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        let chunks = coordinator.segmenter().chunk(&rel_path, &text);
        let report = coordinator
            .ingest_chunks(&chunks, cancel)
            .await
            .with_context(|| format!("failed to ingest {rel_path}"))?;
        info!(
            "Ingested {rel_path}: {} chunks, {} embedded, {} skipped",
            report.chunks, report.embedded, report.skipped
        );

        coordinator
            .extract_graph(&chunks, Arc::clone(&extractor), cancel)
            .await;
    }
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}
