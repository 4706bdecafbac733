/// End-to-end integration tests for the docgraph pipeline.
///
/// Tests the complete flow:
///   Config → Coordinator → Ingest → Query → Extract → Analyze → Export → Clear
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use docgraph::config::Config;
use docgraph::embedder::MockEmbedder;
use docgraph::extraction::{ExtractionError, ExtractionProvider};
use docgraph::graph::EntityGraph;
use docgraph::retrieval::KnowledgeStore;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

/// Returns a canned payload per chunk, keyed by a marker word in the text.
struct ScriptedProvider {
    by_marker: HashMap<&'static str, &'static str>,
}

impl ExtractionProvider for ScriptedProvider {
    fn extract(&self, text: &str) -> Result<String, ExtractionError> {
        self.by_marker
            .iter()
            .find(|(marker, _)| text.contains(*marker))
            .map(|(_, payload)| payload.to_string())
            .ok_or_else(|| ExtractionError::Provider("nothing scripted".to_string()))
    }
}

const LANGUAGES: &str = r#"{"entities": [
    {"name": "Rust", "type": "language"},
    {"name": "Cargo", "type": "tool"},
    {"name": "Clippy", "type": "tool"}
  ],
  "relationships": [
    {"source": "Cargo", "target": "Rust", "type": "builds"},
    {"source": "Clippy", "target": "Rust", "type": "lints"},
    {"source": "Cargo", "target": "Clippy", "type": "runs"}
  ]}"#;

const KITCHEN: &str = r#"```json
{"Entities": [
    {"Name": "Pasta", "Type": "dish"},
    {"Name": "Water", "Type": "ingredient"},
    {"Name": "Salt", "Type": "ingredient"}
  ],
  "Relationships": [
    {"Source": "Pasta", "Target": "Water", "Type": "needs"},
    {"Source": "Pasta", "Target": "Salt", "Type": "needs"},
    {"Source": "Salt", "Target": "Water", "Type": "seasons"},
    {"Source": "Pasta", "Target": "Oven", "Type": "needs"}
  ]}
```"#;

/// Full pipeline: config → ingest → query → extract → analyze → clear
#[tokio::test]
async fn test_full_pipeline() {
    // 1. Config from disk
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{"chunk_size": 200, "chunk_overlap": 1, "max_concurrency": 2, "model": {"dimensions": 384}}"#,
    )
    .unwrap();
    let config = Config::load(&config_path.to_string_lossy()).unwrap();
    config.validate().unwrap();

    // 2. Store and coordinator
    let store = KnowledgeStore::new();
    let embedder = Arc::new(MockEmbedder::new(config.model.dimensions));
    let coordinator = config.coordinator(store.clone(), embedder).unwrap();
    let cancel = CancellationToken::new();

    // 3. Ingest three small documents
    let docs = [
        (
            "docs/rust.md",
            "Rust ownership and the borrow checker keep memory safe.\nCargo builds and Clippy lints Rust code.",
        ),
        (
            "docs/kitchen.md",
            "Cooking pasta requires boiling water and salt.\nDrain the pasta before serving.",
        ),
        (
            "docs/garden.md",
            "Tomatoes need sunlight, compost and regular watering.",
        ),
    ];
    for (path, text) in docs {
        let report = coordinator.ingest(path, text, &cancel).await.unwrap();
        assert_eq!(report.chunks, 1, "{path} fits in one chunk");
        assert_eq!(report.embedded, 1);
        assert_eq!(report.skipped, 0);
    }

    let stats = store.stats().await;
    assert_eq!(stats.chunks, 3);
    assert_eq!(stats.dimensions, Some(384));

    // 4. Query: whole-file chunks carry the bare path as reference
    let results = coordinator
        .query("rust borrow checker ownership", config.search_top_k)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].reference, "docs/rust.md");
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    // 5. Extract the graph from the ingested chunks
    let mut by_marker = HashMap::new();
    by_marker.insert("Cargo", LANGUAGES);
    by_marker.insert("pasta", KITCHEN);
    let provider = Arc::new(ScriptedProvider { by_marker });

    let mut chunks = Vec::new();
    for (path, text) in docs {
        chunks.extend(coordinator.segmenter().chunk(path, text));
    }
    let report = coordinator.extract_graph(&chunks, provider, &cancel).await;
    assert_eq!(report.chunks, 3);
    assert_eq!(report.entities_added, 6);
    assert_eq!(report.relationships_added, 6);
    assert_eq!(report.relationships_skipped, 1, "Oven is unknown");
    assert_eq!(report.failed, 1, "garden.md has no script");

    // 6. Traversal over the extracted graph
    {
        let graph = store.graph.read().await;
        let tools: Vec<&str> = graph
            .incoming_neighbors("Rust", None)
            .into_iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(tools.len(), 2);
        assert!(tools.contains(&"Cargo") && tools.contains(&"Clippy"));
        assert!(graph.shortest_path("Rust", "Pasta", 10).is_empty());
        assert_eq!(graph.entity("Salt").unwrap().source_reference, "docs/kitchen.md");
    }

    // 7. Analytics: two disjoint triangles
    let analysis = coordinator.analyze().await;
    assert_eq!(analysis.communities.community_count, 2);
    assert!((analysis.communities.modularity - 0.5).abs() < 1e-9);
    assert_eq!(
        analysis.communities.community_of("Cargo"),
        analysis.communities.community_of("Clippy")
    );
    assert_ne!(
        analysis.communities.community_of("Rust"),
        analysis.communities.community_of("Pasta")
    );
    assert_eq!(analysis.clusters.len(), 2);
    for cluster in &analysis.clusters {
        assert_eq!(cluster.size(), 3);
        assert!((cluster.density - 1.0).abs() < 1e-9);
    }

    // 8. Export survives a rebuild
    let export = store.graph.read().await.export();
    let json = serde_json::to_string(&export).unwrap();
    let rebuilt = EntityGraph::from_export(serde_json::from_str(&json).unwrap());
    assert_eq!(rebuilt.len(), 6);
    assert_eq!(rebuilt.relationship_count(), 6);

    // 9. Session reset
    store.clear().await;
    let stats = store.stats().await;
    assert_eq!(stats.chunks, 0);
    assert_eq!(stats.graph.entities, 0);
    assert!(coordinator.query("rust", 5).await.unwrap().is_empty());
}

/// The "alpha beta" sentence is a single line: one chunk, covering the input.
#[tokio::test]
async fn test_single_line_document() {
    let mut config = Config::default();
    config.chunk_size = 10;
    config.chunk_overlap = 3;

    let store = KnowledgeStore::new();
    let coordinator = config
        .coordinator(store.clone(), Arc::new(MockEmbedder::new(16)))
        .unwrap();

    let text = "alpha beta alpha beta alpha beta alpha beta";
    let report = coordinator
        .ingest("words.txt", text, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.chunks, 1);

    let index = store.index.read().await;
    assert_eq!(index.records()[0].content, text);
    assert_eq!(index.records()[0].reference, "words.txt");
}
