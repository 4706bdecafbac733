/// Configuration module for docgraph.
///
/// Handles loading, validating, and providing default configuration values.
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embedder::Embedder;
use crate::retrieval::{KnowledgeStore, RetrievalCoordinator};
use crate::segmenter::{FilterPatterns, Segmenter, SegmenterError};

const DEFAULT_CONFIG_PATH: &str = "config.json";

// ── Default value functions ──────────────────────────────────────────

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    2
}

fn default_max_line_length() -> usize {
    1000
}

fn default_extensions() -> Vec<String> {
    ["md", "txt", "rs", "go", "py", "js", "ts", "cs"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn default_search_top_k() -> usize {
    5
}

fn default_max_concurrency() -> usize {
    4
}

fn default_embed_timeout_secs() -> u64 {
    30
}

fn default_traversal_max_depth() -> usize {
    3
}

fn default_dimensions() -> usize {
    384
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Token budget per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Lines repeated between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Line filters keyed by file extension.
    #[serde(default)]
    pub file_filters: HashMap<String, FilterPatterns>,

    /// File extensions picked up when walking a directory.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_search_top_k")]
    pub search_top_k: usize,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    #[serde(default = "default_traversal_max_depth")]
    pub traversal_max_depth: usize,

    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ModelConfig {
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_line_length: default_max_line_length(),
            file_filters: HashMap::new(),
            extensions: default_extensions(),
            search_top_k: default_search_top_k(),
            max_concurrency: default_max_concurrency(),
            embed_timeout_secs: default_embed_timeout_secs(),
            traversal_max_depth: default_traversal_max_depth(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and, for the
    /// default path only, writes it out as a template.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let mut cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");

        if cfg.extensions.is_empty() {
            cfg.extensions = default_extensions();
        }
        for ext in &mut cfg.extensions {
            *ext = ext.trim().trim_start_matches('.').to_lowercase();
        }

        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.chunk_size > 0, "chunk_size must be positive");
        anyhow::ensure!(
            self.chunk_overlap < self.chunk_size,
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            self.chunk_overlap,
            self.chunk_size
        );
        anyhow::ensure!(self.max_line_length > 0, "max_line_length must be positive");
        anyhow::ensure!(self.search_top_k > 0, "search_top_k must be positive");
        anyhow::ensure!(self.max_concurrency > 0, "max_concurrency must be positive");
        anyhow::ensure!(
            self.embed_timeout_secs > 0,
            "embed_timeout_secs must be positive"
        );
        anyhow::ensure!(
            self.model.dimensions > 0,
            "model.dimensions must be positive"
        );
        self.segmenter().context("invalid segmenter settings")?;
        Ok(())
    }

    /// Build a segmenter with the configured budget and filters.
    pub fn segmenter(&self) -> Result<Segmenter, SegmenterError> {
        Segmenter::new(self.chunk_size, self.chunk_overlap, self.max_line_length)?
            .with_filters(&self.file_filters)
    }

    #[must_use]
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    /// Whether a file with this extension should be ingested.
    #[must_use]
    pub fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.extensions.iter().any(|e| *e == ext)
    }

    /// Wire a coordinator over `store` using these settings.
    pub fn coordinator(
        &self,
        store: KnowledgeStore,
        embedder: Arc<dyn Embedder>,
    ) -> Result<RetrievalCoordinator> {
        let segmenter = self.segmenter().context("invalid segmenter settings")?;
        let coordinator = RetrievalCoordinator::new(segmenter, store, embedder)
            .with_limits(self.max_concurrency, self.embed_timeout())?;
        Ok(coordinator)
    }
}
