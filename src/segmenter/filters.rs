/// Per-extension line filters applied before chunking.
///
/// Include patterns win over exclude patterns: when a file type has any
/// include pattern, only matching lines survive and exclusions are ignored.
use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::SegmenterError;

/// Raw patterns as they appear in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilterPatterns {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Compiled filter for one file type.
#[derive(Debug, Clone)]
pub struct LineFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl LineFilter {
    pub fn compile(patterns: &FilterPatterns) -> Result<Self, SegmenterError> {
        Ok(Self {
            include: compile_all(&patterns.include)?,
            exclude: compile_all(&patterns.exclude)?,
        })
    }

    /// Whether a line is kept.
    pub fn keeps(&self, line: &str) -> bool {
        if !self.include.is_empty() {
            return self.include.iter().any(|re| re.is_match(line));
        }
        if !self.exclude.is_empty() {
            return !self.exclude.iter().any(|re| re.is_match(line));
        }
        true
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>, SegmenterError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| SegmenterError::InvalidPattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Filters keyed by lowercase extension without the leading dot.
#[derive(Debug, Clone, Default)]
pub struct FileFilters {
    by_extension: HashMap<String, LineFilter>,
}

impl FileFilters {
    pub fn compile(config: &HashMap<String, FilterPatterns>) -> Result<Self, SegmenterError> {
        let mut by_extension = HashMap::with_capacity(config.len());
        for (ext, patterns) in config {
            by_extension.insert(normalize_extension(ext), LineFilter::compile(patterns)?);
        }
        Ok(Self { by_extension })
    }

    /// Filter that applies to `path`, if its extension has one.
    pub fn for_path(&self, path: &str) -> Option<&LineFilter> {
        let ext = Path::new(path).extension()?.to_str()?;
        self.by_extension.get(&normalize_extension(ext))
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
