use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{IndexError, IoContext, Result};

/// A catalog entry describing a downloadable asset package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub identifier: String,
    pub title: String,
    pub author_name: String,
    pub package_type: String,
}

/// Asynchronous package query against the remote catalog.
///
/// The filter expression is a whitespace separated list of `type:<kind>`
/// tokens and free text. No timeout is applied by callers.
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    async fn query(&self, filter: &str, max_results: usize) -> Result<Vec<RemoteRecord>>;
}

/// Catalog served from an in-memory record list, typically loaded from JSON.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    records: Vec<RemoteRecord>,
}

impl StaticCatalog {
    pub fn new(records: Vec<RemoteRecord>) -> Self {
        Self { records }
    }

    /// Load a JSON array of records.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).op_context("reading catalog", path)?;
        let records = serde_json::from_str(&text).map_err(|e| IndexError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self { records })
    }

    pub fn records(&self) -> &[RemoteRecord] {
        &self.records
    }

    /// Evaluate a filter expression synchronously.
    pub fn matching(&self, filter: &str, max_results: usize) -> Vec<RemoteRecord> {
        let parsed = ParsedFilter::parse(filter);
        self.records
            .iter()
            .filter(|record| parsed.matches(record))
            .take(max_results)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogQuery for StaticCatalog {
    async fn query(&self, filter: &str, max_results: usize) -> Result<Vec<RemoteRecord>> {
        Ok(self.matching(filter, max_results))
    }
}

#[derive(Debug, Default)]
struct ParsedFilter {
    types: Vec<String>,
    terms: Vec<String>,
}

impl ParsedFilter {
    fn parse(filter: &str) -> Self {
        let mut parsed = Self::default();
        for token in filter.split_whitespace() {
            let lower = token.to_lowercase();
            match lower.strip_prefix("type:") {
                Some(kind) => parsed.types.push(kind.to_string()),
                None => parsed.terms.push(lower.clone()),
            }
        }
        parsed
    }

    fn matches(&self, record: &RemoteRecord) -> bool {
        let package_type = record.package_type.to_lowercase();
        if !self.types.is_empty() && !self.types.iter().any(|t| *t == package_type) {
            return false;
        }
        let title = record.title.to_lowercase();
        let author = record.author_name.to_lowercase();
        self.terms
            .iter()
            .all(|term| title.contains(term) || author.contains(term))
    }
}
