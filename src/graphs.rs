//! Graph catalog
//!
//! The set of graph labels present in the index, used to populate filter
//! choices. Entries are cached per index location with a time-to-live.
//! Concurrent readers may each recompute an expired entry; the last write
//! wins.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::index::VectorIndex;
use crate::types::GRAPH_FIELD;
use crate::Result;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Cached catalog value
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub graphs: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.computed_at >= ttl
    }
}

/// Catalog configuration
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub ttl: Duration,
    /// Maximum number of graphs to enumerate
    pub limit: usize,
    /// Newline-delimited snapshot written on every refresh
    pub snapshot_path: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(5),
            limit: 100,
            snapshot_path: None,
        }
    }
}

/// TTL-cached graph catalog
pub struct GraphCatalog {
    index: Arc<dyn VectorIndex>,
    collection: String,
    config: CatalogConfig,
    clock: Arc<dyn Clock>,
    entries: DashMap<String, CatalogEntry>,
}

impl GraphCatalog {
    pub fn new(index: Arc<dyn VectorIndex>, collection: impl Into<String>, config: CatalogConfig) -> Self {
        Self::with_clock(index, collection, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
        config: CatalogConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            index,
            collection: collection.into(),
            config,
            clock,
            entries: DashMap::new(),
        }
    }

    fn key(&self) -> &str {
        self.index.location()
    }

    /// Cached graph labels, recomputed when older than the TTL
    pub async fn list_graphs(&self) -> Result<Vec<String>> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(self.key()) {
            if !entry.is_stale(now, self.config.ttl) {
                return Ok(entry.graphs.clone());
            }
        }
        self.refresh().await
    }

    /// Recompute the catalog from the index unconditionally
    pub async fn refresh(&self) -> Result<Vec<String>> {
        let mut graphs: Vec<String> = self
            .index
            .facet(&self.collection, GRAPH_FIELD, self.config.limit)
            .await?
            .into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
        graphs.sort();
        graphs.dedup();

        self.entries.insert(
            self.key().to_string(),
            CatalogEntry {
                graphs: graphs.clone(),
                computed_at: self.clock.now(),
            },
        );

        tracing::info!(
            location = %self.key(),
            collection = %self.collection,
            graphs = graphs.len(),
            "Graph catalog refreshed"
        );

        if let Some(path) = &self.config.snapshot_path {
            self.write_snapshot(path, &graphs).await;
        }

        Ok(graphs)
    }

    /// The snapshot is best effort; the cached entry stays authoritative.
    async fn write_snapshot(&self, path: &Path, graphs: &[String]) {
        if let Err(err) = tokio::fs::write(path, graphs.join("\n")).await {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "Failed to write graph snapshot"
            );
        }
    }

    /// Drop the cached entry
    pub fn invalidate(&self) {
        self.entries.remove(self.key());
    }

    /// Read a snapshot file; unreadable files yield an empty catalog.
    pub fn read_snapshot(path: impl AsRef<Path>) -> Vec<String> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => {
                let mut graphs: Vec<String> = contents
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                graphs.sort();
                graphs
            }
            Err(err) => {
                tracing::debug!(path = %path.as_ref().display(), error = %err, "No graph snapshot");
                Vec::new()
            }
        }
    }
}
