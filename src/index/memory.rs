//! In-process vector index
//!
//! Holds named collections of points in memory and answers searches by
//! exhaustive cosine scan. Search width and the exact flag are accepted
//! and ignored since every search is already exact.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;
use std::path::Path;
use std::sync::RwLock;

use crate::index::{Filter, SearchRequest, VectorIndex};
use crate::types::{ScoredPoint, StoredPoint, Vector};
use crate::{Error, Result};

/// A single collection: fixed dimension, points in insertion order
struct Collection {
    dimension: usize,
    points: Vec<StoredPoint>,
}

/// Memory-backed vector index
pub struct MemoryIndex {
    location: String,
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Load a collection from a JSON-lines file of points.
    ///
    /// Each non-empty line is `{"id": .., "vector": [..], "payload": {..}}`.
    pub fn from_jsonl(path: impl AsRef<Path>, collection: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let mut points = Vec::new();

        for (lineno, line) in std::io::BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let point: StoredPoint = serde_json::from_str(&line).map_err(|e| {
                Error::index(format!("{}:{}: invalid point: {}", path.display(), lineno + 1, e))
            })?;
            points.push(point);
        }

        let index = Self::new(path.display().to_string());
        index.insert(collection, points)?;

        tracing::info!(
            location = %index.location,
            collection,
            points = index.len(collection),
            "Loaded memory index"
        );

        Ok(index)
    }

    /// Add points to a collection, creating it on first insert.
    ///
    /// Every point must carry a vector of the collection's dimension.
    pub fn insert(&self, collection: &str, points: Vec<StoredPoint>) -> Result<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| Error::internal("memory index lock poisoned"))?;

        for point in points {
            let dim = match &point.vector {
                Some(v) if !v.is_empty() => v.len(),
                _ => {
                    return Err(Error::index(format!("point {} has no vector", point.id)));
                }
            };

            let entry = collections
                .entry(collection.to_string())
                .or_insert_with(|| Collection {
                    dimension: dim,
                    points: Vec::new(),
                });

            if entry.dimension != dim {
                return Err(Error::index(format!(
                    "Vector dimension mismatch: expected {}, got {}",
                    entry.dimension, dim
                )));
            }

            entry.points.push(point);
        }

        Ok(())
    }

    /// Number of points in a collection (0 if absent)
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, |c| c.points.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn with_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&Collection) -> Result<T>,
    ) -> Result<T> {
        let collections = self
            .collections
            .read()
            .map_err(|_| Error::internal("memory index lock poisoned"))?;
        let coll = collections
            .get(collection)
            .ok_or_else(|| Error::index(format!("Collection not found: {}", collection)))?;
        f(coll)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn location(&self) -> &str {
        &self.location
    }

    async fn search(&self, collection: &str, request: SearchRequest) -> Result<Vec<ScoredPoint>> {
        self.with_collection(collection, |coll| {
            if request.vector.len() != coll.dimension {
                return Err(Error::index(format!(
                    "Query vector dimension mismatch: expected {}, got {}",
                    coll.dimension,
                    request.vector.len()
                )));
            }

            let mut scored: Vec<(f32, &StoredPoint)> = coll
                .points
                .iter()
                .filter(|p| request.filter.as_ref().map_or(true, |f| f.matches(&p.payload)))
                .filter_map(|p| {
                    p.vector
                        .as_ref()
                        .map(|v| (cosine_similarity(&request.vector, v), p))
                })
                .collect();

            // Stable sort keeps insertion order for equal scores
            scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

            Ok(scored
                .into_iter()
                .skip(request.offset)
                .take(request.limit)
                .map(|(score, p)| ScoredPoint {
                    id: p.id.clone(),
                    score,
                    payload: if request.with_payload {
                        p.payload.clone()
                    } else {
                        Default::default()
                    },
                })
                .collect())
        })
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>> {
        self.with_collection(collection, |coll| {
            Ok(coll
                .points
                .iter()
                .filter(|p| filter.matches(&p.payload))
                .take(limit)
                .map(|p| StoredPoint {
                    id: p.id.clone(),
                    vector: if with_vectors { p.vector.clone() } else { None },
                    payload: p.payload.clone(),
                })
                .collect())
        })
    }

    async fn facet(&self, collection: &str, field: &str, limit: usize) -> Result<Vec<String>> {
        self.with_collection(collection, |coll| {
            let values: BTreeSet<&str> = coll
                .points
                .iter()
                .filter_map(|p| p.payload.get(field).and_then(|v| v.as_str()))
                .collect();
            Ok(values.into_iter().take(limit).map(str::to_string).collect())
        })
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm
fn cosine_similarity(a: &Vector, b: &Vector) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
