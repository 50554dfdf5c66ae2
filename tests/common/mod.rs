//! Shared test doubles

#![allow(dead_code)]

use async_trait::async_trait;
use frink_embeddings::embedding::Embedder;
use frink_embeddings::index::{Filter, SearchRequest, VectorIndex};
use frink_embeddings::types::{Payload, PointId, ScoredPoint, StoredPoint, Vector};
use frink_embeddings::{Error, Result};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Embedder returning fixed vectors per text and counting calls
pub struct MockEmbedder {
    vectors: HashMap<String, Vector>,
    dimension: usize,
    pub calls: AtomicUsize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            dimension,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vector) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn model_name(&self) -> &str {
        "mock-embedder"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> Result<Vector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimension]))
    }
}

/// Index returning canned data and recording every request
#[derive(Default)]
pub struct RecordingIndex {
    pub hits: Vec<ScoredPoint>,
    pub stored: Vec<StoredPoint>,
    pub unavailable: bool,
    pub searches: Mutex<Vec<SearchRequest>>,
    pub scrolls: Mutex<Vec<Filter>>,
}

impl RecordingIndex {
    pub fn with_hits(hits: Vec<ScoredPoint>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    pub fn search_count(&self) -> usize {
        self.searches.lock().unwrap().len()
    }

    pub fn last_search(&self) -> SearchRequest {
        self.searches
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no search recorded")
    }
}

#[async_trait]
impl VectorIndex for RecordingIndex {
    fn location(&self) -> &str {
        "mock://index"
    }

    async fn search(&self, _collection: &str, request: SearchRequest) -> Result<Vec<ScoredPoint>> {
        if self.unavailable {
            return Err(Error::unavailable("connection refused"));
        }
        let limit = request.limit;
        self.searches.lock().unwrap().push(request);
        Ok(self.hits.iter().take(limit).cloned().collect())
    }

    async fn scroll(
        &self,
        _collection: &str,
        filter: &Filter,
        limit: usize,
        _with_vectors: bool,
    ) -> Result<Vec<StoredPoint>> {
        if self.unavailable {
            return Err(Error::unavailable("connection refused"));
        }
        self.scrolls.lock().unwrap().push(filter.clone());
        Ok(self
            .stored
            .iter()
            .filter(|p| filter.matches(&p.payload))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn facet(&self, _collection: &str, _field: &str, _limit: usize) -> Result<Vec<String>> {
        if self.unavailable {
            return Err(Error::unavailable("connection refused"));
        }
        Ok(Vec::new())
    }
}

pub fn payload(iri: &str, graph: &str) -> Payload {
    json!({"iri": iri, "graph": graph})
        .as_object()
        .cloned()
        .unwrap()
}

pub fn hit(id: u64, score: f32, iri: &str, graph: &str) -> ScoredPoint {
    ScoredPoint {
        id: PointId::Num(id),
        score,
        payload: payload(iri, graph),
    }
}

pub fn stored(id: u64, vector: Vector, iri: &str, graph: &str) -> StoredPoint {
    StoredPoint {
        id: PointId::Num(id),
        vector: Some(vector),
        payload: payload(iri, graph),
    }
}
