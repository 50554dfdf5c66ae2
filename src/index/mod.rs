//! Vector index abstraction
//!
//! The index is an external service offering filtered nearest-neighbor
//! search, exact field lookup (scroll) and facet enumeration. Callers hold
//! one shared handle per process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Payload, ScoredPoint, StoredPoint, Vector};
use crate::Result;

pub mod memory;
pub mod qdrant;
pub mod timeout;

pub use memory::MemoryIndex;
pub use self::qdrant::QdrantIndex;
pub use timeout::TimeoutIndex;

/// Vector index trait
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Location of the index (URL or path). Used as a cache key.
    fn location(&self) -> &str;

    /// Nearest-neighbor search, ordered by descending score
    async fn search(&self, collection: &str, request: SearchRequest) -> Result<Vec<ScoredPoint>>;

    /// Return up to `limit` points matching `filter`
    async fn scroll(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>>;

    /// Distinct values of a payload field
    async fn facet(&self, collection: &str, field: &str, limit: usize) -> Result<Vec<String>>;
}

/// Search request passed to the index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub vector: Vector,
    pub filter: Option<Filter>,
    pub limit: usize,
    pub offset: usize,
    pub params: SearchParams,
    pub with_payload: bool,
}

/// Accuracy/speed tradeoff for a search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Search width of the approximate index (HNSW `ef`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hnsw_ef: Option<usize>,
    /// Bypass the approximate index and scan exhaustively
    #[serde(default)]
    pub exact: bool,
}

impl SearchParams {
    pub fn approximate(hnsw_ef: Option<usize>) -> Self {
        Self {
            hnsw_ef,
            exact: false,
        }
    }

    pub fn exact(hnsw_ef: Option<usize>) -> Self {
        Self {
            hnsw_ef,
            exact: true,
        }
    }
}

/// Boolean predicate over point payloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Condition>,
}

impl Filter {
    pub fn must(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self {
            must: conditions.into_iter().collect(),
            must_not: Vec::new(),
        }
    }

    pub fn must_not(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Self {
            must: Vec::new(),
            must_not: conditions.into_iter().collect(),
        }
    }

    /// Evaluate the filter against a payload
    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|c| c.matches(payload))
            && !self.must_not.iter().any(|c| c.matches(payload))
    }
}

/// Single field condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "match", rename_all = "snake_case")]
pub enum Condition {
    /// Field equals value
    Value { key: String, value: String },
    /// Field equals any of the values
    Any { key: String, any: Vec<String> },
}

impl Condition {
    pub fn match_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::Value {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn match_any<I, S>(key: impl Into<String>, any: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::Any {
            key: key.into(),
            any: any.into_iter().map(Into::into).collect(),
        }
    }

    /// A missing or non-string field never matches
    pub fn matches(&self, payload: &Payload) -> bool {
        match self {
            Condition::Value { key, value } => {
                Self::field(payload, key).is_some_and(|field| field == value)
            }
            Condition::Any { key, any } => {
                Self::field(payload, key).is_some_and(|field| any.iter().any(|v| v == field))
            }
        }
    }

    fn field<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
        payload.get(key).and_then(|v| v.as_str())
    }
}
