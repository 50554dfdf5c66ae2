//! Core types for frink-embeddings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payload field holding a point's stable identifier
pub const IRI_FIELD: &str = "iri";

/// Payload field holding the graph a point was ingested from
pub const GRAPH_FIELD: &str = "graph";

/// Vector type
pub type Vector = Vec<f32>;

/// Point payload (arbitrary JSON object)
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Point ID as assigned by the index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(uuid::Uuid),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<u64> for PointId {
    fn from(n: u64) -> Self {
        PointId::Num(n)
    }
}

impl From<uuid::Uuid> for PointId {
    fn from(u: uuid::Uuid) -> Self {
        PointId::Uuid(u)
    }
}

/// A point as stored in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPoint {
    pub id: PointId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vector>,
    #[serde(default)]
    pub payload: Payload,
}

/// Single search hit, ordered by descending score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    #[serde(default)]
    pub payload: Payload,
}

impl ScoredPoint {
    /// Identifier stored in the payload, if any
    pub fn iri(&self) -> Option<&str> {
        payload_str(&self.payload, IRI_FIELD)
    }
}

fn payload_str<'a>(payload: &'a Payload, field: &str) -> Option<&'a str> {
    payload.get(field).and_then(|v| v.as_str())
}
