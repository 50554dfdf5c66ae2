//! Qdrant-backed index
//!
//! Talks to a Qdrant server over gRPC. Searches forward the accuracy knob
//! as Qdrant `SearchParams`; facets enumerate groups of the field with one
//! point per group.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    self, group_id, point_id, value, vectors, QueryPointGroupsBuilder, ScrollPointsBuilder,
    SearchParamsBuilder, SearchPointsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use std::collections::HashMap;
use std::time::Duration;
use tonic::Code;

use crate::index::{Condition, Filter, SearchParams, SearchRequest, VectorIndex};
use crate::types::{Payload, PointId, ScoredPoint, StoredPoint};
use crate::{Error, Result};

/// Qdrant gRPC client bound to one server
pub struct QdrantIndex {
    location: String,
    client: Qdrant,
}

impl QdrantIndex {
    /// Build a client for `url`. No connection is made until the first call.
    pub fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .timeout(timeout)
            .build()
            .map_err(classify)?;

        Ok(Self {
            location: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn location(&self) -> &str {
        &self.location
    }

    async fn search(&self, collection: &str, request: SearchRequest) -> Result<Vec<ScoredPoint>> {
        let mut search =
            SearchPointsBuilder::new(collection, request.vector, request.limit as u64)
                .offset(request.offset as u64)
                .with_payload(request.with_payload)
                .params(search_params(&request.params));
        if let Some(filter) = &request.filter {
            search = search.filter(to_qdrant_filter(filter));
        }

        let response = self.client.search_points(search).await.map_err(classify)?;

        tracing::debug!(
            collection,
            results = response.result.len(),
            took_s = response.time,
            "Qdrant search"
        );

        response
            .result
            .into_iter()
            .map(|point| {
                Ok(ScoredPoint {
                    id: point_id_from(point.id)?,
                    score: point.score,
                    payload: payload_from(point.payload),
                })
            })
            .collect()
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>> {
        let scroll = ScrollPointsBuilder::new(collection)
            .filter(to_qdrant_filter(filter))
            .limit(limit as u32)
            .with_payload(true)
            .with_vectors(with_vectors);

        let response = self.client.scroll(scroll).await.map_err(classify)?;

        response
            .result
            .into_iter()
            .map(|point| {
                Ok(StoredPoint {
                    id: point_id_from(point.id)?,
                    vector: point.vectors.and_then(dense_vector),
                    payload: payload_from(point.payload),
                })
            })
            .collect()
    }

    async fn facet(&self, collection: &str, field: &str, limit: usize) -> Result<Vec<String>> {
        let groups = QueryPointGroupsBuilder::new(collection, field)
            .group_size(1u64)
            .limit(limit as u64)
            .with_payload(false)
            .with_vectors(false);

        let response = self.client.query_groups(groups).await.map_err(classify)?;

        Ok(response
            .result
            .map(|result| result.groups)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|group| group.id.and_then(|id| id.kind))
            .map(|kind| match kind {
                group_id::Kind::StringValue(s) => s,
                group_id::Kind::UnsignedValue(n) => n.to_string(),
                group_id::Kind::IntegerValue(n) => n.to_string(),
            })
            .collect())
    }
}

fn search_params(params: &SearchParams) -> qdrant::SearchParams {
    let mut builder = SearchParamsBuilder::default().exact(params.exact);
    if let Some(ef) = params.hnsw_ef {
        builder = builder.hnsw_ef(ef as u64);
    }
    builder.into()
}

fn to_qdrant_condition(condition: &Condition) -> qdrant::Condition {
    match condition {
        Condition::Value { key, value } => qdrant::Condition::matches(key.as_str(), value.clone()),
        Condition::Any { key, any } => qdrant::Condition::matches(key.as_str(), any.clone()),
    }
}

fn to_qdrant_filter(filter: &Filter) -> qdrant::Filter {
    qdrant::Filter {
        must: filter.must.iter().map(to_qdrant_condition).collect(),
        must_not: filter.must_not.iter().map(to_qdrant_condition).collect(),
        ..Default::default()
    }
}

fn point_id_from(id: Option<qdrant::PointId>) -> Result<PointId> {
    match id.and_then(|id| id.point_id_options) {
        Some(point_id::PointIdOptions::Num(n)) => Ok(PointId::Num(n)),
        Some(point_id::PointIdOptions::Uuid(s)) => uuid::Uuid::parse_str(&s)
            .map(PointId::Uuid)
            .map_err(|e| Error::index(format!("invalid point id {}: {}", s, e))),
        None => Err(Error::index("point without id")),
    }
}

fn dense_vector(vectors: qdrant::Vectors) -> Option<Vec<f32>> {
    match vectors.vectors_options? {
        vectors::VectorsOptions::Vector(vector) => Some(vector.data),
        vectors::VectorsOptions::Vectors(_) => None,
    }
}

fn payload_from(payload: HashMap<String, qdrant::Value>) -> Payload {
    payload
        .into_iter()
        .map(|(key, value)| (key, json_from(value)))
        .collect()
}

fn json_from(value: qdrant::Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value.kind {
        None | Some(value::Kind::NullValue(_)) => Json::Null,
        Some(value::Kind::BoolValue(b)) => Json::Bool(b),
        Some(value::Kind::IntegerValue(n)) => Json::from(n),
        Some(value::Kind::DoubleValue(f)) => {
            serde_json::Number::from_f64(f).map_or(Json::Null, Json::Number)
        }
        Some(value::Kind::StringValue(s)) => Json::String(s),
        Some(value::Kind::ListValue(list)) => {
            Json::Array(list.values.into_iter().map(json_from).collect())
        }
        Some(value::Kind::StructValue(st)) => Json::Object(
            st.fields
                .into_iter()
                .map(|(key, value)| (key, json_from(value)))
                .collect(),
        ),
    }
}

/// Transport failures become `IndexUnavailable`; everything the server
/// answered with is an index error.
fn classify(err: QdrantError) -> Error {
    match &err {
        QdrantError::ResponseError { status }
            if matches!(
                status.code(),
                Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled
            ) =>
        {
            Error::unavailable(err.to_string())
        }
        QdrantError::Io(_) => Error::unavailable(err.to_string()),
        _ => Error::index(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::{condition, r#match, ListValue, Struct};

    fn string_value(s: &str) -> qdrant::Value {
        qdrant::Value {
            kind: Some(value::Kind::StringValue(s.to_string())),
        }
    }

    fn match_of(condition: &qdrant::Condition) -> (&str, &r#match::MatchValue) {
        match &condition.condition_one_of {
            Some(condition::ConditionOneOf::Field(field)) => {
                let matched = field
                    .r#match
                    .as_ref()
                    .and_then(|m| m.match_value.as_ref())
                    .unwrap();
                (field.key.as_str(), matched)
            }
            other => panic!("expected field condition, got {:?}", other),
        }
    }

    #[test]
    fn test_graph_filters_map_to_keyword_matches() {
        let include = to_qdrant_filter(&Filter::must([Condition::match_any(
            "graph",
            ["USGS", "NOAA"],
        )]));
        assert_eq!(include.must.len(), 1);
        assert!(include.must_not.is_empty());
        let (key, matched) = match_of(&include.must[0]);
        assert_eq!(key, "graph");
        match matched {
            r#match::MatchValue::Keywords(keywords) => {
                assert_eq!(keywords.strings, vec!["USGS", "NOAA"])
            }
            other => panic!("expected keywords, got {:?}", other),
        }

        let lookup = to_qdrant_filter(&Filter::must_not([Condition::match_value(
            "iri",
            "urn:a",
        )]));
        assert!(lookup.must.is_empty());
        let (key, matched) = match_of(&lookup.must_not[0]);
        assert_eq!(key, "iri");
        assert_eq!(matched, &r#match::MatchValue::Keyword("urn:a".to_string()));
    }

    #[test]
    fn test_search_params_carry_accuracy_knob() {
        let exact = search_params(&SearchParams::exact(Some(64)));
        assert_eq!(exact.exact, Some(true));
        assert_eq!(exact.hnsw_ef, Some(64));

        let approximate = search_params(&SearchParams::approximate(None));
        assert_eq!(approximate.exact, Some(false));
        assert_eq!(approximate.hnsw_ef, None);
    }

    #[test]
    fn test_payload_values_convert_to_json() {
        let nested = qdrant::Value {
            kind: Some(value::Kind::StructValue(Struct {
                fields: HashMap::from([(
                    "tags".to_string(),
                    qdrant::Value {
                        kind: Some(value::Kind::ListValue(ListValue {
                            values: vec![string_value("a"), string_value("b")],
                        })),
                    },
                )]),
            })),
        };
        let payload = payload_from(HashMap::from([
            ("iri".to_string(), string_value("urn:a")),
            ("meta".to_string(), nested),
            (
                "rank".to_string(),
                qdrant::Value {
                    kind: Some(value::Kind::IntegerValue(3)),
                },
            ),
        ]));

        assert_eq!(payload["iri"], "urn:a");
        assert_eq!(payload["rank"], 3);
        assert_eq!(payload["meta"], serde_json::json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn test_point_ids_convert() {
        let num = qdrant::PointId {
            point_id_options: Some(point_id::PointIdOptions::Num(7)),
        };
        assert_eq!(point_id_from(Some(num)).unwrap(), PointId::Num(7));

        let uuid = uuid::Uuid::new_v4();
        let id = qdrant::PointId {
            point_id_options: Some(point_id::PointIdOptions::Uuid(uuid.to_string())),
        };
        assert_eq!(point_id_from(Some(id)).unwrap(), PointId::Uuid(uuid));

        assert!(point_id_from(None).is_err());
    }

    #[test]
    fn test_transport_errors_are_unavailable() {
        let down = QdrantError::ResponseError {
            status: tonic::Status::unavailable("connection refused"),
        };
        assert!(classify(down).is_unavailable());

        let slow = QdrantError::ResponseError {
            status: tonic::Status::deadline_exceeded("timeout"),
        };
        assert!(classify(slow).is_unavailable());

        let rejected = QdrantError::ResponseError {
            status: tonic::Status::not_found("collection frink not found"),
        };
        let err = classify(rejected);
        assert!(!err.is_unavailable());
        assert_eq!(err.kind(), "index");
    }

    #[tokio::test]
    async fn test_connect_is_lazy() {
        let index = QdrantIndex::connect("http://127.0.0.1:6334", Duration::from_secs(1)).unwrap();
        assert_eq!(index.location(), "http://127.0.0.1:6334");
    }
}
