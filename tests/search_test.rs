//! Query resolution and search orchestration tests

mod common;

use common::{hit, stored, MockEmbedder, RecordingIndex};
use frink_embeddings::index::{SearchParams, VectorIndex};
use frink_embeddings::query::{vector::l2_norm, Feature, GraphFilter, Query, SearchService};
use frink_embeddings::Error;
use std::sync::Arc;

fn service(index: Arc<RecordingIndex>, embedder: Arc<MockEmbedder>) -> SearchService {
    SearchService::new(index, embedder, "frink", SearchParams::approximate(Some(128)))
}

#[tokio::test]
async fn test_scoped_text_query_scenario() {
    let index = Arc::new(RecordingIndex::with_hits(vec![
        hit(1, 0.93, "urn:a", "USGS"),
        hit(2, 0.81, "urn:b", "USGS"),
        hit(3, 0.64, "urn:c", "USGS"),
    ]));
    let embedder = Arc::new(MockEmbedder::new(3).with("flood", vec![0.2, 0.4, 0.1]));
    let service = service(index.clone(), embedder.clone());

    let query = Query::single(Feature::text("flood")).include_graphs(["USGS"]);
    let results = service.resolve_and_search(&query).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results
        .iter()
        .all(|r| r.payload.get("graph").and_then(|g| g.as_str()) == Some("USGS")));

    let request = index.last_search();
    assert_eq!(request.filter, GraphFilter::include(["USGS"]).to_filter());
    // Single-feature vectors are passed through without normalization
    assert_eq!(request.vector, vec![0.2, 0.4, 0.1]);
    assert_eq!(request.limit, 10);
    assert_eq!(request.offset, 0);
    assert_eq!(request.params, SearchParams::approximate(Some(128)));
    assert!(request.with_payload);
    assert_eq!(embedder.calls(), 1);
}

#[tokio::test]
async fn test_exclude_scope_and_pagination_forwarded() {
    let index = Arc::new(RecordingIndex::default());
    let embedder = Arc::new(MockEmbedder::new(2).with("river", vec![1.0, 0.0]));
    let service = service(index.clone(), embedder);

    let query = Query::single(Feature::text("river"))
        .exclude_graphs(["NOAA"])
        .limit(5)
        .offset(20);
    service
        .resolve_and_search_with(&query, SearchParams::exact(None))
        .await
        .unwrap();

    let request = index.last_search();
    assert_eq!(request.filter, GraphFilter::exclude(["NOAA"]).to_filter());
    assert_eq!((request.limit, request.offset), (5, 20));
    assert!(request.params.exact);
}

#[tokio::test]
async fn test_results_capped_at_limit() {
    let index = Arc::new(RecordingIndex::with_hits(
        (0..20).map(|i| hit(i, 1.0 - i as f32 * 0.01, "urn:x", "G")).collect(),
    ));
    let service = service(index, Arc::new(MockEmbedder::new(2)));

    let results = service
        .search(vec![1.0, 0.0], &GraphFilter::None, 4, 0, SearchParams::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 4);
}

#[tokio::test]
async fn test_conflicting_scope_touches_nothing() {
    let index = Arc::new(RecordingIndex::default());
    let embedder = Arc::new(MockEmbedder::new(2));
    let service = service(index.clone(), embedder.clone());

    let query = Query::single(Feature::text("flood"))
        .include_graphs(["USGS"])
        .exclude_graphs(["NOAA"]);
    let err = service.resolve_and_search(&query).await.unwrap_err();

    assert!(matches!(err, Error::ConflictingGraphScope));
    assert_eq!(embedder.calls(), 0);
    assert_eq!(index.search_count(), 0);
}

#[tokio::test]
async fn test_zero_limit_rejected() {
    let service = service(
        Arc::new(RecordingIndex::default()),
        Arc::new(MockEmbedder::new(2)),
    );
    let err = service
        .resolve_and_search(&Query::single(Feature::text("x")).limit(0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[tokio::test]
async fn test_missing_node_never_searches() {
    let index = Arc::new(RecordingIndex::default());
    let service = service(index.clone(), Arc::new(MockEmbedder::new(2)));

    let err = service
        .resolve_and_search(&Query::single(Feature::node("urn:missing")))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ReferenceNotFound(ref iri) if iri == "urn:missing"));
    assert_eq!(index.scrolls.lock().unwrap().len(), 1);
    assert_eq!(index.search_count(), 0);
}

#[tokio::test]
async fn test_node_feature_reuses_stored_vector() {
    let index = Arc::new(RecordingIndex {
        stored: vec![stored(9, vec![0.3, -0.6], "urn:lake", "USGS")],
        ..Default::default()
    });
    let embedder = Arc::new(MockEmbedder::new(2));
    let service = service(index.clone(), embedder.clone());

    service
        .resolve_and_search(&Query::single(Feature::node("urn:lake")))
        .await
        .unwrap();

    assert_eq!(index.last_search().vector, vec![0.3, -0.6]);
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_empty_positive_set_before_embedding() {
    let index = Arc::new(RecordingIndex::default());
    let embedder = Arc::new(MockEmbedder::new(2));
    let service = service(index.clone(), embedder.clone());

    let query = Query::weighted(vec![], vec![Feature::text("noise")]);
    let err = service.build_query_vector(&query).await.unwrap_err();

    assert!(matches!(err, Error::EmptyPositiveSet));
    assert_eq!(embedder.calls(), 0);
    assert!(index.scrolls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_weighted_single_positive_keeps_direction() {
    let embedder = Arc::new(MockEmbedder::new(2).with("river", vec![3.0, 4.0]));
    let service = service(Arc::new(RecordingIndex::default()), embedder);

    let query = Query::weighted(vec![Feature::text("river")], vec![]);
    let vector = service.build_query_vector(&query).await.unwrap();

    assert!((vector[0] - 0.6).abs() < 1e-6);
    assert!((vector[1] - 0.8).abs() < 1e-6);
    assert!((l2_norm(&vector) - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_weighted_negation() {
    let embedder = Arc::new(
        MockEmbedder::new(2)
            .with("water", vec![1.0, 0.0])
            .with("salt", vec![0.0, 1.0]),
    );
    let service = service(Arc::new(RecordingIndex::default()), embedder);

    let query = Query::weighted(vec![Feature::text("water")], vec![Feature::text("salt")]);
    let vector = service.build_query_vector(&query).await.unwrap();

    let expected = std::f32::consts::FRAC_1_SQRT_2;
    assert!((vector[0] - expected).abs() < 1e-6);
    assert!((vector[1] + expected).abs() < 1e-6);
}

#[tokio::test]
async fn test_weighted_mixes_text_and_node_features() {
    let index = Arc::new(RecordingIndex {
        stored: vec![stored(1, vec![0.0, 2.0], "urn:lake", "USGS")],
        ..Default::default()
    });
    let embedder = Arc::new(MockEmbedder::new(2).with("river", vec![2.0, 0.0]));
    let service = service(index, embedder);

    let query = Query::weighted(vec![Feature::text("river"), Feature::node("urn:lake")], vec![]);
    let vector = service.build_query_vector(&query).await.unwrap();

    let expected = std::f32::consts::FRAC_1_SQRT_2;
    assert!((vector[0] - expected).abs() < 1e-6);
    assert!((vector[1] - expected).abs() < 1e-6);
}

#[tokio::test]
async fn test_weighted_fails_fast_on_missing_reference() {
    let index = Arc::new(RecordingIndex::default());
    let embedder = Arc::new(MockEmbedder::new(2));
    let service = service(index.clone(), embedder.clone());

    let query = Query::weighted(
        vec![Feature::node("urn:missing"), Feature::text("after")],
        vec![Feature::text("negative")],
    );
    let err = service.resolve_and_search(&query).await.unwrap_err();

    assert!(matches!(err, Error::ReferenceNotFound(_)));
    assert_eq!(embedder.calls(), 0);
    assert_eq!(index.search_count(), 0);
}

/// Known gap: per-feature weights are accepted but the combination is an
/// unweighted mean, so scaling a weight changes nothing.
#[tokio::test]
async fn test_weights_do_not_affect_combination() {
    let embedder = Arc::new(
        MockEmbedder::new(2)
            .with("a", vec![1.0, 0.0])
            .with("b", vec![0.0, 1.0]),
    );
    let service = service(Arc::new(RecordingIndex::default()), embedder);

    let plain = Query::weighted(vec![Feature::text("a"), Feature::text("b")], vec![]);
    let weighted = Query::weighted(
        vec![Feature::text("a").with_weight(10.0), Feature::text("b").with_weight(0.1)],
        vec![],
    );

    assert_eq!(
        service.build_query_vector(&plain).await.unwrap(),
        service.build_query_vector(&weighted).await.unwrap()
    );
}

#[tokio::test]
async fn test_build_query_vector_is_idempotent() {
    let embedder = Arc::new(
        MockEmbedder::new(3)
            .with("a", vec![0.3, 0.1, -0.7])
            .with("b", vec![0.9, 0.2, 0.05]),
    );
    let service = service(Arc::new(RecordingIndex::default()), embedder);
    let query = Query::weighted(vec![Feature::text("a")], vec![Feature::text("b")]);

    let first = service.build_query_vector(&query).await.unwrap();
    let second = service.build_query_vector(&query).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_index_unavailable_surfaces() {
    let index = Arc::new(RecordingIndex {
        unavailable: true,
        ..Default::default()
    });
    let service = service(index.clone(), Arc::new(MockEmbedder::new(2)));

    let err = service
        .resolve_and_search(&Query::single(Feature::text("flood")))
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
    assert!(!err.is_client_error());
    assert_eq!(index.location(), "mock://index");
}
