//! Similarity search orchestration

use std::sync::Arc;

use crate::embedding::Embedder;
use crate::index::{SearchParams, SearchRequest, VectorIndex};
use crate::query::{vector, FeatureResolver, GraphFilter, Query};
use crate::types::{ScoredPoint, Vector};
use crate::{Error, Result};

/// Resolves queries into vectors and runs them against the index.
///
/// Holds the process-wide model and index handles; cheap to share behind
/// an `Arc` across concurrent requests.
pub struct SearchService {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    collection: String,
    default_params: SearchParams,
}

impl SearchService {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        collection: impl Into<String>,
        default_params: SearchParams,
    ) -> Self {
        Self {
            index,
            embedder,
            collection: collection.into(),
            default_params,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn default_params(&self) -> SearchParams {
        self.default_params
    }

    fn resolver(&self) -> FeatureResolver<'_> {
        FeatureResolver::new(self.index.as_ref(), self.embedder.as_ref(), &self.collection)
    }

    /// Build the query vector for a query's feature block
    pub async fn build_query_vector(&self, query: &Query) -> Result<Vector> {
        vector::build(&self.resolver(), &query.features).await
    }

    /// Resolve and search with the configured accuracy parameters
    pub async fn resolve_and_search(&self, query: &Query) -> Result<Vec<ScoredPoint>> {
        self.resolve_and_search_with(query, self.default_params)
            .await
    }

    /// Resolve and search with explicit accuracy parameters.
    ///
    /// The query is validated before the model or index is touched.
    pub async fn resolve_and_search_with(
        &self,
        query: &Query,
        params: SearchParams,
    ) -> Result<Vec<ScoredPoint>> {
        if query.limit == 0 {
            return Err(Error::InvalidQuery("limit must be at least 1".to_string()));
        }
        let filter = GraphFilter::build(&query.include_graphs, &query.exclude_graphs)?;
        let vector = self.build_query_vector(query).await?;

        self.search(vector, &filter, query.limit, query.offset, params)
            .await
    }

    /// Run a nearest-neighbor search for a prepared vector.
    ///
    /// Returns at most `limit` results starting at `offset`, by descending
    /// score, each with its payload.
    pub async fn search(
        &self,
        vector: Vector,
        filter: &GraphFilter,
        limit: usize,
        offset: usize,
        params: SearchParams,
    ) -> Result<Vec<ScoredPoint>> {
        let request = SearchRequest {
            vector,
            filter: filter.to_filter(),
            limit,
            offset,
            params,
            with_payload: true,
        };

        let mut results = self.index.search(&self.collection, request).await?;
        results.truncate(limit);

        tracing::debug!(
            collection = %self.collection,
            limit,
            offset,
            exact = params.exact,
            hnsw_ef = ?params.hnsw_ef,
            results = results.len(),
            "Similarity search complete"
        );

        Ok(results)
    }
}
