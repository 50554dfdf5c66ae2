//! Transport timeout for index calls

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::index::{Filter, SearchRequest, VectorIndex};
use crate::types::{ScoredPoint, StoredPoint};
use crate::{Error, Result};

/// Wraps an index so every call fails with `IndexUnavailable` once the
/// configured timeout elapses. Calls are never retried.
pub struct TimeoutIndex {
    inner: Arc<dyn VectorIndex>,
    timeout: Duration,
}

impl TimeoutIndex {
    pub fn new(inner: Arc<dyn VectorIndex>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn run<T>(&self, op: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    location = %self.inner.location(),
                    op,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Index call timed out"
                );
                Err(Error::unavailable(format!(
                    "{} timed out after {:?}",
                    op, self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl VectorIndex for TimeoutIndex {
    fn location(&self) -> &str {
        self.inner.location()
    }

    async fn search(&self, collection: &str, request: SearchRequest) -> Result<Vec<ScoredPoint>> {
        self.run("search", self.inner.search(collection, request))
            .await
    }

    async fn scroll(
        &self,
        collection: &str,
        filter: &Filter,
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>> {
        self.run(
            "scroll",
            self.inner.scroll(collection, filter, limit, with_vectors),
        )
        .await
    }

    async fn facet(&self, collection: &str, field: &str, limit: usize) -> Result<Vec<String>> {
        self.run("facet", self.inner.facet(collection, field, limit))
            .await
    }
}
