//! Feature resolution
//!
//! Turns a single feature into a vector in the index's embedding space.

use crate::embedding::Embedder;
use crate::index::{Condition, Filter, VectorIndex};
use crate::query::Feature;
use crate::types::{Vector, IRI_FIELD};
use crate::{Error, Result};

/// Resolves features against the shared model and index handles
pub struct FeatureResolver<'a> {
    index: &'a dyn VectorIndex,
    embedder: &'a dyn Embedder,
    collection: &'a str,
}

impl<'a> FeatureResolver<'a> {
    pub fn new(index: &'a dyn VectorIndex, embedder: &'a dyn Embedder, collection: &'a str) -> Self {
        Self {
            index,
            embedder,
            collection,
        }
    }

    /// Resolve a feature. The feature's weight is not applied here.
    pub async fn resolve(&self, feature: &Feature) -> Result<Vector> {
        match feature {
            Feature::Text { value, .. } => self.embedder.encode(value).await,
            Feature::Node { value, .. } => self.stored_vector(value).await,
        }
    }

    /// Look up the stored vector of an indexed point by IRI.
    ///
    /// The stored vector is returned verbatim, never re-embedded.
    async fn stored_vector(&self, iri: &str) -> Result<Vector> {
        let filter = Filter::must([Condition::match_value(IRI_FIELD, iri)]);
        let points = self.index.scroll(self.collection, &filter, 1, true).await?;

        let point = points
            .into_iter()
            .next()
            .ok_or_else(|| Error::ReferenceNotFound(iri.to_string()))?;

        tracing::debug!(iri, id = %point.id, "Resolved node feature");

        point
            .vector
            .ok_or_else(|| Error::index(format!("point {} was returned without a vector", point.id)))
    }
}
