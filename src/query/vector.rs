//! Query vector construction
//!
//! Single-feature queries use the resolved vector as-is; the index scores
//! by cosine similarity, so no normalization is needed. Weighted queries
//! combine features as:
//!
//! ```text
//! normalize(mean(positive) - mean(negative))
//! ```
//!
//! The mean is unweighted: per-feature weights are carried on the request
//! but do not take part in the combination.

use crate::query::{Feature, FeatureResolver, QueryFeatures};
use crate::types::Vector;
use crate::{Error, Result};

/// Build the query vector for a feature block.
///
/// Weighted blocks are checked for an empty positive set before anything
/// is resolved, and resolution stops at the first failing feature.
pub async fn build(resolver: &FeatureResolver<'_>, features: &QueryFeatures) -> Result<Vector> {
    match features {
        QueryFeatures::Single(feature) => resolver.resolve(feature).await,
        QueryFeatures::Weighted { positive, negative } => {
            if positive.is_empty() {
                return Err(Error::EmptyPositiveSet);
            }
            let positive = resolve_all(resolver, positive).await?;
            let negative = resolve_all(resolver, negative).await?;
            combine(&positive, &negative)
        }
    }
}

async fn resolve_all(resolver: &FeatureResolver<'_>, features: &[Feature]) -> Result<Vec<Vector>> {
    let mut vectors = Vec::with_capacity(features.len());
    for feature in features {
        vectors.push(resolver.resolve(feature).await?);
    }
    Ok(vectors)
}

/// Combine resolved positive and negative vectors into a unit query vector.
pub fn combine(positive: &[Vector], negative: &[Vector]) -> Result<Vector> {
    if positive.is_empty() {
        return Err(Error::EmptyPositiveSet);
    }

    let mut combined = mean(positive)?;

    if !negative.is_empty() {
        let neg = mean(negative)?;
        if neg.len() != combined.len() {
            return Err(dimension_mismatch(combined.len(), neg.len()));
        }
        for (c, n) in combined.iter_mut().zip(neg.iter()) {
            *c -= n;
        }
    }

    Ok(normalize(combined))
}

/// Arithmetic mean of equally sized vectors
pub fn mean(vectors: &[Vector]) -> Result<Vector> {
    let first = vectors
        .first()
        .ok_or_else(|| Error::internal("mean of an empty vector set"))?;

    let mut sum = vec![0.0f32; first.len()];
    for v in vectors {
        if v.len() != sum.len() {
            return Err(dimension_mismatch(sum.len(), v.len()));
        }
        for (s, x) in sum.iter_mut().zip(v.iter()) {
            *s += x;
        }
    }

    let n = vectors.len() as f32;
    for s in sum.iter_mut() {
        *s /= n;
    }
    Ok(sum)
}

/// Scale to unit L2 norm. A zero vector is returned unchanged.
pub fn normalize(mut vector: Vector) -> Vector {
    let norm = l2_norm(&vector);
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
    vector
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dimension_mismatch(expected: usize, got: usize) -> Error {
    Error::InvalidQuery(format!(
        "Feature vector dimension mismatch: expected {}, got {}",
        expected, got
    ))
}
