//! Query model and execution
//!
//! A query names what to look for (one feature, or a weighted set of
//! positive/negative features) and where to look (graph scope, pagination).

use serde::{Deserialize, Deserializer, Serialize};

use crate::Error;

pub mod executor;
pub mod filter;
pub mod resolver;
pub mod vector;

pub use executor::SearchService;
pub use filter::GraphFilter;
pub use resolver::FeatureResolver;

/// Wire tag of a free-text feature
pub const TEXT_FEATURE: &str = "text";

/// Wire tag of a reference to an indexed item
pub const NODE_FEATURE: &str = "node";

/// A single query term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFeature", into = "RawFeature")]
pub enum Feature {
    /// Free text, embedded with the model
    Text { value: String, weight: f32 },
    /// IRI of a point already present in the index
    Node { value: String, weight: f32 },
}

impl Feature {
    pub fn text(value: impl Into<String>) -> Self {
        Feature::Text {
            value: value.into(),
            weight: default_weight(),
        }
    }

    pub fn node(value: impl Into<String>) -> Self {
        Feature::Node {
            value: value.into(),
            weight: default_weight(),
        }
    }

    /// Build a feature from its wire tag.
    pub fn parse(kind: &str, value: impl Into<String>) -> crate::Result<Self> {
        let value = value.into();
        match kind {
            TEXT_FEATURE => Ok(Self::text(value)),
            NODE_FEATURE => Ok(Self::node(value)),
            other => Err(Error::UnsupportedFeatureType(other.to_string())),
        }
    }

    pub fn with_weight(self, weight: f32) -> Self {
        match self {
            Feature::Text { value, .. } => Feature::Text { value, weight },
            Feature::Node { value, .. } => Feature::Node { value, weight },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Feature::Text { .. } => TEXT_FEATURE,
            Feature::Node { .. } => NODE_FEATURE,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Feature::Text { value, .. } | Feature::Node { value, .. } => value,
        }
    }

    /// Carried through from the request. Not used when combining vectors.
    pub fn weight(&self) -> f32 {
        match self {
            Feature::Text { weight, .. } | Feature::Node { weight, .. } => *weight,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawFeature {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(default = "default_weight")]
    weight: f32,
}

impl TryFrom<RawFeature> for Feature {
    type Error = Error;

    fn try_from(raw: RawFeature) -> Result<Self, Self::Error> {
        Ok(Feature::parse(&raw.kind, raw.value)?.with_weight(raw.weight))
    }
}

impl From<Feature> for RawFeature {
    fn from(feature: Feature) -> Self {
        RawFeature {
            kind: feature.kind().to_string(),
            weight: feature.weight(),
            value: match feature {
                Feature::Text { value, .. } | Feature::Node { value, .. } => value,
            },
        }
    }
}

fn default_weight() -> f32 {
    1.0
}

/// Feature block of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFeatures {
    /// One feature, used as the query vector verbatim
    Single(Feature),
    /// Normalized mean of positives minus mean of negatives
    Weighted {
        positive: Vec<Feature>,
        negative: Vec<Feature>,
    },
}

impl QueryFeatures {
    pub fn len(&self) -> usize {
        match self {
            QueryFeatures::Single(_) => 1,
            QueryFeatures::Weighted { positive, negative } => positive.len() + negative.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Similarity query request
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawQuery")]
pub struct Query {
    pub features: QueryFeatures,
    pub include_graphs: Vec<String>,
    pub exclude_graphs: Vec<String>,
    pub limit: usize,
    pub offset: usize,
}

impl Query {
    pub fn single(feature: Feature) -> Self {
        Self::with_features(QueryFeatures::Single(feature))
    }

    pub fn weighted(positive: Vec<Feature>, negative: Vec<Feature>) -> Self {
        Self::with_features(QueryFeatures::Weighted { positive, negative })
    }

    fn with_features(features: QueryFeatures) -> Self {
        Self {
            features,
            include_graphs: Vec::new(),
            exclude_graphs: Vec::new(),
            limit: default_limit(),
            offset: 0,
        }
    }

    pub fn include_graphs<I, S>(mut self, graphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_graphs = graphs.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclude_graphs<I, S>(mut self, graphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_graphs = graphs.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

fn default_limit() -> usize {
    10
}

#[derive(Deserialize)]
struct RawQuery {
    #[serde(default)]
    feature: Option<Feature>,
    #[serde(default)]
    positive: Option<Vec<Feature>>,
    #[serde(default)]
    negative: Option<Vec<Feature>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    include_graphs: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    exclude_graphs: Vec<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

impl TryFrom<RawQuery> for Query {
    type Error = Error;

    fn try_from(raw: RawQuery) -> Result<Self, Self::Error> {
        let features = match (raw.feature, raw.positive, raw.negative) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
                return Err(Error::InvalidQuery(
                    "'feature' cannot be combined with 'positive'/'negative'".to_string(),
                ))
            }
            (Some(feature), None, None) => QueryFeatures::Single(feature),
            (None, positive, negative) => QueryFeatures::Weighted {
                positive: positive.unwrap_or_default(),
                negative: negative.unwrap_or_default(),
            },
        };

        Ok(Query {
            features,
            include_graphs: raw.include_graphs,
            exclude_graphs: raw.exclude_graphs,
            limit: raw.limit,
            offset: raw.offset,
        })
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
