//! Graph scoping
//!
//! Restricts a search to, or excludes it from, a set of graphs. Graph
//! names are passed to the index as given; they are not checked against
//! the graph catalog.

use std::collections::BTreeSet;

use crate::index::{Condition, Filter};
use crate::types::GRAPH_FIELD;
use crate::{Error, Result};

/// Graph scope of a search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GraphFilter {
    /// Unfiltered search
    #[default]
    None,
    /// Point's graph is in the set
    Include(BTreeSet<String>),
    /// Point's graph is not in the set
    Exclude(BTreeSet<String>),
}

impl GraphFilter {
    /// Build the scope from include/exclude lists.
    ///
    /// Supplying both is rejected.
    pub fn build(include_graphs: &[String], exclude_graphs: &[String]) -> Result<Self> {
        match (include_graphs.is_empty(), exclude_graphs.is_empty()) {
            (false, false) => Err(Error::ConflictingGraphScope),
            (false, true) => Ok(GraphFilter::Include(include_graphs.iter().cloned().collect())),
            (true, false) => Ok(GraphFilter::Exclude(exclude_graphs.iter().cloned().collect())),
            (true, true) => Ok(GraphFilter::None),
        }
    }

    pub fn include<I, S>(graphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GraphFilter::Include(graphs.into_iter().map(Into::into).collect())
    }

    pub fn exclude<I, S>(graphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GraphFilter::Exclude(graphs.into_iter().map(Into::into).collect())
    }

    /// Index filter for this scope, `None` when unscoped
    pub fn to_filter(&self) -> Option<Filter> {
        match self {
            GraphFilter::None => None,
            GraphFilter::Include(graphs) => Some(Filter::must([Condition::match_any(
                GRAPH_FIELD,
                graphs.iter().cloned(),
            )])),
            GraphFilter::Exclude(graphs) => Some(Filter::must_not([Condition::match_any(
                GRAPH_FIELD,
                graphs.iter().cloned(),
            )])),
        }
    }

    /// Whether a point tagged with `graph` falls inside the scope
    pub fn matches(&self, graph: Option<&str>) -> bool {
        match self {
            GraphFilter::None => true,
            GraphFilter::Include(graphs) => graph.is_some_and(|g| graphs.contains(g)),
            GraphFilter::Exclude(graphs) => graph.map_or(true, |g| !graphs.contains(g)),
        }
    }
}
