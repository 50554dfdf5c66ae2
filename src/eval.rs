//! Search quality evaluation
//!
//! For each (graph, term) pair the same text query is run three ways:
//! exact search inside the graph, approximate search inside the graph, and
//! approximate search over the whole index. The exact in-graph results are
//! the reference set.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use crate::index::SearchParams;
use crate::query::{Feature, Query, SearchService};
use crate::types::ScoredPoint;
use crate::Result;

/// Query set: graph name -> terms
#[derive(Debug, Clone, Deserialize, Default)]
pub struct EvalConfig {
    pub queries: BTreeMap<String, Vec<String>>,
}

impl EvalConfig {
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_toml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn len(&self) -> usize {
        self.queries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Identifiers of results that carry one
pub fn point_ids(results: &[ScoredPoint]) -> Vec<&str> {
    results.iter().filter_map(ScoredPoint::iri).collect()
}

/// Fraction of `reference` identifiers also found in `candidate`, and
/// the overlap count. Recall over an empty reference set is 0.0.
pub fn recall_at_k(reference: &[ScoredPoint], candidate: &[ScoredPoint]) -> (f64, usize) {
    let reference_ids: HashSet<&str> = point_ids(reference).into_iter().collect();
    let candidate_ids: HashSet<&str> = point_ids(candidate).into_iter().collect();

    let overlap = reference_ids.intersection(&candidate_ids).count();
    if reference_ids.is_empty() {
        return (0.0, overlap);
    }
    (overlap as f64 / reference_ids.len() as f64, overlap)
}

/// Observed score range of a result set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f32,
    pub max: f32,
}

impl ScoreRange {
    pub fn of(results: &[ScoredPoint]) -> Option<Self> {
        let first = results.first()?.score;
        Some(results.iter().fold(
            ScoreRange {
                min: first,
                max: first,
            },
            |r, p| ScoreRange {
                min: r.min.min(p.score),
                max: r.max.max(p.score),
            },
        ))
    }
}

impl fmt::Display for ScoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} to {:.2}", self.min, self.max)
    }
}

/// Reference points scoring above the lowest retained global score yet
/// missing from the global results.
///
/// With no global results at all, every identified reference point is
/// missed.
pub fn missed_points(reference: &[ScoredPoint], global: &[ScoredPoint]) -> usize {
    let global_ids: HashSet<&str> = point_ids(global).into_iter().collect();
    let global_min = ScoreRange::of(global).map(|r| r.min);

    reference
        .iter()
        .filter_map(|p| p.iri().map(|iri| (iri, p.score)))
        .filter(|(iri, score)| {
            global_min.map_or(true, |min| *score > min) && !global_ids.contains(iri)
        })
        .count()
}

/// Diagnostics for one (graph, term) pair
#[derive(Debug, Clone)]
pub struct TermReport {
    pub graph: String,
    pub term: String,
    pub limit: usize,
    /// In-graph approximate vs in-graph exact
    pub recall: f64,
    pub overlap: usize,
    /// Global approximate vs in-graph exact
    pub recall_global: f64,
    pub overlap_global: usize,
    pub exact_range: Option<ScoreRange>,
    pub approx_range: Option<ScoreRange>,
    pub global_range: Option<ScoreRange>,
    pub missed: usize,
}

impl fmt::Display for TermReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn range(r: &Option<ScoreRange>) -> String {
            r.map_or_else(|| "no results".to_string(), |r| r.to_string())
        }

        writeln!(f, "query '{}' in graph '{}'", self.term, self.graph)?;
        writeln!(
            f,
            "recall@{} for in-graph ANN results: {} ({} overlapping)",
            self.limit, self.recall, self.overlap
        )?;
        writeln!(
            f,
            "recall@{} for all-graph ANN results: {} ({} overlapping)",
            self.limit, self.recall_global, self.overlap_global
        )?;
        writeln!(f, "Cosine similarity ranges:")?;
        writeln!(f, "  KNN:      {}", range(&self.exact_range))?;
        writeln!(f, "  ANN:      {}", range(&self.approx_range))?;
        writeln!(f, "  Full ANN: {}", range(&self.global_range))?;
        write!(f, "missed points in full ANN: {}", self.missed)
    }
}

/// A (graph, term) pair whose searches failed
#[derive(Debug, Clone)]
pub struct EvalFailure {
    pub graph: String,
    pub term: String,
    pub error: String,
}

/// Outcome of a whole evaluation run
#[derive(Debug, Default)]
pub struct EvalSummary {
    pub reports: Vec<TermReport>,
    pub failures: Vec<EvalFailure>,
}

/// Runs recall diagnostics against a search service
pub struct Evaluator<'a> {
    service: &'a SearchService,
    limit: usize,
    hnsw_ef: Option<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(service: &'a SearchService, limit: usize) -> Self {
        Self {
            service,
            limit,
            hnsw_ef: service.default_params().hnsw_ef,
        }
    }

    pub fn with_hnsw_ef(mut self, hnsw_ef: Option<usize>) -> Self {
        self.hnsw_ef = hnsw_ef;
        self
    }

    /// Evaluate one term
    pub async fn evaluate_term(&self, graph: &str, term: &str) -> Result<TermReport> {
        let scoped = Query::single(Feature::text(term))
            .include_graphs([graph])
            .limit(self.limit);
        let unscoped = Query::single(Feature::text(term)).limit(self.limit);

        let exact = self
            .service
            .resolve_and_search_with(&scoped, SearchParams::exact(self.hnsw_ef))
            .await?;
        let approx = self
            .service
            .resolve_and_search_with(&scoped, SearchParams::approximate(self.hnsw_ef))
            .await?;
        let global = self
            .service
            .resolve_and_search_with(&unscoped, SearchParams::approximate(self.hnsw_ef))
            .await?;

        let (recall, overlap) = recall_at_k(&exact, &approx);
        let (recall_global, overlap_global) = recall_at_k(&exact, &global);

        Ok(TermReport {
            graph: graph.to_string(),
            term: term.to_string(),
            limit: self.limit,
            recall,
            overlap,
            recall_global,
            overlap_global,
            exact_range: ScoreRange::of(&exact),
            approx_range: ScoreRange::of(&approx),
            global_range: ScoreRange::of(&global),
            missed: missed_points(&exact, &global),
        })
    }

    /// Evaluate every pair; failures are logged and collected, never fatal.
    pub async fn run(&self, config: &EvalConfig) -> EvalSummary {
        let mut summary = EvalSummary::default();

        for (graph, terms) in &config.queries {
            for term in terms {
                tracing::info!(graph = %graph, term = %term, "Evaluating query");
                match self.evaluate_term(graph, term).await {
                    Ok(report) => summary.reports.push(report),
                    Err(err) => {
                        tracing::warn!(
                            graph = %graph,
                            term = %term,
                            error = %err,
                            kind = err.kind(),
                            "Evaluation query failed"
                        );
                        summary.failures.push(EvalFailure {
                            graph: graph.clone(),
                            term: term.clone(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }

        summary
    }
}

