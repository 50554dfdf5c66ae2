//! Command-line tooling for frink-embeddings

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use frink_embeddings::config::AppConfig;
use frink_embeddings::context::AppContext;
use frink_embeddings::eval::{EvalConfig, Evaluator};
use frink_embeddings::graphs::GraphCatalog;
use frink_embeddings::index::SearchParams;
use frink_embeddings::query::{Feature, Query, NODE_FEATURE, TEXT_FEATURE};
use frink_embeddings::types::Payload;

/// Batch tools use a longer transport timeout than the server
const CLI_TIMEOUT_SECS: u64 = 60;

#[derive(Parser, Debug)]
#[command(name = "frink-cli", author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single similarity search and print JSON results
    Search {
        /// Search term, or an IRI with --node
        term: String,
        /// Restrict to one graph
        #[arg(long)]
        graph: Option<String>,
        /// Treat the term as the IRI of an indexed item
        #[arg(long)]
        node: bool,
        /// Exhaustive instead of approximate search
        #[arg(long)]
        exact: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Measure recall of approximate and unscoped search
    Eval {
        /// TOML file with a [queries] table of graph = [terms]
        queries: PathBuf,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Print the graph catalog
    Graphs {
        /// Query the index instead of reading the snapshot
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Serialize)]
struct SearchHit<'a> {
    score: f32,
    payload: &'a Payload,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().context("failed to load configuration")?;
    config.index.timeout_secs = CLI_TIMEOUT_SECS;

    match cli.command {
        Command::Search {
            term,
            graph,
            node,
            exact,
            limit,
        } => {
            let ctx = AppContext::from_config(&config).await?;
            let kind = if node { NODE_FEATURE } else { TEXT_FEATURE };
            let mut query = Query::single(Feature::parse(kind, term)?).limit(limit);
            if let Some(graph) = graph {
                query = query.include_graphs([graph]);
            }

            let params = SearchParams {
                hnsw_ef: config.index.hnsw_ef,
                exact,
            };
            let results = ctx.service.resolve_and_search_with(&query, params).await?;

            let hits: Vec<SearchHit<'_>> = results
                .iter()
                .filter(|p| !p.payload.is_empty())
                .map(|p| SearchHit {
                    score: p.score,
                    payload: &p.payload,
                })
                .collect();
            println!("{}", serde_json::to_string(&hits)?);
        }
        Command::Eval { queries, limit } => {
            let eval_config = EvalConfig::from_toml(&queries)
                .with_context(|| format!("failed to read {}", queries.display()))?;
            let ctx = AppContext::from_config(&config).await?;

            let summary = Evaluator::new(&ctx.service, limit).run(&eval_config).await;
            for report in &summary.reports {
                println!("{}\n", report);
            }
            for failure in &summary.failures {
                eprintln!(
                    "failed: query '{}' in graph '{}': {}",
                    failure.term, failure.graph, failure.error
                );
            }

            if !eval_config.is_empty() && summary.reports.is_empty() {
                bail!("all {} evaluation queries failed", summary.failures.len());
            }
        }
        Command::Graphs { refresh } => {
            let snapshot = config.graphs.snapshot_path.clone();
            let graphs = match snapshot {
                Some(path) if !refresh && std::path::Path::new(&path).exists() => {
                    GraphCatalog::read_snapshot(path)
                }
                _ => {
                    let ctx = AppContext::from_config(&config).await?;
                    ctx.catalog.refresh().await?
                }
            };
            for graph in graphs {
                println!("{}", graph);
            }
        }
    }

    Ok(())
}
