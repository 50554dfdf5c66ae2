//! frink-embeddings - semantic similarity search over graph-partitioned vector indexes
//!
//! Queries are expressed as free text, as references to already indexed
//! items, or as weighted positive/negative combinations of both, and can be
//! scoped to or away from named graphs:
//! - Feature resolution against an embedding model or the index itself
//! - Query vector construction (single feature or normalized mean difference)
//! - Graph-scoped filtered nearest-neighbor search
//! - A TTL-cached graph catalog
//! - Recall diagnostics comparing exact and approximate search

pub mod api;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod graphs;
pub mod index;
pub mod query;
pub mod types;

pub use error::{Error, Result};
