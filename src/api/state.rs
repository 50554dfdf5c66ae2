//! API server state

use std::sync::Arc;

use crate::context::AppContext;
use crate::graphs::GraphCatalog;
use crate::query::SearchService;

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Query resolution and search
    pub service: Arc<SearchService>,

    /// Cached graph labels
    pub catalog: Arc<GraphCatalog>,
}

impl AppState {
    pub fn new(service: Arc<SearchService>, catalog: Arc<GraphCatalog>) -> Self {
        Self { service, catalog }
    }
}

impl From<AppContext> for AppState {
    fn from(ctx: AppContext) -> Self {
        Self::new(ctx.service, ctx.catalog)
    }
}
