//! Process-wide handles
//!
//! The model, the index connection and the graph catalog are created once
//! at startup and shared by every request.

use std::sync::Arc;

use anyhow::{bail, Context};

use crate::config::{AppConfig, ModelBackend};
use crate::embedding::{Embedder, HashingEmbedder};
use crate::graphs::GraphCatalog;
use crate::index::{MemoryIndex, QdrantIndex, TimeoutIndex, VectorIndex};
use crate::query::SearchService;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub service: Arc<SearchService>,
    pub catalog: Arc<GraphCatalog>,
}

impl AppContext {
    /// Assemble a context from already constructed collaborators
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        config: &AppConfig,
    ) -> Self {
        let service = Arc::new(SearchService::new(
            index.clone(),
            embedder,
            config.index.collection.clone(),
            config.index.search_params(),
        ));
        let catalog = Arc::new(GraphCatalog::new(
            index,
            config.index.collection.clone(),
            config.graphs.catalog_config(),
        ));
        Self { service, catalog }
    }

    /// Connect to the index and load the model named by the configuration
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let index = Self::open_index(config)?;
        let index: Arc<dyn VectorIndex> = Arc::new(TimeoutIndex::new(index, config.index.timeout()));

        let embedder = Self::load_embedder(config).await?;
        if embedder.dimension() != config.model.dimension {
            bail!(
                "model {} produces {}-dimensional vectors, configured dimension is {}",
                embedder.model_name(),
                embedder.dimension(),
                config.model.dimension
            );
        }

        tracing::info!(
            location = %config.index.location,
            collection = %config.index.collection,
            model = %config.model.name,
            dimension = config.model.dimension,
            "Search context initialised"
        );

        Ok(Self::new(index, embedder, config))
    }

    fn open_index(config: &AppConfig) -> anyhow::Result<Arc<dyn VectorIndex>> {
        let location = config.index.location.trim();
        if config.index.is_remote() {
            let index = QdrantIndex::connect(location, config.index.timeout())
                .with_context(|| format!("failed to create Qdrant client for {}", location))?;
            return Ok(Arc::new(index));
        }

        let index = MemoryIndex::from_jsonl(location, &config.index.collection)
            .with_context(|| format!("failed to load index from {}", location))?;
        Ok(Arc::new(index))
    }

    async fn load_embedder(config: &AppConfig) -> anyhow::Result<Arc<dyn Embedder>> {
        match config.model.backend() {
            Some(ModelBackend::Hashing) => {
                let embedder = HashingEmbedder::named(config.model.name.clone(), config.model.dimension)
                    .context("failed to initialise embedding model")?;
                Ok(Arc::new(embedder))
            }
            Some(ModelBackend::Pretrained(repo_id)) => Self::load_pretrained(&repo_id).await,
            None => bail!("unknown embedding model {}", config.model.name),
        }
    }

    #[cfg(feature = "candle")]
    async fn load_pretrained(repo_id: &str) -> anyhow::Result<Arc<dyn Embedder>> {
        let embedder = crate::embedding::candle::CandleEmbedder::load(repo_id)
            .await
            .with_context(|| format!("failed to load embedding model {}", repo_id))?;
        Ok(Arc::new(embedder))
    }

    #[cfg(not(feature = "candle"))]
    async fn load_pretrained(repo_id: &str) -> anyhow::Result<Arc<dyn Embedder>> {
        bail!(
            "model {} requires building with the `candle` feature",
            repo_id
        )
    }
}
