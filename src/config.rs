use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use serde::Deserialize;

use crate::graphs::CatalogConfig;
use crate::index::SearchParams;

const DEFAULT_HNSW_EF: usize = 128;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CATALOG_TTL_SECS: u64 = 300;
const HASHING_MODEL: &str = "hashing";

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub index: IndexSection,
    pub model: ModelSection,
    pub graphs: GraphsSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    pub fn load() -> Result<Self> {
        let config_path = env::var("FRINK_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(Path::new(&config_path), None)
    }

    /// Load from `path` (if it exists) overlaid by `FRINK_SECTION__KEY`
    /// variables. `env` replaces the process environment when given.
    pub fn load_from(path: &Path, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if path.exists() {
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("FRINK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let settings = builder.build()?;
        let mut config: Self = settings.try_deserialize()?;

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no index or model could be built from.
    pub fn validate(&self) -> Result<()> {
        if self.index.location.trim().is_empty() {
            bail!("index.location must be specified");
        }
        if self.index.collection.trim().is_empty() {
            bail!("index.collection must be specified");
        }
        if self.index.timeout_secs == 0 {
            bail!("index.timeout_secs must be positive");
        }
        if self.model.dimension == 0 {
            bail!("model.dimension must be positive");
        }
        if self.model.backend().is_none() {
            bail!(
                "model.name must be \"{}\" or a HuggingFace repository id, got \"{}\"",
                HASHING_MODEL,
                self.model.name
            );
        }
        if self.graphs.limit == 0 {
            bail!("graphs.limit must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexSection {
    /// Qdrant URL (`http(s)://`) or path of a JSON-lines point file
    pub location: String,
    pub collection: String,
    pub hnsw_ef: Option<usize>,
    pub timeout_secs: u64,
}

impl IndexSection {
    /// Whether the location names a Qdrant server
    pub fn is_remote(&self) -> bool {
        let location = self.location.trim();
        location.starts_with("http://") || location.starts_with("https://")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Accuracy parameters used for serving
    pub fn search_params(&self) -> SearchParams {
        SearchParams::approximate(self.hnsw_ef)
    }
}

impl Default for IndexSection {
    fn default() -> Self {
        Self {
            location: "./data/points.jsonl".to_string(),
            collection: "frink".to_string(),
            hnsw_ef: Some(DEFAULT_HNSW_EF),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// `"hashing"` or a HuggingFace repository id such as
    /// `sentence-transformers/all-MiniLM-L6-v2`
    pub name: String,
    pub dimension: usize,
}

/// Embedder selected by `model.name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelBackend {
    Hashing,
    Pretrained(String),
}

impl ModelSection {
    pub fn backend(&self) -> Option<ModelBackend> {
        let name = self.name.trim();
        if name == HASHING_MODEL {
            return Some(ModelBackend::Hashing);
        }
        let (owner, model) = name.split_once('/')?;
        let valid = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        (valid(owner) && valid(model)).then(|| ModelBackend::Pretrained(name.to_string()))
    }
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            name: "hashing".to_string(),
            dimension: 384,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphsSection {
    pub ttl_secs: u64,
    pub limit: usize,
    pub snapshot_path: Option<String>,
}

impl GraphsSection {
    pub fn catalog_config(&self) -> CatalogConfig {
        CatalogConfig {
            ttl: chrono::Duration::seconds(self.ttl_secs as i64),
            limit: self.limit,
            snapshot_path: self.snapshot_path.as_ref().map(PathBuf::from),
        }
    }
}

impl Default for GraphsSection {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CATALOG_TTL_SECS,
            limit: 100,
            snapshot_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}
