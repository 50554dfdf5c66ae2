//! BERT sentence embedder running locally on Candle

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::api::tokio::Api;
use hf_hub::{Repo, RepoType};
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::embedding::Embedder;
use crate::types::Vector;
use crate::{Error, Result};

const MAX_TOKENS: usize = 512;

struct Model {
    bert: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

/// Sentence-transformers style embedder: BERT token embeddings mean-pooled
/// over the attention mask. Output is not normalized.
pub struct CandleEmbedder {
    name: String,
    dimension: usize,
    model: Arc<Model>,
}

fn model_err(context: &str) -> impl Fn(candle_core::Error) -> Error + '_ {
    move |e| Error::Embedding(format!("{}: {}", context, e))
}

impl CandleEmbedder {
    /// Fetch `repo_id` from the HuggingFace hub (or its local cache) and load it.
    pub async fn load(repo_id: &str) -> Result<Self> {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);

        let api = Api::new().map_err(|e| Error::Embedding(format!("HF hub: {}", e)))?;
        let repo = api.repo(Repo::new(repo_id.to_string(), RepoType::Model));

        let mut files = Vec::with_capacity(3);
        for file in ["config.json", "tokenizer.json", "model.safetensors"] {
            let path = repo
                .get(file)
                .await
                .map_err(|e| Error::Embedding(format!("failed to fetch {}: {}", file, e)))?;
            files.push(path);
        }

        let config: Config = serde_json::from_str(&tokio::fs::read_to_string(&files[0]).await?)?;
        let mut tokenizer = Tokenizer::from_file(&files[1])
            .map_err(|e| Error::Embedding(format!("failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| Error::Embedding(format!("failed to configure tokenizer: {}", e)))?;

        // SAFETY: weights are memory-mapped read-only from the hub cache.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&files[2]], DType::F32, &device)
                .map_err(model_err("failed to map weights"))?
        };
        let bert = BertModel::load(vb, &config).map_err(model_err("failed to load model"))?;

        tracing::info!(
            model = repo_id,
            dimension = config.hidden_size,
            device = ?device,
            "Embedding model loaded"
        );

        Ok(Self {
            name: repo_id.to_string(),
            dimension: config.hidden_size,
            model: Arc::new(Model {
                bert,
                tokenizer,
                device,
            }),
        })
    }
}

impl Model {
    fn encode(&self, text: &str) -> Result<Vector> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::Embedding(format!("tokenization failed: {}", e)))?;

        let ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(model_err("input ids"))?;
        let mask = Tensor::new(encoding.get_attention_mask(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(model_err("attention mask"))?;
        let token_types = ids.zeros_like().map_err(model_err("token types"))?;

        let hidden = self
            .bert
            .forward(&ids, &token_types, Some(&mask))
            .map_err(model_err("forward pass"))?;

        mean_pool(&hidden, &mask)
            .and_then(|pooled| pooled.squeeze(0))
            .and_then(|pooled| pooled.to_vec1::<f32>())
            .map_err(model_err("pooling"))
    }
}

fn mean_pool(hidden: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask = mask
        .unsqueeze(2)?
        .broadcast_as(hidden.shape())?
        .to_dtype(DType::F32)?;
    let sum = hidden.mul(&mask)?.sum(1)?;
    let count = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    sum.div(&count)
}

#[async_trait]
impl Embedder for CandleEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode(&self, text: &str) -> Result<Vector> {
        let model = self.model.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || model.encode(&text))
            .await
            .map_err(|e| Error::internal(format!("embedding task failed: {}", e)))?
    }
}
