//! Embedding providers: local fastembed models, an Azure OpenAI embeddings
//! deployment, and a dependency-free hashing embedder for offline runs.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ProviderError, ProviderResult};

/// Maps text to a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the model, recorded in rule cache fingerprints.
    fn model_id(&self) -> &str;

    /// Embed several texts; output order matches input order.
    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>>;

    /// Embed one text.
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Embedding("No embedding generated".to_string()))
    }
}

/// Parse a fastembed model name as written in settings.
pub fn parse_model_name(name: &str) -> Option<EmbeddingModel> {
    match name {
        "AllMiniLML6V2" => Some(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML12V2" => Some(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Some(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Some(EmbeddingModel::BGEBaseENV15),
        "MultilingualE5Small" => Some(EmbeddingModel::MultilingualE5Small),
        "NomicEmbedTextV15" => Some(EmbeddingModel::NomicEmbedTextV15),
        _ => None,
    }
}

/// Local ONNX embedding model via fastembed.
///
/// Inference is CPU bound and runs on the blocking thread pool.
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimensions: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model_name", &self.model_name)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl FastEmbedProvider {
    /// Load `model_name`, downloading it into `cache_dir` on first use.
    pub fn new(
        model_name: &str,
        cache_dir: Option<PathBuf>,
        show_progress: bool,
    ) -> ProviderResult<Self> {
        let model = parse_model_name(model_name).ok_or_else(|| {
            ProviderError::Config(format!("unknown embedding model '{model_name}'"))
        })?;

        let mut options = InitOptions::new(model).with_show_download_progress(show_progress);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let mut text_model = TextEmbedding::try_new(options).map_err(|e| {
            ProviderError::Embedding(format!("Failed to initialize embedding model: {e}"))
        })?;

        // Get dimensions by generating a test embedding
        let dimensions = text_model
            .embed(vec!["test"], None)
            .map_err(|e| ProviderError::Embedding(e.to_string()))?
            .into_iter()
            .next()
            .map(|v| v.len())
            .ok_or_else(|| ProviderError::Embedding("No embedding generated".to_string()))?;

        tracing::info!(target: "semantic", "loaded {model_name} ({dimensions} dimensions)");

        Ok(Self {
            model: Arc::new(Mutex::new(text_model)),
            model_name: model_name.to_string(),
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn model_id(&self) -> &str {
        &self.model_name
    }

    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let owned = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| ProviderError::Embedding("embedding model lock poisoned".to_string()))?;
            guard
                .embed(owned, None)
                .map_err(|e| ProviderError::Embedding(e.to_string()))
        })
        .await
        .map_err(|e| ProviderError::Embedding(format!("embedding task failed: {e}")))?
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Azure OpenAI embeddings deployment.
#[derive(Debug, Clone)]
pub struct AzureEmbeddingProvider {
    client: Client,
    url: String,
    api_key: String,
    deployment: String,
    timeout: Duration,
}

impl AzureEmbeddingProvider {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        api_version: &str,
        deployment: &str,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        if endpoint.is_empty() || api_key.is_empty() {
            return Err(ProviderError::Config(
                "Azure embeddings need an endpoint and an API key".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Config(format!("cannot build HTTP client: {e}")))?;

        let url = format!(
            "{}/openai/deployments/{deployment}/embeddings?api-version={api_version}",
            endpoint.trim_end_matches('/')
        );

        Ok(Self {
            client,
            url,
            api_key: api_key.to_string(),
            deployment: deployment.to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for AzureEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.deployment
    }

    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&EmbeddingsRequest { input: texts })
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest("embeddings", self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                service: "embeddings",
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Protocol {
                service: "embeddings",
                reason: e.to_string(),
            })?;

        if parsed.data.len() != texts.len() {
            return Err(ProviderError::Protocol {
                service: "embeddings",
                reason: format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.data.len()
                ),
            });
        }

        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

/// Bag-of-words feature hashing into a fixed number of buckets.
///
/// Needs no model download; similarity reflects shared vocabulary only.
/// Bucket assignment uses SHA-256 so vectors are stable across builds and
/// can be persisted in the rule cache.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
    model_id: String,
}

impl HashingEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model_id: format!("hashing-{dimensions}"),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bytes) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed_batch(&self, texts: &[String]) -> ProviderResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
