//! tutor-embed
//!
//! Embedding providers behind the `tutor_core::traits::Embedder` seam: an
//! OpenAI-compatible HTTP client and a deterministic hashing embedder for
//! tests and offline development (`APP_USE_FAKE_EMBEDDINGS=1`).

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tutor_core::config::EmbeddingSettings;
use tutor_core::error::Error;
use tutor_core::traits::Embedder;

pub const FAKE_EMBEDDING_DIM: usize = 256;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Client for any OpenAI-compatible `/embeddings` endpoint.
///
/// Every fault is reported as `Error::Upstream`; a failed call never yields
/// a placeholder vector.
pub struct HttpEmbedder {
    client: Client,
    settings: EmbeddingSettings,
    dim: OnceLock<usize>,
}

impl HttpEmbedder {
    pub fn new(settings: EmbeddingSettings) -> tutor_core::error::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let api_key = settings.api_key.clone().or_else(|| std::env::var("OPENAI_API_KEY").ok());
        match &api_key {
            Some(key) => {
                let value = HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| Error::InvalidConfig(format!("invalid API key format: {}", e)))?;
                headers.insert(AUTHORIZATION, value);
            }
            None => warn!(endpoint = %settings.endpoint, "no embedding API key configured"),
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        let dim = OnceLock::new();
        if let Some(d) = settings.dimensions {
            let _ = dim.set(d);
        }
        info!(endpoint = %settings.endpoint, model = %settings.model, "HTTP embedder ready");
        Ok(Self { client, settings, dim })
    }

    fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.settings.model,
            input: texts.iter().map(String::as_str).collect(),
            dimensions: self.settings.dimensions,
            encoding_format: "float",
        };
        debug!(endpoint = %self.settings.endpoint, texts = texts.len(), "embedding request");

        let response = self
            .client
            .post(&self.settings.endpoint)
            .json(&request)
            .send()
            .map_err(|e| Error::Upstream(format!("request to {} failed: {}", self.settings.endpoint, e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::Upstream(format!("failed to read embedding response: {}", e)))?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body).map(|r| r.error.message).unwrap_or(body);
            return Err(Error::Upstream(format!("embedding endpoint returned {}: {}", status, message)).into());
        }

        let mut parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Upstream(format!("malformed embedding response: {}", e)))?;
        if parsed.data.len() != texts.len() {
            return Err(Error::Upstream(format!("embedder returned {} vectors for {} inputs", parsed.data.len(), texts.len())).into());
        }
        parsed.data.sort_by_key(|d| d.index);

        let mut out = Vec::with_capacity(parsed.data.len());
        for item in parsed.data {
            let expected = *self.dim.get_or_init(|| item.embedding.len());
            if item.embedding.is_empty() || item.embedding.len() != expected {
                return Err(Error::Upstream(format!("dim mismatch: got {} expected {}", item.embedding.len(), expected)).into());
            }
            out.push(item.embedding);
        }
        Ok(out)
    }
}

impl Embedder for HttpEmbedder {
    /// Zero until configured or learned from the first response.
    fn dim(&self) -> usize { self.dim.get().copied().unwrap_or(0) }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.settings.batch_size.max(1)) {
            out.extend(self.request(batch)?);
        }
        Ok(out)
    }
}

/// Hashed bag-of-words vectors: deterministic, L2-normalised, no network.
pub struct FakeEmbedder { dim: usize }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            v[idx] += 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if use_fake_embeddings() {
        info!(dim = FAKE_EMBEDDING_DIM, "using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(FAKE_EMBEDDING_DIM)));
    }
    Ok(Box::new(HttpEmbedder::new(settings.clone())?))
}
