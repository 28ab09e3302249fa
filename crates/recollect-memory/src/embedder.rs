// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapters: a deterministic feature-hashing embedder for offline
//! use and an HTTP client for OpenAI-compatible `/embeddings` endpoints.
//!
//! Both return L2-normalized vectors so the index can rank by inner product.

use std::time::Duration;

use async_trait::async_trait;
use recollect_config::model::EmbeddingConfig;
use recollect_core::{
    AdapterType, EmbeddingAdapter, EmbeddingInput, EmbeddingOutput, HealthStatus, PluginAdapter,
    RecollectError, tokenize,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// L2-normalize a vector. A zero vector is returned unchanged.
pub fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter().map(|v| v / norm).collect()
    } else {
        vec.to_vec()
    }
}

fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Signed feature-hashing embedder.
///
/// Each lowercase term lands in bucket `hash % dimensions` with a sign taken
/// from the low hash bit. Identical text always yields identical vectors.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for term in tokenize(text) {
            let hash = fnv1a_hash(term.as_bytes());
            let index = (hash % self.dimensions as u64) as usize;
            let sign = if hash & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }
        l2_normalize(&vector)
    }
}

#[async_trait]
impl PluginAdapter for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for HashEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, RecollectError> {
        let embeddings = input.texts.iter().map(|t| self.embed_text(t)).collect();
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

impl HttpEmbedder {
    /// Build a client from the `[embedding]` section. Requires `api_base`.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, RecollectError> {
        let api_base = config.api_base.as_deref().ok_or_else(|| {
            RecollectError::Config("embedding.api_base is required for the http provider".into())
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RecollectError::Embedding {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", api_base.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl PluginAdapter for HttpEmbedder {
    fn name(&self) -> &str {
        "http"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, RecollectError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EmbeddingAdapter for HttpEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, RecollectError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: Vec::new(),
                dimensions: self.dimensions,
            });
        }

        let mut request = self.client.post(&self.endpoint).json(&EmbeddingsRequest {
            model: &self.model,
            input: &input.texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| RecollectError::Embedding {
            message: format!("HTTP request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

        let status = response.status();
        debug!(status = %status, count = input.texts.len(), "embeddings response");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecollectError::Embedding {
                message: format!("embeddings endpoint returned {status}: {body}"),
                source: None,
            });
        }

        let mut parsed: EmbeddingsResponse =
            response.json().await.map_err(|e| RecollectError::Embedding {
                message: format!("failed to parse embeddings response: {e}"),
                source: Some(Box::new(e)),
            })?;

        if parsed.data.len() != input.texts.len() {
            return Err(RecollectError::Embedding {
                message: format!(
                    "embeddings endpoint returned {} vectors for {} inputs",
                    parsed.data.len(),
                    input.texts.len()
                ),
                source: None,
            });
        }
        parsed.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));

        let mut embeddings = Vec::with_capacity(parsed.data.len());
        for datum in parsed.data {
            if datum.embedding.len() != self.dimensions {
                return Err(RecollectError::Embedding {
                    message: format!(
                        "expected {} dimensions, got {}",
                        self.dimensions,
                        datum.embedding.len()
                    ),
                    source: None,
                });
            }
            embeddings.push(l2_normalize(&datum.embedding));
        }

        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recollect_config::model::EmbeddingProviderKind;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn l2_normalize_general_vector() {
        let n = l2_normalize(&[3.0, 4.0]);
        assert!((n[0] - 0.6).abs() < 0.001);
        assert!((n[1] - 0.8).abs() < 0.001);
    }

    #[test]
    fn l2_normalize_zero_vector() {
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn hash_embedder_is_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_text("Call me after 9 AM");
        let b = embedder.embed_text("call me after 9 am");
        assert_eq!(a, b, "tokenization lowercases");
        assert_eq!(a.len(), 64);
        assert!((norm(&a) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hash_embedder_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16);
        assert!(embedder.embed_text("  ?! ").iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn hash_embedder_batch_preserves_order() {
        let embedder = HashEmbedder::new(32);
        let out = embedder
            .embed(EmbeddingInput {
                texts: vec!["alpha".into(), "beta".into()],
            })
            .await
            .unwrap();
        assert_eq!(out.dimensions, 32);
        assert_eq!(out.embeddings[0], embedder.embed_text("alpha"));
        assert_eq!(out.embeddings[1], embedder.embed_text("beta"));
    }

    fn http_config(base: &str, dims: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            provider: EmbeddingProviderKind::Http,
            dimensions: dims,
            api_base: Some(base.to_string()),
            api_key: Some("test-key".into()),
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn http_embedder_requires_api_base() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderKind::Http,
            api_base: None,
            ..EmbeddingConfig::default()
        };
        assert!(matches!(HttpEmbedder::new(&config), Err(RecollectError::Config(_))));
    }

    #[tokio::test]
    async fn http_embedder_parses_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 2.0]},
                    {"index": 0, "embedding": [3.0, 4.0]}
                ]
            })))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&http_config(&format!("{}/v1", server.uri()), 2)).unwrap();
        let out = embedder
            .embed(EmbeddingInput {
                texts: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert!((out.embeddings[0][0] - 0.6).abs() < 1e-5);
        assert!((out.embeddings[1][1] - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn http_embedder_rejects_dimension_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [1.0, 0.0, 0.0]}]
            })))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&http_config(&server.uri(), 2)).unwrap();
        let err = embedder
            .embed(EmbeddingInput {
                texts: vec!["a".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RecollectError::Embedding { .. }));
    }

    #[tokio::test]
    async fn http_embedder_surfaces_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(&http_config(&server.uri(), 2)).unwrap();
        let err = embedder
            .embed(EmbeddingInput {
                texts: vec!["a".into()],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
