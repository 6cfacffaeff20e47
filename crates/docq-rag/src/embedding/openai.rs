//! OpenAI compatible embeddings client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::EmbeddingProvider;

/// Client for the `/embeddings` endpoint of an OpenAI compatible API.
/// Transient failures are retried with exponential backoff; auth failures
/// and malformed requests are surfaced immediately.
pub struct OpenAiEmbedder {
    client: Client,
    config: EmbeddingConfig,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

enum RequestFailure {
    Retryable(Error),
    Fatal(Error),
}

impl OpenAiEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::configuration("no embedding credential configured, set OPENAI_API_KEY")
            })
    }

    async fn request_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let key = self.api_key()?;
        let url = format!("{}/embeddings", self.config.base_url);

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            match self.send_once(&url, key, batch).await {
                Ok(vectors) => return Ok(vectors),
                Err(RequestFailure::Fatal(err)) => return Err(err),
                Err(RequestFailure::Retryable(err)) => {
                    last_error = Some(err);
                    if attempt < self.config.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Embedding request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.config.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| Error::embedding("embedding request failed")))
    }

    async fn send_once(
        &self,
        url: &str,
        key: &str,
        batch: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, RequestFailure> {
        let request = EmbeddingsRequest {
            model: &self.config.model,
            input: batch,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                RequestFailure::Retryable(Error::embedding(format!(
                    "embedding request failed: {e}"
                )))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Error::embedding(format!("embedding service returned HTTP {status}: {body}"));
            return Err(if is_retryable(status) {
                RequestFailure::Retryable(err)
            } else {
                RequestFailure::Fatal(err)
            });
        }

        let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
            RequestFailure::Fatal(Error::embedding(format!(
                "unreadable embedding response: {e}"
            )))
        })?;

        if parsed.data.len() != batch.len() {
            return Err(RequestFailure::Fatal(Error::embedding(format!(
                "embedding service returned {} vectors for {} inputs",
                parsed.data.len(),
                batch.len()
            ))));
        }

        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            if item.embedding.len() != self.config.dimensions {
                return Err(RequestFailure::Fatal(Error::embedding(format!(
                    "embedding service returned {} dimensional vector, expected {}",
                    item.embedding.len(),
                    self.config.dimensions
                ))));
            }
            vectors.push(item.embedding);
        }
        Ok(vectors)
    }
}

/// Rate limiting and server side failures are worth retrying. Everything
/// else in the 4xx range means the request itself is wrong.
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.api_key()?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            vectors.extend(self.request_batch(batch).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .map(|key| !key.is_empty())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}
