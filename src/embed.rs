//! Voyage AI embeddings client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::SeedConfig;
use crate::error::MatchError;

/// Turns a batch of texts into one vector per text, in input order
#[async_trait]
pub trait Embedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
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

pub struct VoyageClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl VoyageClient {
    pub fn new(config: &SeedConfig) -> Self {
        VoyageClient {
            client: Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl Embedder for VoyageClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MatchError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest { input: texts, model: &self.model })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Voyage embeddings request failed");
            return Err(MatchError::Embedding(format!("Voyage API returned {}: {}", status, body)));
        }

        let mut body: EmbeddingResponse = response.json().await?;
        if body.data.len() != texts.len() {
            return Err(MatchError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}
