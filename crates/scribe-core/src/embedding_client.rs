//! Embedding collaborator client: text -> vector, with batch support.
//! Grounded on the donor's `memory/embedding.rs::EmbeddingService` (own
//! `reqwest::Client`, `base_url`/`api_key`/`model` fields, one POST per
//! call) but diverging on failure handling: this client returns `Err`
//! and leaves the decision to fall back to empty retrieval to the
//! Retrieval Service (§4.2), rather than substituting a zero vector
//! itself the way the donor's service did.

use anyhow::{Context, Result};
use serde_json::json;

#[derive(Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dim: usize,
}

impl EmbeddingClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, dim: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dim,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embeds a single query string (router/retrieval call site).
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .context("embedding provider returned no vectors")
    }

    /// Embeds a batch of strings in one request, preserving input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.model,
            "input": texts,
        });

        let resp = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("embedding request failed")?;

        let status = resp.status();
        let payload: serde_json::Value = resp.json().await.context("invalid embedding response body")?;
        if !status.is_success() {
            anyhow::bail!("embedding provider returned {}: {}", status, payload);
        }

        let data = payload
            .get("data")
            .and_then(|d| d.as_array())
            .context("embedding response missing data array")?;

        let mut out = Vec::with_capacity(data.len());
        for item in data {
            let embedding = item
                .get("embedding")
                .and_then(|e| e.as_array())
                .context("embedding item missing embedding array")?;
            let vec: Vec<f32> = embedding
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect();
            if vec.len() != self.dim {
                anyhow::bail!(
                    "embedding provider returned dimension {}, expected {}",
                    vec.len(),
                    self.dim
                );
            }
            out.push(vec);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dim_is_exposed() {
        let client = EmbeddingClient::new("http://localhost", "key", "model", 1536);
        assert_eq!(client.dim(), 1536);
    }
}
