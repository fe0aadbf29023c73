//! Client for the external image-generation API.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Generations allowed before the counter must be reset by a checkout.
pub const GENERATION_QUOTA: i32 = 20;

#[derive(Clone)]
pub struct GenerationClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    image_url: String,
}

impl GenerationClient {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }

    /// None when GENERATION_API_URL is unset; design generation is then
    /// reported as unconfigured rather than failing at startup.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("GENERATION_API_URL").ok()?;
        let api_key = std::env::var("GENERATION_API_KEY").unwrap_or_default();
        Some(Self::new(endpoint, api_key))
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&GenerateRequest {
                prompt,
                size: "1024x1024",
            })
            .send()
            .await
            .map_err(|e| ApiError::Generation(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ApiError::Generation(format!(
                "upstream returned {}",
                resp.status()
            )));
        }
        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Generation(e.to_string()))?;
        Ok(body.image_url)
    }
}
