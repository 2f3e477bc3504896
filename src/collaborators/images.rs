//! Text-to-image through the Hugging Face inference API.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use autoreel_common::{Error, Result};
use reqwest::Client;
use serde_json::json;

use super::{http_client, ImageGenerator};
use crate::config::ImagesConfig;
use crate::storage;

pub struct HuggingFaceImages {
    client: Client,
    endpoint: String,
    prompt_suffix: String,
    api_key: String,
}

impl HuggingFaceImages {
    pub fn new(config: &ImagesConfig, api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(Duration::from_secs(config.timeout_secs)),
            endpoint: config.endpoint.clone(),
            prompt_suffix: config.prompt_suffix.clone(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ImageGenerator for HuggingFaceImages {
    async fn generate(&self, prompt: &str, index: u32, output: &Path) -> Result<()> {
        let inputs = format!("{}{}", prompt.trim(), self.prompt_suffix);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({ "inputs": inputs }))
            .send()
            .await
            .map_err(|e| Error::http(format!("image request for scene {index} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http(format!(
                "image generation for scene {index} returned {status}: {}",
                body.trim()
            )));
        }

        let bytes = response.bytes().await.map_err(Error::http)?;
        if bytes.is_empty() {
            return Err(Error::http(format!("empty image for scene {index}")));
        }

        // Written in one step so an interrupted download never counts as output.
        storage::write_atomic(output, &bytes)?;
        tracing::info!(scene = index, path = %output.display(), "Image saved");
        Ok(())
    }
}
