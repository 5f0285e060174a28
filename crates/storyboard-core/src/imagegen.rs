use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StoryboardError};

/// Fixed aspect ratio for every generated frame.
pub const ASPECT_RATIO: &str = "16:9";

/// Image-generation collaborator: one prompt in, raw image bytes out.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Imagen `:predict` client. Responses carry the image base64-encoded.
pub struct ImagenClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ImagenClient {
    pub const API_KEY_ENV_VAR: &'static str = "GEMINI_API_KEY";
    pub const DEFAULT_MODEL: &'static str = "imagen-4.0-generate-001";

    pub fn from_env(model: Option<&str>) -> Result<Self> {
        let api_key = std::env::var(Self::API_KEY_ENV_VAR).map_err(|_| {
            StoryboardError::MissingApiKey {
                env_var: Self::API_KEY_ENV_VAR.to_string(),
            }
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.unwrap_or(Self::DEFAULT_MODEL).to_string(),
        })
    }
}

#[async_trait]
impl ImageGenerator for ImagenClient {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        debug!(model = %self.model, "requesting image");
        let response = self
            .client
            .post(format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:predict?key={}",
                self.model, self.api_key
            ))
            .json(&serde_json::json!({
                "instances": [{ "prompt": prompt }],
                "parameters": {
                    "sampleCount": 1,
                    "aspectRatio": ASPECT_RATIO,
                    "safetySetting": "block_only_high",
                },
            }))
            .send()
            .await?
            .json::<Value>()
            .await?;

        if let Some(error) = response.get("error") {
            return Err(StoryboardError::ImageGenerationFailed {
                reason: error.to_string(),
            });
        }

        let encoded = response["predictions"][0]["bytesBase64Encoded"]
            .as_str()
            .ok_or_else(|| StoryboardError::ImageGenerationFailed {
                reason: "no image bytes in response".to_string(),
            })?;

        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| StoryboardError::ImageGenerationFailed {
                reason: format!("invalid base64 image payload: {e}"),
            })
    }
}
