use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::{
    error::{Result, StoryboardError},
    types::Scene,
};

/// Text-model provider behind an OpenAI-compatible chat-completions endpoint.
#[derive(Clone, Debug, Default)]
pub enum TextProvider {
    #[default]
    Gemini,
    Openai,
    Grok,
}

impl TextProvider {
    pub fn name(&self) -> &'static str {
        match self {
            TextProvider::Gemini => "Gemini",
            TextProvider::Openai => "OpenAI",
            TextProvider::Grok => "Grok",
        }
    }

    fn api_url(&self) -> &'static str {
        match self {
            TextProvider::Gemini => {
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
            }
            TextProvider::Openai => "https://api.openai.com/v1/chat/completions",
            TextProvider::Grok => "https://api.x.ai/v1/chat/completions",
        }
    }

    fn model(&self) -> &'static str {
        match self {
            TextProvider::Gemini => "gemini-3-pro",
            TextProvider::Openai => "gpt-5.1",
            TextProvider::Grok => "grok-4-fast",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            TextProvider::Gemini => "GEMINI_API_KEY",
            TextProvider::Openai => "OPENAI_API_KEY",
            TextProvider::Grok => "XAI_API_KEY",
        }
    }

    /// Validate that the API key is set for this provider.
    pub fn validate_api_key(&self) -> Result<String> {
        std::env::var(self.env_var()).map_err(|_| StoryboardError::MissingApiKey {
            env_var: self.env_var().to_string(),
        })
    }
}

/// System instruction for the scene-direction call. The response-shape
/// constraint keeps the reply parseable by `model_output`.
static SCENE_DIRECTION_PROMPT: &str = r#"You are a storyboard director. You receive the full transcript of a narrated audio track and its breakdown into numbered scenes. For every scene, write one vivid image-generation prompt that illustrates what the narration describes at that moment.

You MUST output ONLY valid JSON matching this exact structure (no markdown, no explanation):
{
  "analysis": "1-2 sentence summary of the narration's overall visual style and mood",
  "scenes": [
    {"scene_number": 1, "prompt": "Detailed visual description for this scene"}
  ]
}

Rules:
- Produce exactly one record per input scene, keeping the given scene numbers
- Prompts must be concrete visual descriptions: subject, setting, lighting, composition
- Keep a consistent style across all prompts so the storyboard feels like one film
- Never include text, captions, or watermarks in the prompts
- Output ONLY the JSON, nothing else"#;

/// Build the user message embedding the transcript and per-scene scripts.
pub fn build_direction_request(transcript: &str, scenes: &[Scene]) -> String {
    let mut request = String::new();
    request.push_str("Full transcript:\n");
    request.push_str(transcript);
    request.push_str("\n\nScenes:\n");
    for scene in scenes {
        request.push_str(&format!(
            "{}. [{:.1}s-{:.1}s] {}\n",
            scene.scene_number, scene.start_time_sec, scene.end_time_sec, scene.script_text
        ));
    }
    request
}

/// Text-generation collaborator that turns scenes into image prompts.
/// Returns the model's raw reply; parsing happens downstream.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn describe_scenes(&self, transcript: &str, scenes: &[Scene]) -> Result<String>;
}

/// Chat-completions client over one of the supported providers.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    provider: TextProvider,
}

impl ChatCompletionsClient {
    pub fn new(provider: TextProvider) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider,
        }
    }
}

#[async_trait]
impl TextModel for ChatCompletionsClient {
    async fn describe_scenes(&self, transcript: &str, scenes: &[Scene]) -> Result<String> {
        let api_key = self.provider.validate_api_key()?;
        info!(
            provider = self.provider.name(),
            scenes = scenes.len(),
            "requesting scene direction"
        );

        let response = self
            .client
            .post(self.provider.api_url())
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&serde_json::json!({
                "model": self.provider.model(),
                "messages": [
                    {
                        "role": "system",
                        "content": SCENE_DIRECTION_PROMPT,
                    },
                    {
                        "role": "user",
                        "content": build_direction_request(transcript, scenes),
                    },
                ],
                "temperature": 0.3,
            }))
            .send()
            .await?
            .json::<Value>()
            .await?;

        let choice = &response["choices"][0];
        if choice["finish_reason"].as_str() == Some("content_filter") {
            return Err(StoryboardError::SafetyBlocked {
                reason: "provider flagged the request as unsafe".to_string(),
            });
        }

        choice["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| StoryboardError::ModelRequestFailed {
                reason: format!("invalid API response: {response}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_provider_maps_to_its_own_endpoint() {
        assert_eq!(TextProvider::default().name(), "Gemini");
        let providers = [TextProvider::Gemini, TextProvider::Openai, TextProvider::Grok];
        for pair in providers.windows(2) {
            assert_ne!(pair[0].api_url(), pair[1].api_url());
            assert_ne!(pair[0].model(), pair[1].model());
            assert_ne!(pair[0].env_var(), pair[1].env_var());
        }
    }

    #[test]
    fn request_lists_every_scene_with_timings() {
        let scenes = vec![
            Scene {
                scene_number: 1,
                start_time_sec: 0.0,
                end_time_sec: 7.5,
                script_text: "Hi there.".into(),
                prompt: None,
                image: None,
            },
            Scene {
                scene_number: 2,
                start_time_sec: 7.5,
                end_time_sec: 14.0,
                script_text: "Bye.".into(),
                prompt: None,
                image: None,
            },
        ];
        let request = build_direction_request("Hi there. Bye.", &scenes);
        assert!(request.contains("Full transcript:\nHi there. Bye."));
        assert!(request.contains("1. [0.0s-7.5s] Hi there."));
        assert!(request.contains("2. [7.5s-14.0s] Bye."));
    }
}
