use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    error::{Result, StoryboardError},
    types::WordSpan,
};

/// Speech-to-text collaborator producing a word timeline for a stored audio
/// object.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_uri: &str) -> Result<Vec<WordSpan>>;
}

/// Google Speech-to-Text long-running recognition over the REST API.
///
/// The recognition config is fixed: mono 44.1 kHz, the long-form model,
/// word-level time offsets and automatic punctuation enabled.
pub struct GoogleSpeechClient {
    client: reqwest::Client,
    api_key: String,
    language_code: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl GoogleSpeechClient {
    pub const API_KEY_ENV_VAR: &'static str = "GOOGLE_SPEECH_API_KEY";

    pub fn from_env(language_code: &str) -> Result<Self> {
        let api_key = std::env::var(Self::API_KEY_ENV_VAR).map_err(|_| {
            StoryboardError::MissingApiKey {
                env_var: Self::API_KEY_ENV_VAR.to_string(),
            }
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            language_code: language_code.to_string(),
            poll_interval: Duration::from_secs(10),
            max_polls: 90,
        })
    }
}

#[async_trait]
impl Transcriber for GoogleSpeechClient {
    async fn transcribe(&self, audio_uri: &str) -> Result<Vec<WordSpan>> {
        info!(audio = audio_uri, "submitting long-running recognition");
        let response = self
            .client
            .post(format!(
                "https://speech.googleapis.com/v1/speech:longrunningrecognize?key={}",
                self.api_key
            ))
            .json(&serde_json::json!({
                "config": {
                    "audioChannelCount": 1,
                    "sampleRateHertz": 44100,
                    "model": "latest_long",
                    "useEnhanced": true,
                    "enableWordTimeOffsets": true,
                    "enableAutomaticPunctuation": true,
                    "languageCode": self.language_code,
                },
                "audio": { "uri": audio_uri },
            }))
            .send()
            .await?
            .json::<Value>()
            .await?;

        let operation = response["name"].as_str().ok_or_else(|| {
            StoryboardError::TranscriptionFailed {
                reason: format!("no operation name in response: {response}"),
            }
        })?;

        // Bounded wait on the asynchronous operation.
        for attempt in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;
            let status = self
                .client
                .get(format!(
                    "https://speech.googleapis.com/v1/operations/{}?key={}",
                    operation, self.api_key
                ))
                .send()
                .await?
                .json::<Value>()
                .await?;

            if let Some(error) = status.get("error") {
                return Err(StoryboardError::TranscriptionFailed {
                    reason: error.to_string(),
                });
            }
            if status["done"].as_bool().unwrap_or(false) {
                debug!(attempt, "recognition finished");
                return Ok(words_from_response(&status["response"]));
            }
        }

        Err(StoryboardError::TranscriptionFailed {
            reason: format!("operation {operation} did not finish in time"),
        })
    }
}

/// Flatten a recognition response into the word timeline, keeping temporal
/// order across result chunks.
pub fn words_from_response(response: &Value) -> Vec<WordSpan> {
    let Some(results) = response["results"].as_array() else {
        return Vec::new();
    };

    let mut words = Vec::new();
    for result in results {
        let Some(items) = result["alternatives"][0]["words"].as_array() else {
            continue;
        };
        for item in items {
            let Some(word) = item["word"].as_str() else {
                continue;
            };
            words.push(WordSpan {
                word: word.to_string(),
                start_time: parse_offset(&item["startTime"]),
                end_time: parse_offset(&item["endTime"]),
            });
        }
    }
    words
}

/// Offsets arrive as strings like `"12.300s"`.
fn parse_offset(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.trim_end_matches('s').parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_words_across_result_chunks() {
        let response = json!({
            "results": [
                {"alternatives": [{"transcript": "Hi there.", "words": [
                    {"word": "Hi", "startTime": "0s", "endTime": "0.400s"},
                    {"word": "there.", "startTime": "0.400s", "endTime": "1.100s"},
                ]}]},
                {"alternatives": [{"transcript": "Bye.", "words": [
                    {"word": "Bye.", "startTime": "1.500s", "endTime": "2s"},
                ]}]},
            ]
        });
        let words = words_from_response(&response);
        assert_eq!(words.len(), 3);
        assert_eq!(words[1].word, "there.");
        assert_eq!(words[1].start_time, 0.4);
        assert_eq!(words[2].end_time, 2.0);
    }

    #[test]
    fn empty_response_yields_no_words() {
        assert!(words_from_response(&json!({})).is_empty());
    }
}
