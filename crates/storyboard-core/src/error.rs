use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryboardError {
    #[error("Transcription returned no words for {audio}")]
    EmptyTranscription { audio: String },

    #[error("Transcription failed: {reason}")]
    TranscriptionFailed { reason: String },

    #[error("Text model refused the request: {reason}")]
    SafetyBlocked { reason: String },

    #[error("Text model request failed: {reason}")]
    ModelRequestFailed { reason: String },

    #[error("Model output is not valid JSON ({source}). Raw output:\n{raw}")]
    MalformedModelOutput {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Image generation failed: {reason}")]
    ImageGenerationFailed { reason: String },

    #[error("ffmpeg is not available on PATH")]
    TranscoderUnavailable,

    #[error("Transcoder failed: {reason}")]
    TranscoderFailed { reason: String },

    #[error("Storage operation failed for {object}: {reason}")]
    StorageFailed { object: String, reason: String },

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, StoryboardError>;
