use serde::{Deserialize, Serialize};

/// A single recognized word with its start/end offsets in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordSpan {
    pub word: String,
    pub start_time: f64,
    pub end_time: f64,
}

/// A contiguous span of transcript words treated as one visual beat.
///
/// `prompt` is filled in by reconciliation, `image` by the image pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub scene_number: u32,
    pub start_time_sec: f64,
    pub end_time_sec: f64,
    pub script_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<SceneImage>,
}

impl Scene {
    pub fn duration_sec(&self) -> f64 {
        self.end_time_sec - self.start_time_sec
    }
}

/// Outcome of the image pass for one scene. A failed scene keeps its reason
/// inline so the job can continue without it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SceneImage {
    Ready { url: String },
    Failed { reason: String },
}

impl SceneImage {
    pub fn url(&self) -> Option<&str> {
        match self {
            SceneImage::Ready { url } => Some(url),
            SceneImage::Failed { .. } => None,
        }
    }
}

/// One scene record as validated out of the text model's response.
///
/// `id_hint` is whatever scene number could be coerced out of the record's
/// identifier fields; `None` means the record carried no usable identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSceneRecord {
    pub id_hint: Option<u32>,
    pub prompt: Option<String>,
}

/// One line pair of the transcoder's concat script: a local image file and
/// how long it stays on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatEntry {
    pub file: String,
    pub duration_sec: f64,
}

/// Terminal result of a job. The caller never sees anything in between.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed { scenes: Vec<Scene>, video_url: String },
    Failed { message: String },
}
