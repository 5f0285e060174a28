//! Storyboard Core Library
//!
//! Turns a narrated audio file into a timed storyboard video: the word
//! timeline from transcription is segmented into scenes, a text model writes
//! one image prompt per scene, each prompt is rendered to an image, and the
//! images are assembled with the original audio into a slideshow video.

pub mod assemble;
pub mod director;
pub mod error;
pub mod imagegen;
pub mod images;
pub mod job;
pub mod model_output;
pub mod pace;
pub mod pipeline;
pub mod reconcile;
pub mod segment;
pub mod storage;
pub mod transcribe;
pub mod types;

// Re-export commonly used items at crate root
pub use assemble::{FfmpegTranscoder, Transcoder, assemble, build_concat_manifest};
pub use director::{ChatCompletionsClient, TextModel, TextProvider};
pub use error::{Result, StoryboardError};
pub use imagegen::{ImageGenerator, ImagenClient};
pub use images::generate_scene_images;
pub use job::{get_work_dir, job_id};
pub use model_output::parse_model_json;
pub use pace::{FixedDelayPacer, NoDelay, Pacer};
pub use pipeline::{Pipeline, PipelineConfig};
pub use reconcile::{extract_records, reconcile};
pub use segment::segment_words;
pub use storage::{GcsStore, LocalStore, ObjectStore};
pub use transcribe::{GoogleSpeechClient, Transcriber};
pub use types::{ConcatEntry, JobOutcome, ModelSceneRecord, Scene, SceneImage, WordSpan};
