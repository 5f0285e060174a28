use std::time::Duration;

use tracing::{error, info};

use crate::{
    assemble::{Transcoder, assemble},
    director::TextModel,
    error::{Result, StoryboardError},
    images::generate_scene_images,
    imagegen::ImageGenerator,
    job::{job_id, scene_artifact_name, unix_millis},
    model_output::parse_model_json,
    pace::Pacer,
    reconcile::{extract_records, reconcile},
    segment::{DEFAULT_SCENE_TARGET, segment_words},
    storage::ObjectStore,
    transcribe::Transcriber,
    types::{JobOutcome, Scene},
};

/// Policy knobs for one pipeline instance. The target is configuration, not
/// a property of the segmentation algorithm; pacing is configured on the
/// injected [`Pacer`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub scene_target: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            scene_target: DEFAULT_SCENE_TARGET,
        }
    }
}

/// Sequences one job through segmentation, scene direction, image
/// generation, and assembly. Every collaborator is injected, so the whole
/// chain runs against fakes in tests.
pub struct Pipeline {
    pub transcriber: Box<dyn Transcriber>,
    pub text_model: Box<dyn TextModel>,
    pub image_generator: Box<dyn ImageGenerator>,
    pub store: Box<dyn ObjectStore>,
    pub pacer: Box<dyn Pacer>,
    pub transcoder: Box<dyn Transcoder>,
    pub config: PipelineConfig,
}

impl Pipeline {
    /// Run one job to completion. No error escapes: the caller always gets
    /// a terminal [`JobOutcome`].
    pub async fn run(&self, audio_ref: &str, audio_filename: &str) -> JobOutcome {
        let job = job_id(audio_filename, unix_millis());
        info!(job = %job, audio = audio_ref, "starting storyboard job");

        match self.run_job(&job, audio_ref).await {
            Ok((scenes, video_url)) => {
                info!(job = %job, video = %video_url, "job completed");
                JobOutcome::Completed { scenes, video_url }
            }
            Err(e) => {
                error!(job = %job, error = %e, "job failed");
                JobOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn run_job(&self, job: &str, audio_ref: &str) -> Result<(Vec<Scene>, String)> {
        // Stage 1: transcription. Zero words is fatal.
        let words = self.transcriber.transcribe(audio_ref).await?;
        if words.is_empty() {
            return Err(StoryboardError::EmptyTranscription {
                audio: audio_ref.to_string(),
            });
        }
        info!(words = words.len(), "transcription finished");

        // Stage 2: segmentation.
        let mut scenes = segment_words(&words, self.config.scene_target);
        info!(scenes = scenes.len(), "segmented word timeline");
        self.persist_scenes(job, &scenes).await?;

        // Stage 3: scene direction and reconciliation.
        let transcript = words
            .iter()
            .map(|w| w.word.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let reply = self.text_model.describe_scenes(&transcript, &scenes).await?;
        let parsed = parse_model_json(&reply)?;
        let records = extract_records(&parsed);
        reconcile(&mut scenes, &records);
        self.persist_scenes(job, &scenes).await?;

        // Stage 4: images, one scene at a time, failures kept inline.
        generate_scene_images(
            &mut scenes,
            self.image_generator.as_ref(),
            self.store.as_ref(),
            self.pacer.as_ref(),
            job,
        )
        .await;
        self.persist_scenes(job, &scenes).await?;

        // Stage 5: assembly and publication.
        let video_url = assemble(
            &scenes,
            audio_ref,
            self.store.as_ref(),
            self.transcoder.as_ref(),
            job,
        )
        .await?;

        Ok((scenes, video_url))
    }

    /// Re-write the scene-list artifact so each stage's output stays
    /// independently inspectable.
    async fn persist_scenes(&self, job: &str, scenes: &[Scene]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(scenes)?;
        self.store
            .put(&scene_artifact_name(job), &bytes, "application/json")
            .await?;
        Ok(())
    }
}
