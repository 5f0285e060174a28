use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::{debug, info, warn};

use crate::{
    error::{Result, StoryboardError},
    job::get_work_dir,
    storage::ObjectStore,
    types::{ConcatEntry, Scene, SceneImage},
};

/// Floor for a frame's display time, so a degenerate scene cannot produce a
/// zero or negative duration in the concat script.
pub const MIN_FRAME_SECONDS: f64 = 0.05;

/// Media transcoder, driven once per job with a concat script and the
/// original audio.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Fail-fast availability check, run before any downloads.
    async fn probe(&self) -> Result<()>;
    async fn render(&self, manifest: &Path, audio: &Path, output: &Path) -> Result<()>;
}

/// ffmpeg invoked as a subprocess, concat demuxer in, H.264/AAC out.
pub struct FfmpegTranscoder;

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe(&self) -> Result<()> {
        let probed = Command::new("ffmpeg")
            .arg("-version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false);
        if probed {
            Ok(())
        } else {
            Err(StoryboardError::TranscoderUnavailable)
        }
    }

    async fn render(&self, manifest: &Path, audio: &Path, output: &Path) -> Result<()> {
        let result = Command::new("ffmpeg")
            .arg("-y")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .arg("-i")
            .arg(manifest)
            .arg("-i")
            .arg(audio)
            .arg("-c:v")
            .arg("libx264")
            .arg("-r")
            .arg("24")
            .arg("-pix_fmt")
            .arg("yuv420p")
            .arg("-c:a")
            .arg("aac")
            .arg("-shortest")
            .arg(output)
            .output()
            .await?;

        if !result.status.success() {
            return Err(StoryboardError::TranscoderFailed {
                reason: String::from_utf8_lossy(&result.stderr).to_string(),
            });
        }
        Ok(())
    }
}

/// Per-scene concat entries for every scene with a ready image, in scene
/// order, with the duration floor applied.
pub fn concat_entries(scenes: &[Scene]) -> Vec<ConcatEntry> {
    scenes
        .iter()
        .filter_map(|scene| match &scene.image {
            Some(SceneImage::Ready { .. }) => Some(ConcatEntry {
                file: local_image_name(scene.scene_number),
                duration_sec: scene.duration_sec().max(MIN_FRAME_SECONDS),
            }),
            _ => None,
        })
        .collect()
}

fn local_image_name(scene_number: u32) -> String {
    format!("scene_{scene_number:03}.png")
}

/// Render the concat script. The final image is listed once more without a
/// duration, as the concat demuxer requires for the last frame to display.
pub fn build_concat_manifest(entries: &[ConcatEntry]) -> String {
    let mut manifest = String::new();
    for entry in entries {
        manifest.push_str(&format!("file '{}'\n", entry.file));
        manifest.push_str(&format!("duration {:.3}\n", entry.duration_sec));
    }
    if let Some(last) = entries.last() {
        manifest.push_str(&format!("file '{}'\n", last.file));
    }
    manifest
}

/// Assemble the final video: download audio and scene images into a
/// job-scoped working directory, run the transcoder over the concat script,
/// upload the result, and return its public reference.
///
/// The working directory is removed on every exit path.
pub async fn assemble(
    scenes: &[Scene],
    audio_ref: &str,
    store: &dyn ObjectStore,
    transcoder: &dyn Transcoder,
    job_id: &str,
) -> Result<String> {
    transcoder.probe().await?;

    let work_dir = get_work_dir(job_id);
    fs::create_dir_all(&work_dir).await?;

    let result = assemble_in(&work_dir, scenes, audio_ref, store, transcoder, job_id).await;

    if let Err(e) = fs::remove_dir_all(&work_dir).await {
        warn!(dir = %work_dir.display(), error = %e, "failed to remove working directory");
    }

    result
}

async fn assemble_in(
    work_dir: &Path,
    scenes: &[Scene],
    audio_ref: &str,
    store: &dyn ObjectStore,
    transcoder: &dyn Transcoder,
    job_id: &str,
) -> Result<String> {
    let audio_path = work_dir.join("narration_audio");
    store.fetch(audio_ref, &audio_path).await?;

    for scene in scenes {
        let Some(SceneImage::Ready { url }) = &scene.image else {
            continue;
        };
        let file = local_image_name(scene.scene_number);
        store.fetch(url, &work_dir.join(&file)).await?;
    }

    let entries = concat_entries(scenes);
    if entries.is_empty() {
        return Err(StoryboardError::TranscoderFailed {
            reason: "no scene images available to assemble".to_string(),
        });
    }

    let manifest_path = work_dir.join("list.txt");
    fs::write(&manifest_path, build_concat_manifest(&entries)).await?;
    debug!(entries = entries.len(), "wrote concat script");

    let output_path: PathBuf = work_dir.join("storyboard.mp4");
    transcoder.render(&manifest_path, &audio_path, &output_path).await?;

    let bytes = fs::read(&output_path).await?;
    let video_url = store
        .put(&format!("{job_id}/storyboard.mp4"), &bytes, "video/mp4")
        .await?;
    info!(video = %video_url, "video published");
    Ok(video_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(n: u32, start: f64, end: f64, image: Option<SceneImage>) -> Scene {
        Scene {
            scene_number: n,
            start_time_sec: start,
            end_time_sec: end,
            script_text: String::new(),
            prompt: None,
            image,
        }
    }

    fn ready(url: &str) -> Option<SceneImage> {
        Some(SceneImage::Ready {
            url: url.to_string(),
        })
    }

    #[test]
    fn manifest_repeats_final_file_without_duration() {
        let entries = concat_entries(&[
            scene(1, 0.0, 7.0, ready("a")),
            scene(2, 7.0, 12.5, ready("b")),
            scene(3, 12.5, 20.0, ready("c")),
        ]);
        assert_eq!(entries.len(), 3);

        let manifest = build_concat_manifest(&entries);
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "file 'scene_001.png'");
        assert_eq!(lines[1], "duration 7.000");
        assert_eq!(lines[3], "duration 5.500");
        assert_eq!(lines[6], "file 'scene_003.png'");
    }

    #[test]
    fn degenerate_scene_duration_is_floored() {
        let entries = concat_entries(&[scene(1, 3.0, 3.0, ready("a"))]);
        assert_eq!(entries[0].duration_sec, MIN_FRAME_SECONDS);
    }

    #[test]
    fn failed_and_missing_images_are_excluded() {
        let entries = concat_entries(&[
            scene(1, 0.0, 7.0, ready("a")),
            scene(
                2,
                7.0,
                14.0,
                Some(SceneImage::Failed {
                    reason: "rate limited".to_string(),
                }),
            ),
            scene(3, 14.0, 21.0, None),
            scene(4, 21.0, 28.0, ready("d")),
        ]);
        let files: Vec<&str> = entries.iter().map(|e| e.file.as_str()).collect();
        assert_eq!(files, vec!["scene_001.png", "scene_004.png"]);
    }

    #[test]
    fn empty_entry_list_renders_empty_manifest() {
        assert_eq!(build_concat_manifest(&[]), "");
    }
}
