use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Derive a job id from the uploaded filename and creation time.
///
/// Ids are unique per invocation, so a job's working directory is never
/// shared with another job.
pub fn job_id(audio_filename: &str, created_unix_ms: u128) -> String {
    let name = audio_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(audio_filename);
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", sanitized, created_unix_ms)
}

pub fn get_root_work_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("storyboard")
}

/// Job-scoped working directory for video assembly.
pub fn get_work_dir(job_id: &str) -> PathBuf {
    get_root_work_dir().join(job_id)
}

/// Storage name of the scene-list artifact, re-written after every stage.
pub fn scene_artifact_name(job_id: &str) -> String {
    format!("{job_id}/scenes.json")
}

/// Storage name for one scene's generated image.
pub fn scene_image_name(job_id: &str, scene_number: u32, created_unix_ms: u128) -> String {
    format!("{job_id}/scene_{scene_number}_{created_unix_ms}.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_sanitizes_filename() {
        let id = job_id("My Narration (final).mp3", 1764653265533);
        assert_eq!(id, "My_Narration__final__mp3_1764653265533");
    }

    #[test]
    fn job_id_drops_directories() {
        let id = job_id("/tmp/uploads/audio.mp3", 7);
        assert_eq!(id, "audio_mp3_7");
    }
}
