use tracing::{info, warn};

use crate::{
    imagegen::ImageGenerator,
    job::{scene_image_name, unix_millis},
    pace::Pacer,
    reconcile::is_placeholder_prompt,
    storage::ObjectStore,
    types::{Scene, SceneImage},
};

/// Render one image per scene, strictly in ascending scene-number order.
///
/// A failed generation or upload marks that scene as `Failed` and the pass
/// continues; image failures are scene-local and never abort the job. After
/// every attempted scene the pacer runs, success or failure, to stay under
/// the image model's rate ceiling.
pub async fn generate_scene_images(
    scenes: &mut [Scene],
    generator: &dyn ImageGenerator,
    store: &dyn ObjectStore,
    pacer: &dyn Pacer,
    job_id: &str,
) {
    for scene in scenes.iter_mut() {
        let Some(prompt) = scene.prompt.clone() else {
            warn!(scene = scene.scene_number, "scene has no prompt, skipping");
            continue;
        };
        if is_placeholder_prompt(&prompt) {
            warn!(
                scene = scene.scene_number,
                "scene has only a placeholder prompt, skipping"
            );
            continue;
        }

        match render_scene(&prompt, scene.scene_number, generator, store, job_id).await {
            Ok(url) => {
                info!(scene = scene.scene_number, url = %url, "image ready");
                scene.image = Some(SceneImage::Ready { url });
            }
            Err(reason) => {
                warn!(scene = scene.scene_number, reason = %reason, "image failed");
                scene.image = Some(SceneImage::Failed { reason });
            }
        }

        pacer.pace().await;
    }
}

async fn render_scene(
    prompt: &str,
    scene_number: u32,
    generator: &dyn ImageGenerator,
    store: &dyn ObjectStore,
    job_id: &str,
) -> std::result::Result<String, String> {
    let bytes = generator
        .generate(prompt)
        .await
        .map_err(|e| e.to_string())?;
    let name = scene_image_name(job_id, scene_number, unix_millis());
    store
        .put(&name, &bytes, "image/png")
        .await
        .map_err(|e| e.to_string())
}
