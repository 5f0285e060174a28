use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;

use storyboard_core::{
    ChatCompletionsClient, FfmpegTranscoder, FixedDelayPacer, GcsStore, GoogleSpeechClient,
    ImagenClient, JobOutcome, LocalStore, ObjectStore, Pipeline, PipelineConfig, SceneImage,
    TextProvider,
    job::{get_root_work_dir, job_id, unix_millis},
};

/// CLI wrapper for TextProvider (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Gemini,
    Openai,
    Grok,
}

impl From<CliProvider> for TextProvider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Gemini => TextProvider::Gemini,
            CliProvider::Openai => TextProvider::Openai,
            CliProvider::Grok => TextProvider::Grok,
        }
    }
}

#[derive(Parser)]
#[command(name = "storyboard")]
#[command(about = "Turn a narrated audio file into a timed storyboard video")]
struct Cli {
    /// Narrated audio file (mp3/wav)
    audio: PathBuf,

    /// AI provider for scene direction
    #[arg(short, long, default_value = "gemini")]
    provider: CliProvider,

    /// Transcription language code
    #[arg(short, long, default_value = "en-US")]
    language: String,

    /// Target scene duration in seconds before a sentence boundary may close it
    #[arg(long, default_value_t = 7.0, value_parser = parse_scene_secs)]
    scene_secs: f64,

    /// Pause between image-generation calls, in seconds
    #[arg(long, default_value_t = 30)]
    pace_secs: u64,

    /// Cloud storage bucket for artifacts and the published video
    #[arg(short, long, default_value = "sb_script_images")]
    bucket: String,

    /// Keep all artifacts on the local filesystem instead of cloud storage
    #[arg(long)]
    offline: bool,
}

/// The scene target feeds `Duration::from_secs_f64`, which panics on
/// negative or non-finite input, so reject those at the flag boundary.
fn parse_scene_secs(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if secs.is_finite() && secs > 0.0 {
        Ok(secs)
    } else {
        Err("scene duration must be a positive number of seconds".to_string())
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let provider: TextProvider = cli.provider.into();

    // Validate API keys early
    if let Err(e) = provider.validate_api_key() {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    println!(
        "\n{}  {}\n",
        style("storyboard").cyan().bold(),
        style("Audio to Video").dim()
    );

    let audio_filename = cli
        .audio
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());

    // Upload the narration so every collaborator can reach it by reference.
    let spinner = create_spinner("Uploading narration...");
    let bytes = fs::read(&cli.audio)
        .await
        .with_context(|| format!("reading {}", cli.audio.display()))?;
    let upload_name = format!("uploads/{}", job_id(&audio_filename, unix_millis()));

    let (store, audio_ref): (Box<dyn ObjectStore>, String) = if cli.offline {
        let store = LocalStore::new(get_root_work_dir().join("store"));
        let reference = store.put(&upload_name, &bytes, "audio/mpeg").await?;
        (Box::new(store), reference)
    } else {
        let store = GcsStore::from_env(&cli.bucket)?;
        store.put(&upload_name, &bytes, "audio/mpeg").await?;
        let reference = format!("gs://{}/{}", cli.bucket, upload_name);
        (Box::new(store), reference)
    };
    spinner.finish_with_message(format!(
        "{} Uploaded: {}",
        style("✓").green().bold(),
        style(&audio_ref).dim()
    ));

    let pipeline = Pipeline {
        transcriber: Box::new(GoogleSpeechClient::from_env(&cli.language)?),
        text_model: Box::new(ChatCompletionsClient::new(provider)),
        image_generator: Box::new(ImagenClient::from_env(None)?),
        store,
        pacer: Box::new(FixedDelayPacer::new(Duration::from_secs(cli.pace_secs))),
        transcoder: Box::new(FfmpegTranscoder),
        config: PipelineConfig {
            scene_target: Duration::from_secs_f64(cli.scene_secs),
        },
    };

    let spinner = create_spinner("Generating storyboard video...");
    let outcome = pipeline.run(&audio_ref, &audio_filename).await;
    match outcome {
        JobOutcome::Completed { scenes, video_url } => {
            spinner.finish_with_message(format!(
                "{} Storyboard complete",
                style("✓").green().bold()
            ));
            println!("\n{}", style("─".repeat(60)).dim());
            for scene in &scenes {
                let status = match &scene.image {
                    Some(SceneImage::Ready { url }) => style(url.as_str()).green(),
                    Some(SceneImage::Failed { reason }) => style(reason.as_str()).red(),
                    None => style("skipped").dim(),
                };
                println!(
                    "{} [{:>6.1}s-{:>6.1}s] {}\n    {}",
                    style(format!("#{}", scene.scene_number)).cyan().bold(),
                    scene.start_time_sec,
                    scene.end_time_sec,
                    scene.script_text,
                    status,
                );
            }
            println!("{}", style("─".repeat(60)).dim());
            println!(
                "\n{} {}\n",
                style("Video:").dim(),
                style(&video_url).cyan().bold()
            );
            Ok(())
        }
        JobOutcome::Failed { message } => {
            spinner.finish_with_message(format!("{} Job failed", style("✗").red().bold()));
            eprintln!("\n{} {}\n", style("Error:").red().bold(), message);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_scene_secs;

    #[test]
    fn scene_secs_accepts_positive_durations() {
        assert_eq!(parse_scene_secs("7.0").unwrap(), 7.0);
        assert_eq!(parse_scene_secs("0.5").unwrap(), 0.5);
    }

    #[test]
    fn scene_secs_rejects_values_that_would_panic_downstream() {
        assert!(parse_scene_secs("0").is_err());
        assert!(parse_scene_secs("-3").is_err());
        assert!(parse_scene_secs("NaN").is_err());
        assert!(parse_scene_secs("inf").is_err());
        assert!(parse_scene_secs("abc").is_err());
    }
}
