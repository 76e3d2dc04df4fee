//! Command-line driver: runs one pipeline from topic to video.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelgen_genai::GenAiConfig;
use reelgen_models::{Recovery, VoicePreference};
use reelgen_pipeline::media::{load_image, write_outputs};
use reelgen_pipeline::{ActionOutcome, Pipeline, PipelineConfig, PipelineError};

#[derive(Parser, Debug)]
#[command(name = "reelgen", version, about = "Generate a narrated video from a topic and an image")]
struct Cli {
    /// Topic the script should cover
    #[arg(long)]
    topic: String,

    /// Source image (png, jpeg or webp)
    #[arg(long)]
    image: PathBuf,

    /// Narration voice: female or male
    #[arg(long, default_value = "female")]
    voice: VoicePreference,

    /// Continue without narration
    #[arg(long)]
    skip_audio: bool,

    /// How many times a failed video may be resubmitted
    #[arg(long, default_value_t = 1)]
    resubmits: u32,

    /// Seconds to wait before resubmitting after a quota failure
    #[arg(long, default_value_t = 60, env = "REELGEN_QUOTA_WAIT_SECS")]
    quota_wait_secs: u64,

    /// Output directory
    #[arg(long, default_value = "./reelgen-output/")]
    out_dir: PathBuf,
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelgen=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", config);

    let pipeline = match GenAiConfig::from_env()
        .map_err(PipelineError::from)
        .and_then(|genai| Pipeline::from_config(&config, genai))
    {
        Ok(p) => p,
        Err(e) if e.is_configuration() => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to create pipeline: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&pipeline, &cli).await {
        error!("Pipeline run failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(pipeline: &Pipeline, cli: &Cli) -> Result<()> {
    let run_id = pipeline.run_id().await;
    info!(run_id = %run_id, topic = %cli.topic, "Starting pipeline run");

    pipeline.set_topic(cli.topic.as_str()).await;
    pipeline.set_voice(cli.voice).await;

    // 1. Script
    if let Some(failure) = pipeline.generate_script().await?.failure() {
        bail!("{}", failure.message);
    }

    // 2. Narration
    if cli.skip_audio {
        pipeline.skip_audio().await?;
    } else if let Some(failure) = pipeline.generate_audio().await?.failure() {
        warn!(
            category = %failure.category,
            "Continuing without narration: {}", failure.message
        );
        pipeline.skip_audio().await?;
    }

    // 3. Image
    let image = load_image(&cli.image)
        .await
        .with_context(|| format!("Failed to load image {}", cli.image.display()))?;
    pipeline.set_image(image).await?;
    pipeline.advance().await?;

    // 4 and 5. Video, resubmitting while the failure allows it
    let mut outcome = pipeline.generate_video().await?;
    let mut resubmits = 0;
    while let ActionOutcome::Failed(failure) = &outcome {
        if !failure.category.is_resubmit_eligible() || resubmits >= cli.resubmits {
            break;
        }
        resubmits += 1;
        warn!(
            category = %failure.category,
            resubmit = resubmits,
            "Video failed, resubmitting: {}", failure.message
        );
        if failure.recovery() == Recovery::WaitThenResubmit {
            tokio::time::sleep(Duration::from_secs(cli.quota_wait_secs)).await;
        }
        outcome = pipeline.resubmit_video().await?;
    }

    let state = pipeline.snapshot().await;
    let written = write_outputs(&cli.out_dir, &state)
        .await
        .with_context(|| format!("Failed to write outputs to {}", cli.out_dir.display()))?;
    for path in &written {
        info!(path = %path.display(), "Wrote output");
    }

    match outcome {
        ActionOutcome::Completed => {
            info!(run_id = %run_id, resubmits, "Pipeline run complete");
            Ok(())
        }
        ActionOutcome::Failed(failure) => bail!("{}", failure.message),
        ActionOutcome::Abandoned => bail!("Video generation was abandoned"),
    }
}
