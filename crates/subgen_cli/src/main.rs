//! subgen binary entry point.
//!
//! Drives the pipeline end-to-end against a running subtitle service:
//! upload, transcription (or subtitle file upload), an optional styled
//! preview, the final render, and artifact download.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subgen_core::config::ConfigManager;
use subgen_core::controller::PipelineController;
use subgen_core::models::{ArtifactKind, StyleSpec};
use subgen_core::style::{self, MAX_FONT_SIZE_PX, MIN_FONT_SIZE_PX};
use subgen_core::transport::{HttpTransport, Transport};

#[derive(Parser, Debug)]
#[command(name = "subgen", version, about = "Burn styled subtitles into a video")]
struct Cli {
    /// Video file to subtitle (.mp4, .mov, .avi)
    video: PathBuf,

    /// Ready-made .srt file; skips automatic transcription
    #[arg(long)]
    subtitles: Option<PathBuf>,

    /// Language hint for transcription (e.g. "en", "pl"); autodetected by default
    #[arg(long)]
    language: Option<String>,

    /// Render the styled sample and stop before the final render
    #[arg(long)]
    preview_only: bool,

    /// Skip the styled sample
    #[arg(long, conflicts_with = "preview_only")]
    skip_preview: bool,

    /// Print the stroke-outline approximation for the chosen style
    #[arg(long)]
    show_style: bool,

    /// Config file path (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Caption font family
    #[arg(long)]
    font: Option<String>,

    /// Caption font size in pixels (16-48)
    #[arg(long)]
    font_size: Option<u32>,

    /// Caption fill color, e.g. "#FFFF00"
    #[arg(long)]
    color: Option<String>,

    /// Caption outline color
    #[arg(long)]
    stroke_color: Option<String>,

    /// Caption outline width in pixels (0 disables the outline)
    #[arg(long)]
    stroke_width: Option<f64>,
}

impl Cli {
    /// Assemble the style spec from defaults plus the given overrides.
    fn style(&self) -> StyleSpec {
        let mut spec = StyleSpec::default();
        if let Some(font) = &self.font {
            spec.font_family = font.clone();
        }
        if let Some(size) = self.font_size {
            let clamped = size.clamp(MIN_FONT_SIZE_PX, MAX_FONT_SIZE_PX);
            if clamped != size {
                tracing::warn!(
                    "font size {size} outside {MIN_FONT_SIZE_PX}-{MAX_FONT_SIZE_PX}, using {clamped}"
                );
            }
            spec.font_size_px = clamped;
        }
        if let Some(color) = &self.color {
            spec.text_color = color.clone();
        }
        if let Some(color) = &self.stroke_color {
            spec.stroke_color = color.clone();
        }
        if let Some(width) = self.stroke_width {
            spec.stroke_width_px = width;
        }
        spec
    }

    fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.config {
            return path.clone();
        }
        ProjectDirs::from("", "", "subgen")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
            .unwrap_or_else(|| PathBuf::from("subgen.toml"))
    }
}

fn print_style(spec: &StyleSpec) {
    println!(
        "Style: {} {}px, fill {}, stroke {} at {}px",
        spec.font_family,
        spec.font_size_px,
        spec.text_color,
        spec.stroke_color,
        spec.stroke_width_px
    );
    let layers = style::outline_layers(spec);
    if layers.is_empty() {
        println!("Outline: disabled");
        return;
    }
    println!("Outline approximation ({} layers):", layers.len());
    for layer in &layers {
        println!("  dx={:+7.2} dy={:+7.2} {}", layer.dx, layer.dy, layer.color);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "subgen=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = ConfigManager::new(cli.config_path());
    config.load_or_create().context("loading configuration")?;
    config
        .ensure_dirs_exist()
        .context("creating output directory")?;
    let settings = config.settings().clone();
    tracing::info!(server = %settings.server.base_url, "subgen v{}", subgen_core::version());

    let spec = cli.style();
    if cli.show_style {
        print_style(&spec);
    }

    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&settings).context("building HTTP transport")?);
    match transport.health().await {
        Ok(health) if health.is_healthy() => tracing::debug!("service healthy"),
        Ok(health) => tracing::warn!(status = %health.status, "service reports degraded state"),
        Err(e) => tracing::warn!("service health probe failed: {e}"),
    }

    let controller = Arc::new(PipelineController::new(transport, settings));

    // Background snapshot reporter for the long stages.
    let reporter = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move {
            let mut last = String::new();
            loop {
                tokio::time::sleep(Duration::from_millis(500)).await;
                let snapshot = controller.snapshot();
                if snapshot.stage.is_busy() {
                    let line =
                        format!("{} {:.0}%", snapshot.stage, snapshot.progress_percent.floor());
                    if line != last {
                        tracing::info!("{line}");
                        last = line;
                    }
                }
            }
        }
    });

    let outcome = run_pipeline(&cli, &controller, spec).await;
    reporter.abort();
    outcome
}

async fn run_pipeline(
    cli: &Cli,
    controller: &PipelineController,
    spec: StyleSpec,
) -> Result<()> {
    let asset = controller
        .start_upload(&cli.video)
        .await
        .context("upload failed")?;
    tracing::info!(
        "uploaded {} ({} MB, {:.0}s, {})",
        asset.filename,
        asset.size_mb(),
        asset.duration_secs,
        asset.format
    );

    match &cli.subtitles {
        Some(srt) => {
            controller
                .upload_subtitle_file(srt)
                .await
                .context("subtitle upload failed")?;
            tracing::info!("subtitle file accepted");
        }
        None => {
            let source = controller
                .start_auto_transcribe(cli.language.as_deref())
                .await
                .context("transcription failed")?;
            tracing::info!(
                "transcribed {} segments (language: {})",
                source.segments.len(),
                source.language
            );
        }
    }

    let srt_out = controller
        .download_artifact(ArtifactKind::Srt)
        .await
        .context("subtitle download failed")?;
    tracing::info!("subtitle file saved to {}", srt_out.display());

    if !cli.skip_preview {
        match controller.render_preview(spec.clone()).await {
            Ok(path) => println!("Preview clip: {} (temporary)", path.display()),
            Err(e) if cli.preview_only => return Err(e).context("preview failed"),
            Err(e) => tracing::warn!("preview failed, continuing to final render: {e}"),
        }
    }

    if cli.preview_only {
        return Ok(());
    }

    controller
        .render_final(spec)
        .await
        .context("final render failed")?;
    let video_out = controller
        .download_artifact(ArtifactKind::Video)
        .await
        .context("video download failed")?;

    println!("Subtitled video saved to {}", video_out.display());
    println!("Subtitle file saved to {}", srt_out.display());
    Ok(())
}
