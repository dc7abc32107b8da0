use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::Parser;
use roughbanner::banner::{ImageSize, UploadedSketch, UserInstructions};
use roughbanner::cli::ProviderOptions;
use roughbanner::config::{AppConfig, OverlaySettings, setup_logging};
use roughbanner::overlay::{DEFAULT_TEXT_COLOR, OverlayText};
use roughbanner::pipeline::{GenerationRequest, Pipeline};
use roughbanner::prompts::PromptTemplates;
use roughbanner::providers::{MockImageGenerator, MockLanguageModel};
use tracing::{info, warn};

/// Generate a banner from a layout sketch without starting the web UI.
///
/// Minimal UX:
///   generate_banner sketch.png --details "A: logo, B: headline"
#[derive(Parser, Debug)]
#[command(name = "generate_banner")]
#[command(about = "Turn a layout sketch into a banner draft: layout analysis -> prompt -> image")]
struct Args {
    /// Layout sketch, PNG or JPEG, elements labelled A, B, C...
    sketch: PathBuf,

    /// What each labelled element should contain
    #[arg(long, short)]
    details: String,

    /// Overall impression, eg "bright and modern"
    #[arg(long, short, default_value = "")]
    impression: String,

    /// Output size: 1024x1024, 1792x1024 or 1024x1792
    #[arg(long, default_value = "1024x1024")]
    size: String,

    /// Text to draw onto the generated image, `\n` starts a new line
    #[arg(long)]
    overlay_text: Option<String>,

    /// Overlay anchor X in pixels (use `--overlay-x=-10` for negative values)
    #[arg(long, default_value_t = 0)]
    overlay_x: i32,

    /// Overlay anchor Y in pixels
    #[arg(long, default_value_t = 0)]
    overlay_y: i32,

    /// Where to write the image, defaults to ./banner_<timestamp>.<ext>
    #[arg(long, short)]
    out: Option<PathBuf>,

    /// Use offline stand-ins instead of the hosted models
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(long, env = "ROUGHBANNER_DEBUG")]
    debug: bool,

    #[command(flatten)]
    providers: ProviderOptions,
}

fn build_pipeline(args: &Args) -> Result<Pipeline> {
    if args.dry_run {
        info!("Dry run, no external calls will be made");
        let templates = PromptTemplates::load(&args.providers.prompt_dir)?;
        return Ok(Pipeline::new(
            Arc::new(MockLanguageModel::canned()),
            Arc::new(MockImageGenerator::new()),
            templates,
            OverlaySettings::from_options(&args.providers)?,
        ));
    }
    let config = AppConfig::from_options(&args.providers)?;
    Ok(Pipeline::from_config(&config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.debug).map_err(|err| anyhow!("{err}"))?;

    let size: ImageSize = args.size.parse()?;
    let sketch_bytes = fs::read(&args.sketch)
        .with_context(|| format!("Failed to read {}", args.sketch.display()))?;
    let sketch = UploadedSketch::new(sketch_bytes)
        .ok_or_else(|| anyhow!("{} is empty", args.sketch.display()))?;

    let pipeline = build_pipeline(&args)?;
    let overlay = args.overlay_text.as_ref().map(|text| OverlayText {
        text: text.replace("\\n", "\n"),
        position: (args.overlay_x, args.overlay_y),
        font_size: args.providers.font_size,
        color: DEFAULT_TEXT_COLOR,
    });

    let report = pipeline
        .run(GenerationRequest {
            sketch: Some(sketch),
            instructions: UserInstructions {
                impression: args.impression.clone(),
                details: args.details.clone(),
                size,
            },
            overlay,
        })
        .await;

    for warning in &report.warnings {
        warn!("{warning}");
    }
    if let Some(layout) = &report.layout_description {
        eprintln!("Layout analysis:\n{layout}\n");
    }
    if let Some(prompt) = &report.generation_prompt {
        eprintln!("Generation prompt:\n{prompt}\n");
    }

    if let Some(err) = report.error {
        // the last stage is `Failed`, the one before it is where things went wrong
        let failed_in = report
            .stages
            .iter()
            .rev()
            .nth(1)
            .map(ToString::to_string)
            .unwrap_or_default();
        return Err(anyhow!(err).context(format!("Generation failed while {failed_in}")));
    }
    let Some(image) = report.image else {
        return Err(anyhow!("Nothing was generated"));
    };

    let output_filename = args.out.clone().unwrap_or_else(|| {
        PathBuf::from(format!(
            "banner_{}.{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            image.extension()
        ))
    });
    if let Some(parent) = output_filename.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&output_filename, &image.bytes)
        .with_context(|| format!("Failed to write {}", output_filename.display()))?;

    if let Some(url) = &image.source_url {
        info!("Provider URL: {url}");
    }
    eprintln!("Saved: {}", output_filename.display());
    Ok(())
}
