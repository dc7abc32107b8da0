use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use roughbanner::banner::{ImageSize, UploadedSketch, UserInstructions};
use roughbanner::cli::CliOptions;
use roughbanner::config::{AppConfig, OverlaySettings, setup_logging};
use roughbanner::overlay::{DEFAULT_TEXT_COLOR, OverlayText};
use roughbanner::pipeline::{GenerationRequest, Pipeline, Stage};
use roughbanner::prompts::PromptTemplates;
use roughbanner::providers::{MockImageGenerator, MockLanguageModel, MockReply};

fn manifest_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative)
}

fn sketch_png() -> Vec<u8> {
    let mut sketch = image::RgbImage::from_pixel(64, 32, image::Rgb([255, 255, 255]));
    for x in 4..20 {
        sketch.put_pixel(x, 4, image::Rgb([0, 0, 0]));
    }
    let mut buf = Cursor::new(Vec::new());
    sketch
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode sketch");
    buf.into_inner()
}

fn shipped_templates() -> PromptTemplates {
    PromptTemplates::load(&manifest_path("prompts")).expect("shipped prompt templates")
}

#[tokio::test]
async fn test_shipped_templates_end_to_end() {
    let _ = setup_logging(true);

    let language_model = Arc::new(MockLanguageModel::canned());
    let image_generator = Arc::new(MockImageGenerator::new());
    let pipeline = Pipeline::new(
        language_model.clone(),
        image_generator.clone(),
        shipped_templates(),
        OverlaySettings {
            font_path: Some(manifest_path("fonts/DejaVuSans.ttf")),
            font_size: 48.0,
        },
    );

    let report = pipeline
        .run(GenerationRequest {
            sketch: UploadedSketch::new(sketch_png()),
            instructions: UserInstructions {
                impression: "bright and modern".to_string(),
                details: "A: logo, B: headline".to_string(),
                size: ImageSize::Landscape,
            },
            overlay: Some(OverlayText {
                text: "Summer Sale\nUp to 50% off".to_string(),
                position: (64, 64),
                font_size: 72.0,
                color: DEFAULT_TEXT_COLOR,
            }),
        })
        .await;

    assert_eq!(report.stage(), Stage::Done, "warnings: {:?}", report.warnings);
    assert!(report.warnings.is_empty());
    assert_eq!(language_model.vision_calls(), 1);
    assert_eq!(language_model.text_calls(), 1);
    assert_eq!(image_generator.calls(), 1);

    // the shipped template carries the user's text through verbatim
    let instructions = language_model.instructions();
    assert!(instructions[1].contains("Canvas size: 1792x1024"));
    assert!(instructions[1].contains("A: logo, B: headline"));
    assert!(instructions[1].contains("bright and modern"));

    let image = report.image.expect("final image");
    assert!(image.overlaid);
    let decoded = image::load_from_memory(&image.bytes).expect("decode final image");
    assert_eq!((decoded.width(), decoded.height()), (1792, 1024));
}

#[tokio::test]
async fn test_refusal_never_reaches_the_image_model() {
    let language_model = Arc::new(MockLanguageModel::new(
        MockReply::Text("A: logo top left".to_string()),
        MockReply::Text("I'm so sorry, I can't help with that.".to_string()),
    ));
    let image_generator = Arc::new(MockImageGenerator::new());
    let pipeline = Pipeline::new(
        language_model.clone(),
        image_generator.clone(),
        shipped_templates(),
        OverlaySettings {
            font_path: None,
            font_size: 48.0,
        },
    );

    let report = pipeline
        .run(GenerationRequest {
            sketch: UploadedSketch::new(sketch_png()),
            instructions: UserInstructions {
                details: "A: logo".to_string(),
                ..Default::default()
            },
            overlay: None,
        })
        .await;

    assert_eq!(report.stage(), Stage::Failed);
    assert!(report.error.is_some());
    assert!(report.generation_prompt.is_some());
    assert_eq!(image_generator.calls(), 0);
}

#[test]
fn test_startup_config_from_cli() {
    let cli = CliOptions::try_parse_from([
        "roughbanner",
        "--openai-api-key",
        "sk-test",
        "--prompt-dir",
        manifest_path("prompts").to_str().expect("utf-8 path"),
        "--font-path",
        manifest_path("fonts/DejaVuSans.ttf")
            .to_str()
            .expect("utf-8 path"),
    ])
    .expect("parse cli");

    let config = AppConfig::from_options(&cli.providers).expect("startup config");
    assert!(config.overlay.font_path.is_some());
    assert!(config.templates.image_prompt_instruction.contains("{{ details }}"));
}
