//! Runs sketch → layout → prompt → image → overlay, stopping at the first failure.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::banner::{FinalImage, GeneratedImage, UploadedSketch, UserInstructions};
use crate::config::{AppConfig, OverlaySettings};
use crate::error::BannerError;
use crate::layout::analyze_layout;
use crate::overlay::{OverlayText, overlay_bytes};
use crate::prompts::PromptTemplates;
use crate::providers::{self, ImageGenerator, LanguageModel, SizeSupport};
use crate::synth::{looks_like_refusal, synthesize_prompt};

/// Shown when the form is submitted without a sketch or details.
pub const MISSING_INPUT_WARNING: &str =
    "Upload a layout sketch and fill in the element details before generating.";

/// Where a run is (or ended up).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// Waiting for valid input
    Idle,
    /// Vision model is describing the sketch
    AnalyzingLayout,
    /// Text model is writing the image prompt
    SynthesizingPrompt,
    /// Image model is rendering
    GeneratingImage,
    /// Text is being drawn onto the result
    Overlaying,
    /// Finished with an image
    Done,
    /// Stopped, see the report's error
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Idle => "idle",
            Stage::AnalyzingLayout => "analysing layout",
            Stage::SynthesizingPrompt => "synthesising prompt",
            Stage::GeneratingImage => "generating image",
            Stage::Overlaying => "overlaying text",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// One submit's worth of input.
#[derive(Clone, Debug, Default)]
pub struct GenerationRequest {
    /// The uploaded sketch, `None` when nothing was uploaded
    pub sketch: Option<UploadedSketch>,
    /// Form text
    pub instructions: UserInstructions,
    /// Text to draw on the result, skipped when `None` or blank
    pub overlay: Option<OverlayText>,
}

/// Everything a run produced, for display.
#[derive(Debug)]
pub struct PipelineReport {
    /// Every state visited, in order, starting with `Idle`
    pub stages: Vec<Stage>,
    /// Output of the layout analysis
    pub layout_description: Option<String>,
    /// Output of the prompt synthesis, kept even when it looks like a refusal
    pub generation_prompt: Option<String>,
    /// The image to show
    pub image: Option<FinalImage>,
    /// Non-fatal problems the user should know about
    pub warnings: Vec<String>,
    /// Why the run failed
    pub error: Option<BannerError>,
}

impl PipelineReport {
    fn new() -> Self {
        Self {
            stages: vec![Stage::Idle],
            layout_description: None,
            generation_prompt: None,
            image: None,
            warnings: Vec::new(),
            error: None,
        }
    }

    /// Current (or final) state.
    pub fn stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Idle)
    }

    fn advance(&mut self, stage: Stage) {
        info!("Pipeline: {} -> {}", self.stage(), stage);
        self.stages.push(stage);
    }

    fn fail(mut self, err: BannerError) -> Self {
        error!("Pipeline failed while {}: {}", self.stage(), err);
        self.stages.push(Stage::Failed);
        self.error = Some(err);
        self
    }
}

/// The banner pipeline with its providers and templates.
pub struct Pipeline {
    language_model: Arc<dyn LanguageModel>,
    image_generator: Arc<dyn ImageGenerator>,
    templates: PromptTemplates,
    overlay: OverlaySettings,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("language_model", &self.language_model.name())
            .field("image_generator", &self.image_generator.name())
            .field("overlay", &self.overlay)
            .finish()
    }
}

impl Pipeline {
    /// Assembles a pipeline from ready-made parts.
    pub fn new(
        language_model: Arc<dyn LanguageModel>,
        image_generator: Arc<dyn ImageGenerator>,
        templates: PromptTemplates,
        overlay: OverlaySettings,
    ) -> Self {
        Self {
            language_model,
            image_generator,
            templates,
            overlay,
        }
    }

    /// Builds the configured providers on a shared HTTP client.
    pub fn from_config(config: &AppConfig) -> Self {
        let client = reqwest::Client::new();
        Self::new(
            providers::language_model(&config.language_model, client.clone()),
            providers::image_generator(&config.image_model, client),
            config.templates.clone(),
            config.overlay.clone(),
        )
    }

    /// Overlay defaults, used to prefill the form.
    pub fn overlay_settings(&self) -> &OverlaySettings {
        &self.overlay
    }

    /// Names of the text and image providers in use.
    pub fn provider_names(&self) -> (&'static str, &'static str) {
        (self.language_model.name(), self.image_generator.name())
    }

    /// Runs one request to completion. Never panics on provider output,
    /// every failure ends up in the report.
    pub async fn run(&self, request: GenerationRequest) -> PipelineReport {
        let mut report = PipelineReport::new();

        let Some(sketch) = request.sketch.as_ref() else {
            warn!("Generation requested without a sketch");
            report.warnings.push(MISSING_INPUT_WARNING.to_string());
            return report;
        };
        if request.instructions.details.trim().is_empty() {
            warn!("Generation requested without details");
            report.warnings.push(MISSING_INPUT_WARNING.to_string());
            return report;
        }

        report.advance(Stage::AnalyzingLayout);
        let layout = match analyze_layout(
            self.language_model.as_ref(),
            sketch,
            &self.templates.layout_analysis,
        )
        .await
        {
            Ok(layout) => layout,
            Err(err) => return report.fail(err),
        };
        report.layout_description = Some(layout.clone());

        report.advance(Stage::SynthesizingPrompt);
        let prompt = match synthesize_prompt(
            self.language_model.as_ref(),
            &self.templates.image_prompt_instruction,
            &layout,
            &request.instructions,
        )
        .await
        {
            Ok(prompt) => prompt,
            Err(err) => return report.fail(err),
        };
        report.generation_prompt = Some(prompt.clone());
        if looks_like_refusal(&prompt) {
            return report.fail(BannerError::ImplicitRefusal(prompt));
        }

        report.advance(Stage::GeneratingImage);
        let size = request.instructions.size;
        if self.image_generator.size_support() == SizeSupport::AspectRatio {
            report.warnings.push(format!(
                "{} only follows the {} aspect ratio of {}, it picks the pixel size itself.",
                self.image_generator.name(),
                size.aspect_ratio(),
                size
            ));
        }
        let generated = match self.image_generator.generate(&prompt, size).await {
            Ok(generated) if !generated.bytes.is_empty() => generated,
            Ok(_) => {
                return report.fail(BannerError::EmptyResponse {
                    provider: self.image_generator.name(),
                });
            }
            Err(err) => return report.fail(err),
        };

        let overlay = request
            .overlay
            .filter(|overlay| !overlay.text.trim().is_empty());
        let final_image = match overlay {
            Some(overlay) => {
                report.advance(Stage::Overlaying);
                self.apply_overlay(generated, &overlay, &mut report.warnings)
            }
            None => FinalImage::from_generated(generated),
        };

        report.image = Some(final_image);
        report.advance(Stage::Done);
        report
    }

    /// Draws the overlay, falling back to the plain image with a warning.
    fn apply_overlay(
        &self,
        generated: GeneratedImage,
        overlay: &OverlayText,
        warnings: &mut Vec<String>,
    ) -> FinalImage {
        let Some(font_path) = self.overlay.font_path.as_deref() else {
            warnings.push("No font file is available, showing the image without text.".to_string());
            return FinalImage::from_generated(generated);
        };

        let overlaid = overlay_bytes(&generated.bytes, overlay, font_path)
            .and_then(|image| FinalImage::from_overlay(&image, generated.source_url.clone()));
        match overlaid {
            Ok(final_image) => final_image,
            Err(err) => {
                warn!("Skipping text overlay: {err}");
                warnings.push(format!("{err}. Showing the image without text."));
                FinalImage::from_generated(generated)
            }
        }
    }
}
