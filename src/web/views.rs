use super::form::GenerateForm;
use super::prelude::*;
use crate::banner::ImageSize;
use crate::pipeline::{PipelineReport, Stage};

#[derive(Clone, Debug)]
pub(crate) struct SizeOption {
    pub(crate) value: &'static str,
    pub(crate) selected: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) sizes: Vec<SizeOption>,
    pub(crate) font_size: String,
    pub(crate) overlay_available: bool,
    pub(crate) language_provider: String,
    pub(crate) image_provider: String,
}

#[derive(Clone, Debug)]
pub(crate) struct StageView {
    pub(crate) label: String,
    pub(crate) class: &'static str,
}

#[derive(Template, WebTemplate)]
#[template(path = "result.html")]
pub(crate) struct ResultTemplate {
    pub(crate) stages: Vec<StageView>,
    pub(crate) succeeded: bool,
    pub(crate) has_layout: bool,
    pub(crate) layout_description: String,
    pub(crate) has_prompt: bool,
    pub(crate) generation_prompt: String,
    pub(crate) warnings: Vec<String>,
    pub(crate) has_sketch: bool,
    pub(crate) sketch_data_url: String,
    pub(crate) has_error: bool,
    pub(crate) error_message: String,
    pub(crate) has_image: bool,
    pub(crate) image_data_url: String,
    pub(crate) image_overlaid: bool,
    pub(crate) download_name: String,
}

impl ResultTemplate {
    /// `sketch_data_url` is the upload, shown next to what came out of it.
    pub(crate) fn new(report: PipelineReport, sketch_data_url: Option<String>) -> Self {
        let last = report.stage();
        let stages = report
            .stages
            .iter()
            .map(|stage| StageView {
                label: stage.to_string(),
                class: match stage {
                    Stage::Failed => "stage failed",
                    Stage::Done => "stage done",
                    _ if *stage == last => "stage current",
                    _ => "stage",
                },
            })
            .collect();

        let (has_image, image_data_url, image_overlaid, download_name) = match &report.image {
            Some(image) => (
                true,
                image.data_url(),
                image.overlaid,
                format!(
                    "banner_{}.{}",
                    Utc::now().format("%Y%m%d_%H%M%S"),
                    image.extension()
                ),
            ),
            None => (false, String::new(), false, String::new()),
        };

        Self {
            stages,
            succeeded: last == Stage::Done,
            has_layout: report.layout_description.is_some(),
            layout_description: report.layout_description.unwrap_or_default(),
            has_prompt: report.generation_prompt.is_some(),
            generation_prompt: report.generation_prompt.unwrap_or_default(),
            warnings: report.warnings,
            has_sketch: sketch_data_url.is_some(),
            sketch_data_url: sketch_data_url.unwrap_or_default(),
            has_error: report.error.is_some(),
            error_message: report
                .error
                .map(|err| err.to_string())
                .unwrap_or_default(),
            has_image,
            image_data_url,
            image_overlaid,
            download_name,
        }
    }
}

/// handles the / GET
pub(crate) async fn index_handler(State(state): State<AppState>) -> IndexTemplate {
    let overlay = state.pipeline.overlay_settings();
    let (language_provider, image_provider) = state.pipeline.provider_names();
    IndexTemplate {
        sizes: ImageSize::ALL
            .iter()
            .map(|size| SizeOption {
                value: size.as_str(),
                selected: *size == ImageSize::default(),
            })
            .collect(),
        font_size: overlay.font_size.to_string(),
        overlay_available: overlay.font_path.is_some(),
        language_provider: language_provider.to_string(),
        image_provider: image_provider.to_string(),
    }
}

/// Runs the pipeline once for the submitted form.
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<ResultTemplate, BannerError> {
    let form = GenerateForm::from_multipart(multipart).await?;
    debug!(
        "Form with {} byte sketch, size {:?}",
        form.sketch.len(),
        form.size
    );
    let request = form.into_request(state.pipeline.overlay_settings())?;
    let sketch_data_url = request.sketch.as_ref().map(|sketch| sketch.data_url());
    let report = state.pipeline.run(request).await;
    info!("Generation finished in state {}", report.stage());
    Ok(ResultTemplate::new(report, sketch_data_url))
}
