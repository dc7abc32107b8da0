//! Layout analysis: ask a vision model what is where on the sketch.

use tracing::{debug, info};

use crate::banner::UploadedSketch;
use crate::constants::LAYOUT_MAX_TOKENS;
use crate::error::BannerError;
use crate::providers::{CompletionRequest, LanguageModel};

/// Describes the sketch's layout as free text.
pub async fn analyze_layout(
    model: &dyn LanguageModel,
    sketch: &UploadedSketch,
    instruction: &str,
) -> Result<String, BannerError> {
    if instruction.trim().is_empty() {
        return Err(BannerError::Template(
            "layout analysis instruction is empty".to_string(),
        ));
    }

    info!(
        "Analysing {} byte {} sketch with {}",
        sketch.bytes().len(),
        sketch.mime_type(),
        model.name()
    );
    let text = model
        .complete(CompletionRequest {
            instruction,
            image: Some(sketch),
            max_tokens: LAYOUT_MAX_TOKENS,
        })
        .await?;

    let text = text.trim();
    if text.is_empty() {
        return Err(BannerError::EmptyResponse {
            provider: model.name(),
        });
    }
    debug!("Layout description: {text}");
    Ok(text.to_string())
}
