//! Prompt synthesis: turn the layout plus the user's instructions into an
//! image generation prompt.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::banner::UserInstructions;
use crate::constants::{PROMPT_MAX_TOKENS, REFUSAL_MARKER};
use crate::error::BannerError;
use crate::prompts::render_template;
use crate::providers::{CompletionRequest, LanguageModel};

/// Heuristic for "the model declined": the text mentions being sorry.
///
/// Text models don't give us a structured refusal, so this is all we have.
pub fn looks_like_refusal(text: &str) -> bool {
    text.to_lowercase().contains(REFUSAL_MARKER)
}

/// Fills the instruction template for one request.
pub fn build_instruction(
    template: &str,
    layout_description: &str,
    instructions: &UserInstructions,
) -> Result<String, BannerError> {
    let values = HashMap::from([
        ("size", instructions.size.as_str()),
        ("layout_info", layout_description),
        ("impression", instructions.impression.as_str()),
        ("details", instructions.details.as_str()),
    ]);
    render_template(template, &values)
}

/// Asks the text model for an image prompt. Returns the trimmed text.
///
/// The refusal check is left to the caller so the offending text can still be shown.
pub async fn synthesize_prompt(
    model: &dyn LanguageModel,
    template: &str,
    layout_description: &str,
    instructions: &UserInstructions,
) -> Result<String, BannerError> {
    if template.trim().is_empty() {
        return Err(BannerError::Template(
            "image prompt instruction template is empty".to_string(),
        ));
    }
    let instruction = build_instruction(template, layout_description, instructions)?;
    debug!("Prompt synthesis instruction is {} chars", instruction.len());

    info!("Synthesising image prompt with {}", model.name());
    let text = model
        .complete(CompletionRequest {
            instruction: &instruction,
            image: None,
            max_tokens: PROMPT_MAX_TOKENS,
        })
        .await?;

    let text = text.trim();
    if text.is_empty() {
        return Err(BannerError::EmptyResponse {
            provider: model.name(),
        });
    }
    Ok(text.to_string())
}
