//! Shared constants/defaults for things
//!

/// Default directory holding the instruction templates.
pub const DEFAULT_PROMPT_DIR: &str = "./prompts";

/// File name of the fixed layout analysis instruction.
pub const LAYOUT_ANALYSIS_PROMPT_FILE: &str = "layout_analysis_prompt.txt";

/// File name of the image prompt instruction template.
pub const IMAGE_PROMPT_TEMPLATE_FILE: &str = "dalle_prompt_instruction_template.txt";

/// Default font used by the text overlay.
pub const DEFAULT_FONT_PATH: &str = "./fonts/DejaVuSans.ttf";

/// Default overlay font size, in pixels.
pub const DEFAULT_FONT_SIZE: f32 = 48.0;

/// Largest overlay font size, in pixels. Glyph rasterising allocates per pixel
/// of the glyph box, so this bounds memory per request.
pub const MAX_FONT_SIZE: f32 = 512.0;

/// Completion budget for the layout analysis call.
pub const LAYOUT_MAX_TOKENS: u32 = 1000;

/// Completion budget for the prompt synthesis call.
pub const PROMPT_MAX_TOKENS: u32 = 1500;

/// Marker that the upstream text model declined to help.
pub const REFUSAL_MARKER: &str = "sorry";

/// MIME type used when the sketch format can't be sniffed.
pub const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// Largest accepted request body, the sketch upload dominates this.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Stylesheet directory, served under `/static`.
pub const STATIC_DIR: &str = "./static";

/// OpenAI API root.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1/";

/// Gemini API root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Default OpenAI chat model, it needs vision support.
pub const DEFAULT_OPENAI_TEXT_MODEL: &str = "gpt-4o";

/// Default OpenAI image model.
pub const DEFAULT_OPENAI_IMAGE_MODEL: &str = "dall-e-3";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Default Vertex AI Imagen model.
pub const DEFAULT_IMAGEN_MODEL: &str = "imagen-3.0-generate-002";
