//! CLI parser
use clap::{Args, Parser, ValueEnum};
use std::num::NonZeroU16;
use std::path::PathBuf;
use url::Url;

use crate::constants::{
    DEFAULT_FONT_PATH, DEFAULT_FONT_SIZE, DEFAULT_GEMINI_MODEL, DEFAULT_IMAGEN_MODEL,
    DEFAULT_OPENAI_IMAGE_MODEL, DEFAULT_OPENAI_TEXT_MODEL, DEFAULT_PROMPT_DIR, GEMINI_BASE_URL,
    OPENAI_BASE_URL,
};

/// Which service describes the sketch and writes the image prompt.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum LanguageProvider {
    /// OpenAI chat completions (vision capable model)
    Openai,
    /// Google Gemini generateContent
    Gemini,
}

/// Which service renders the banner.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ImageProvider {
    /// OpenAI Images API, returns a URL
    Openai,
    /// Vertex AI Imagen, returns the bytes
    Vertex,
}

#[derive(Args, Debug, Clone)]
/// Provider, credential and resource options shared by the server and the one-shot CLI
pub struct ProviderOptions {
    #[arg(long, value_enum, default_value = "openai", env = "ROUGHBANNER_LANGUAGE_PROVIDER")]
    /// Language model used for layout analysis and prompt synthesis.
    /// Env: ROUGHBANNER_LANGUAGE_PROVIDER
    pub language_provider: LanguageProvider,

    #[arg(long, value_enum, default_value = "openai", env = "ROUGHBANNER_IMAGE_PROVIDER")]
    /// Image generation provider.
    /// Env: ROUGHBANNER_IMAGE_PROVIDER
    pub image_provider: ImageProvider,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Google API key, used by Gemini
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// OAuth access token for Vertex AI
    #[arg(long, env = "VERTEX_ACCESS_TOKEN", hide_env_values = true)]
    pub vertex_access_token: Option<String>,

    /// Google Cloud project hosting Vertex AI
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT")]
    pub google_cloud_project: Option<String>,

    /// Google Cloud region for Vertex AI, eg `us-central1`
    #[arg(long, env = "GOOGLE_CLOUD_LOCATION")]
    pub google_cloud_location: Option<String>,

    /// OpenAI chat model, must accept images
    #[arg(long, default_value = DEFAULT_OPENAI_TEXT_MODEL)]
    pub openai_text_model: String,

    /// OpenAI image model
    #[arg(long, default_value = DEFAULT_OPENAI_IMAGE_MODEL)]
    pub openai_image_model: String,

    /// Gemini model
    #[arg(long, default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// Vertex AI Imagen model
    #[arg(long, default_value = DEFAULT_IMAGEN_MODEL)]
    pub imagen_model: String,

    /// OpenAI API root
    #[arg(long, default_value = OPENAI_BASE_URL, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Url,

    /// Gemini API root
    #[arg(long, default_value = GEMINI_BASE_URL)]
    pub gemini_base_url: Url,

    #[arg(long, default_value = DEFAULT_PROMPT_DIR, env = "ROUGHBANNER_PROMPT_DIR")]
    /// Directory holding the instruction templates.
    /// Env: ROUGHBANNER_PROMPT_DIR
    pub prompt_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_FONT_PATH, env = "ROUGHBANNER_FONT_PATH")]
    /// Font used to overlay text, pick one that covers your script.
    /// Env: ROUGHBANNER_FONT_PATH
    pub font_path: PathBuf,

    #[arg(long, default_value_t = DEFAULT_FONT_SIZE)]
    /// Default overlay font size in pixels
    pub font_size: f32,
}

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "ROUGHBANNER_DEBUG")]
    /// Enable debug logging. Env: ROUGHBANNER_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "ROUGHBANNER_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: ROUGHBANNER_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "ROUGHBANNER_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: ROUGHBANNER_LISTEN_ADDRESS
    pub listen_address: String,

    #[command(flatten)]
    /// Provider, credential and resource settings
    pub providers: ProviderOptions,
}
