//! Config handling

use std::path::PathBuf;

use tracing::log::LevelFilter;
use tracing::{info, warn};
use url::Url;

use crate::cli::{ImageProvider, LanguageProvider, ProviderOptions};
use crate::constants::MAX_FONT_SIZE;
use crate::error::BannerError;
use crate::overlay::font_size_in_range;
use crate::prompts::PromptTemplates;
use crate::providers::api_root;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Validated settings for the text/vision model.
#[derive(Clone, Debug)]
pub enum LanguageModelConfig {
    /// OpenAI chat completions
    OpenAi {
        /// API key
        api_key: String,
        /// Model name
        model: String,
        /// API root
        base_url: Url,
    },
    /// Google Gemini
    Gemini {
        /// API key
        api_key: String,
        /// Model name
        model: String,
        /// API root
        base_url: Url,
    },
}

/// Validated settings for the image model.
#[derive(Clone, Debug)]
pub enum ImageModelConfig {
    /// OpenAI Images API
    OpenAi {
        /// API key
        api_key: String,
        /// Model name
        model: String,
        /// API root
        base_url: Url,
    },
    /// Vertex AI Imagen
    Vertex {
        /// OAuth access token
        access_token: String,
        /// Google Cloud project
        project: String,
        /// Google Cloud region
        location: String,
        /// Model name
        model: String,
    },
}

/// Where overlay text is drawn from.
#[derive(Clone, Debug)]
pub struct OverlaySettings {
    /// Font file, `None` when it was missing at startup
    pub font_path: Option<PathBuf>,
    /// Default font size in pixels
    pub font_size: f32,
}

/// Everything the pipeline needs, built once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Text/vision model settings
    pub language_model: LanguageModelConfig,
    /// Image model settings
    pub image_model: ImageModelConfig,
    /// Instruction templates
    pub templates: PromptTemplates,
    /// Text overlay settings
    pub overlay: OverlaySettings,
}

/// Returns the trimmed value, or an error naming the missing key.
fn required(value: Option<&String>, key: &str) -> Result<String, BannerError> {
    match value.map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        Some(_) => Err(BannerError::StartupConfig(format!(
            "'{key}' is set but empty"
        ))),
        None => Err(BannerError::StartupConfig(format!("'{key}' is not set"))),
    }
}

impl LanguageModelConfig {
    /// Picks and validates the credentials the chosen provider needs.
    pub fn from_options(options: &ProviderOptions) -> Result<Self, BannerError> {
        Ok(match options.language_provider {
            LanguageProvider::Openai => LanguageModelConfig::OpenAi {
                api_key: required(options.openai_api_key.as_ref(), "OPENAI_API_KEY")?,
                model: options.openai_text_model.clone(),
                base_url: api_root(options.openai_base_url.clone()),
            },
            LanguageProvider::Gemini => LanguageModelConfig::Gemini {
                api_key: required(options.google_api_key.as_ref(), "GOOGLE_API_KEY")?,
                model: options.gemini_model.clone(),
                base_url: api_root(options.gemini_base_url.clone()),
            },
        })
    }
}

impl ImageModelConfig {
    /// Picks and validates the credentials the chosen provider needs.
    pub fn from_options(options: &ProviderOptions) -> Result<Self, BannerError> {
        Ok(match options.image_provider {
            ImageProvider::Openai => ImageModelConfig::OpenAi {
                api_key: required(options.openai_api_key.as_ref(), "OPENAI_API_KEY")?,
                model: options.openai_image_model.clone(),
                base_url: api_root(options.openai_base_url.clone()),
            },
            ImageProvider::Vertex => ImageModelConfig::Vertex {
                access_token: required(
                    options.vertex_access_token.as_ref(),
                    "VERTEX_ACCESS_TOKEN",
                )?,
                project: required(options.google_cloud_project.as_ref(), "GOOGLE_CLOUD_PROJECT")?,
                location: required(
                    options.google_cloud_location.as_ref(),
                    "GOOGLE_CLOUD_LOCATION",
                )?,
                model: options.imagen_model.clone(),
            },
        })
    }
}

impl OverlaySettings {
    /// Checks the font exists, a missing font disables the overlay with a warning.
    ///
    /// A default font size that the overlay would refuse is fatal.
    pub fn from_options(options: &ProviderOptions) -> Result<Self, BannerError> {
        if !font_size_in_range(options.font_size) {
            return Err(BannerError::StartupConfig(format!(
                "--font-size {} must be above 0 and at most {MAX_FONT_SIZE}",
                options.font_size
            )));
        }
        let font_path = if options.font_path.is_file() {
            Some(options.font_path.clone())
        } else {
            warn!(
                "Font file {} not found, text overlay is disabled",
                options.font_path.display()
            );
            None
        };
        Ok(Self {
            font_path,
            font_size: options.font_size,
        })
    }
}

impl AppConfig {
    /// Loads templates, validates credentials and checks the font.
    ///
    /// Templates and credentials are fatal, a missing font only disables the overlay.
    pub fn from_options(options: &ProviderOptions) -> Result<Self, BannerError> {
        let templates = PromptTemplates::load(&options.prompt_dir)?;
        let language_model = LanguageModelConfig::from_options(options)?;
        let image_model = ImageModelConfig::from_options(options)?;
        let overlay = OverlaySettings::from_options(options)?;

        info!(
            "Using {:?} language provider and {:?} image provider",
            options.language_provider, options.image_provider
        );

        Ok(Self {
            language_model,
            image_model,
            templates,
            overlay,
        })
    }
}
