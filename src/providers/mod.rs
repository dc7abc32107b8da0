//! Hosted model providers behind two small traits, so the pipeline does not
//! care which vendor answers.

pub mod google;
pub mod mock;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::banner::{GeneratedImage, ImageSize, UploadedSketch};
use crate::config::{ImageModelConfig, LanguageModelConfig};
use crate::error::BannerError;

pub use google::{GeminiLanguageModel, VertexImagenGenerator};
pub use mock::{MockImageGenerator, MockLanguageModel, MockReply};
pub use openai::{OpenAiImageGenerator, OpenAiLanguageModel};

/// Longest provider error body we echo back to the user.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// A single-turn completion request.
#[derive(Clone, Copy, Debug)]
pub struct CompletionRequest<'a> {
    /// Instruction text
    pub instruction: &'a str,
    /// Optional image sent alongside the instruction
    pub image: Option<&'a UploadedSketch>,
    /// Completion budget
    pub max_tokens: u32,
}

/// A text model, vision capable when `image` is set.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Short name for logs and error messages
    fn name(&self) -> &'static str;

    /// Returns the raw completion text. An empty completion is an error.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, BannerError>;
}

/// How faithfully a provider follows the requested output size.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SizeSupport {
    /// Pixel dimensions are honoured
    Exact,
    /// Only the aspect ratio is honoured, the provider picks the pixel size
    AspectRatio,
}

/// Turns a prompt into image bytes.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Short name for logs and error messages
    fn name(&self) -> &'static str;

    /// What happens to the requested size
    fn size_support(&self) -> SizeSupport;

    /// Generates exactly one image.
    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<GeneratedImage, BannerError>;
}

/// Builds the configured language model.
pub fn language_model(
    config: &LanguageModelConfig,
    client: reqwest::Client,
) -> Arc<dyn LanguageModel> {
    match config {
        LanguageModelConfig::OpenAi {
            api_key,
            model,
            base_url,
        } => Arc::new(OpenAiLanguageModel::new(
            client,
            api_key.clone(),
            model.clone(),
            base_url.clone(),
        )),
        LanguageModelConfig::Gemini {
            api_key,
            model,
            base_url,
        } => Arc::new(GeminiLanguageModel::new(
            client,
            api_key.clone(),
            model.clone(),
            base_url.clone(),
        )),
    }
}

/// Builds the configured image generator.
pub fn image_generator(config: &ImageModelConfig, client: reqwest::Client) -> Arc<dyn ImageGenerator> {
    match config {
        ImageModelConfig::OpenAi {
            api_key,
            model,
            base_url,
        } => Arc::new(OpenAiImageGenerator::new(
            client,
            api_key.clone(),
            model.clone(),
            base_url.clone(),
        )),
        ImageModelConfig::Vertex {
            access_token,
            project,
            location,
            model,
        } => Arc::new(VertexImagenGenerator::new(
            client,
            access_token.clone(),
            project.clone(),
            location.clone(),
            model.clone(),
        )),
    }
}

/// Makes sure the API root ends in `/`, otherwise `Url::join` replaces its
/// last segment (`.../v1` + `chat/completions` would lose the `v1`).
pub(crate) fn api_root(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Sends a request and returns the body, non-2xx responses become errors
/// carrying (a prefix of) the body.
pub(crate) async fn send_for_bytes(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<Vec<u8>, BannerError> {
    let resp = request
        .send()
        .await
        .map_err(|err| BannerError::provider(provider, format!("request failed: {err}")))?;
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|err| BannerError::provider(provider, format!("failed reading body: {err}")))?;
    debug!("{provider} responded {status} with {} bytes", bytes.len());

    if !status.is_success() {
        let body: String = String::from_utf8_lossy(&bytes)
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect();
        return Err(BannerError::provider(provider, format!("{status}: {body}")));
    }
    Ok(bytes.to_vec())
}

/// Parses a JSON body, naming the provider on failure.
pub(crate) fn parse_json<T: for<'de> serde::Deserialize<'de>>(
    provider: &'static str,
    bytes: &[u8],
) -> Result<T, BannerError> {
    serde_json::from_slice(bytes)
        .map_err(|err| BannerError::provider(provider, format!("unexpected response JSON: {err}")))
}
