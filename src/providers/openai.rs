//! OpenAI chat completions (text + vision) and the Images API.
//! Docs: https://platform.openai.com/docs/api-reference

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::{
    CompletionRequest, ImageGenerator, LanguageModel, SizeSupport, api_root, parse_json,
    send_for_bytes,
};
use crate::banner::{GeneratedImage, ImageSize};
use crate::error::BannerError;

const CHAT_PROVIDER: &str = "openai chat";
const IMAGES_PROVIDER: &str = "openai images";

// -----------------------------
// Chat completions
// -----------------------------

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: ChatContent<'a>,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum ChatContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pulls the first choice's text out of a chat completion body.
fn completion_text(bytes: &[u8]) -> Result<String, BannerError> {
    let parsed: ChatResponse = parse_json(CHAT_PROVIDER, bytes)?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(BannerError::EmptyResponse {
            provider: CHAT_PROVIDER,
        })
}

/// Chat completions client.
#[derive(Clone, Debug)]
pub struct OpenAiLanguageModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: Url,
}

impl OpenAiLanguageModel {
    /// `base_url` is the API root, eg `https://api.openai.com/v1/`.
    pub fn new(client: reqwest::Client, api_key: String, model: String, base_url: Url) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: api_root(base_url),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiLanguageModel {
    fn name(&self) -> &'static str {
        CHAT_PROVIDER
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, BannerError> {
        let content = match request.image {
            Some(image) => ChatContent::Parts(vec![
                ContentPart::Text {
                    text: request.instruction,
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                    },
                },
            ]),
            None => ChatContent::Text(request.instruction),
        };
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            max_tokens: request.max_tokens,
        };
        let endpoint = self
            .base_url
            .join("chat/completions")
            .map_err(|err| BannerError::provider(CHAT_PROVIDER, err))?;

        debug!(
            "Calling {} (model {}, image: {})",
            endpoint,
            self.model,
            request.image.is_some()
        );
        let bytes = send_for_bytes(
            CHAT_PROVIDER,
            self.client
                .post(endpoint)
                .bearer_auth(&self.api_key)
                .json(&body),
        )
        .await?;
        completion_text(&bytes)
    }
}

// -----------------------------
// Images API
// -----------------------------

/// Request body for POST /v1/images/generations
#[derive(Serialize, Debug)]
struct ImagesGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<&'a str>,

    // For dall-e models.
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct ImagesGenerateResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
    revised_prompt: Option<String>,
}

/// Where the generated image can be found.
#[derive(Debug, PartialEq)]
enum ImageLocation {
    Url(String),
    Inline(Vec<u8>),
}

fn image_location(bytes: &[u8]) -> Result<ImageLocation, BannerError> {
    let parsed: ImagesGenerateResponse = parse_json(IMAGES_PROVIDER, bytes)?;
    let first = parsed.data.into_iter().next().ok_or(BannerError::EmptyResponse {
        provider: IMAGES_PROVIDER,
    })?;

    if let Some(revised_prompt) = first.revised_prompt {
        debug!("Revised prompt from OpenAI: {revised_prompt}");
    }

    if let Some(url) = first.url.filter(|url| !url.is_empty()) {
        Ok(ImageLocation::Url(url))
    } else if let Some(b64_json) = first.b64_json {
        let bytes = general_purpose::STANDARD
            .decode(b64_json)
            .map_err(|err| BannerError::provider(IMAGES_PROVIDER, format!("bad base64: {err}")))?;
        Ok(ImageLocation::Inline(bytes))
    } else {
        Err(BannerError::EmptyResponse {
            provider: IMAGES_PROVIDER,
        })
    }
}

/// Images API client. dall-e models hand back a URL which is downloaded here.
#[derive(Clone, Debug)]
pub struct OpenAiImageGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: Url,
}

impl OpenAiImageGenerator {
    /// `base_url` is the API root, eg `https://api.openai.com/v1/`.
    pub fn new(client: reqwest::Client, api_key: String, model: String, base_url: Url) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: api_root(base_url),
        }
    }

    fn request_body<'a>(&'a self, prompt: &'a str, size: ImageSize) -> ImagesGenerateRequest<'a> {
        if self.model.starts_with("dall-e-3") {
            ImagesGenerateRequest {
                model: &self.model,
                prompt,
                n: 1,
                size: size.as_str(),
                quality: Some("standard"),
                style: Some("vivid"),
            }
        } else {
            ImagesGenerateRequest {
                model: &self.model,
                prompt,
                n: 1,
                size: size.as_str(),
                quality: None,
                style: None,
            }
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    fn name(&self) -> &'static str {
        IMAGES_PROVIDER
    }

    fn size_support(&self) -> SizeSupport {
        SizeSupport::Exact
    }

    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<GeneratedImage, BannerError> {
        let endpoint = self
            .base_url
            .join("images/generations")
            .map_err(|err| BannerError::provider(IMAGES_PROVIDER, err))?;
        let body = self.request_body(prompt, size);

        info!("Generating {} image with {}", size, self.model);
        let bytes = send_for_bytes(
            IMAGES_PROVIDER,
            self.client
                .post(endpoint)
                .bearer_auth(&self.api_key)
                .json(&body),
        )
        .await?;

        match image_location(&bytes)? {
            ImageLocation::Inline(bytes) => Ok(GeneratedImage {
                bytes,
                source_url: None,
            }),
            ImageLocation::Url(url) => {
                debug!("Downloading generated image from {url}");
                let bytes = send_for_bytes(IMAGES_PROVIDER, self.client.get(&url))
                    .await
                    .map_err(|err| match err {
                        BannerError::ProviderCall { message, .. } => BannerError::provider(
                            IMAGES_PROVIDER,
                            format!("image download failed ({url}): {message}"),
                        ),
                        other => other,
                    })?;
                if bytes.is_empty() {
                    return Err(BannerError::EmptyResponse {
                        provider: IMAGES_PROVIDER,
                    });
                }
                Ok(GeneratedImage {
                    bytes,
                    source_url: Some(url),
                })
            }
        }
    }
}
