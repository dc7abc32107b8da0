//! Google providers: Gemini for text/vision, Vertex AI Imagen for images.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use super::{
    CompletionRequest, ImageGenerator, LanguageModel, SizeSupport, api_root, parse_json,
    send_for_bytes,
};
use crate::banner::{GeneratedImage, ImageSize};
use crate::error::BannerError;

const GEMINI_PROVIDER: &str = "gemini";
const IMAGEN_PROVIDER: &str = "vertex imagen";

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Joins the text parts of the first candidate.
fn candidate_text(bytes: &[u8]) -> Result<String, BannerError> {
    let parsed: GenerateContentResponse = parse_json(GEMINI_PROVIDER, bytes)?;
    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(BannerError::EmptyResponse {
            provider: GEMINI_PROVIDER,
        });
    }
    Ok(text)
}

/// Gemini generateContent client.
#[derive(Clone, Debug)]
pub struct GeminiLanguageModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: Url,
}

impl GeminiLanguageModel {
    /// `base_url` is the API root, eg `https://generativelanguage.googleapis.com/v1beta/`.
    pub fn new(client: reqwest::Client, api_key: String, model: String, base_url: Url) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: api_root(base_url),
        }
    }
}

fn generate_content_body(request: &CompletionRequest<'_>) -> serde_json::Value {
    let mut parts = vec![json!({ "text": request.instruction })];
    if let Some(image) = request.image {
        parts.push(json!({
            "inline_data": {
                "mime_type": image.mime_type(),
                "data": image.base64(),
            }
        }));
    }
    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": { "maxOutputTokens": request.max_tokens },
    })
}

#[async_trait]
impl LanguageModel for GeminiLanguageModel {
    fn name(&self) -> &'static str {
        GEMINI_PROVIDER
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, BannerError> {
        let endpoint = self
            .base_url
            .join(&format!("models/{}:generateContent", self.model))
            .map_err(|err| BannerError::provider(GEMINI_PROVIDER, err))?;
        debug!(
            "Calling {} (image: {})",
            endpoint,
            request.image.is_some()
        );

        let bytes = send_for_bytes(
            GEMINI_PROVIDER,
            self.client
                .post(endpoint)
                .header("x-goog-api-key", &self.api_key)
                .json(&generate_content_body(&request)),
        )
        .await?;
        candidate_text(&bytes)
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PredictParameters<'a> {
    sample_count: u8,
    aspect_ratio: &'a str,
}

#[derive(Deserialize, Debug)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
}

fn prediction_bytes(bytes: &[u8]) -> Result<Vec<u8>, BannerError> {
    let parsed: PredictResponse = parse_json(IMAGEN_PROVIDER, bytes)?;
    let encoded = parsed
        .predictions
        .into_iter()
        .find_map(|prediction| prediction.bytes_base64_encoded)
        .ok_or(BannerError::EmptyResponse {
            provider: IMAGEN_PROVIDER,
        })?;
    general_purpose::STANDARD
        .decode(encoded)
        .map_err(|err| BannerError::provider(IMAGEN_PROVIDER, format!("bad base64: {err}")))
}

/// Vertex AI Imagen client, scoped to a project and region.
#[derive(Clone, Debug)]
pub struct VertexImagenGenerator {
    client: reqwest::Client,
    access_token: String,
    project: String,
    location: String,
    model: String,
}

impl VertexImagenGenerator {
    /// Creates a client for `projects/{project}/locations/{location}`.
    pub fn new(
        client: reqwest::Client,
        access_token: String,
        project: String,
        location: String,
        model: String,
    ) -> Self {
        Self {
            client,
            access_token,
            project,
            location,
            model,
        }
    }

    fn endpoint(&self) -> Result<Url, BannerError> {
        let raw = format!(
            "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:predict",
            location = self.location,
            project = self.project,
            model = self.model,
        );
        Url::parse(&raw).map_err(|err| BannerError::provider(IMAGEN_PROVIDER, err))
    }
}

#[async_trait]
impl ImageGenerator for VertexImagenGenerator {
    fn name(&self) -> &'static str {
        IMAGEN_PROVIDER
    }

    fn size_support(&self) -> SizeSupport {
        SizeSupport::AspectRatio
    }

    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<GeneratedImage, BannerError> {
        let endpoint = self.endpoint()?;
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": PredictParameters {
                sample_count: 1,
                aspect_ratio: size.aspect_ratio(),
            },
        });

        info!(
            "Generating {} image with {} in {}",
            size.aspect_ratio(),
            self.model,
            self.location
        );
        let bytes = send_for_bytes(
            IMAGEN_PROVIDER,
            self.client
                .post(endpoint)
                .bearer_auth(&self.access_token)
                .json(&body),
        )
        .await?;
        Ok(GeneratedImage {
            bytes: prediction_bytes(&bytes)?,
            source_url: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banner::UploadedSketch;

    #[test]
    fn candidate_parts_are_joined() {
        let body = br#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Logo top left. "},{"text":"Headline centre."}]}}]}"#;
        assert_eq!(
            candidate_text(body).expect("text"),
            "Logo top left. Headline centre."
        );
    }

    #[test]
    fn blocked_candidate_is_empty() {
        let body = br#"{"candidates":[{"finishReason":"SAFETY"}]}"#;
        assert!(matches!(
            candidate_text(body),
            Err(BannerError::EmptyResponse { .. })
        ));
        assert!(matches!(
            candidate_text(br#"{}"#),
            Err(BannerError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn vision_body_inlines_the_sketch() {
        let sketch = UploadedSketch::new(b"not really a jpeg".to_vec()).expect("non-empty");
        let request = CompletionRequest {
            instruction: "describe the layout",
            image: Some(&sketch),
            max_tokens: 1000,
        };
        let body = generate_content_body(&request);
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "describe the layout");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], sketch.base64());
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn prediction_bytes_are_decoded() {
        let body = br#"{"predictions":[{"mimeType":"image/png","bytesBase64Encoded":"aGVsbG8="}]}"#;
        assert_eq!(prediction_bytes(body).expect("bytes"), b"hello");
        assert!(matches!(
            prediction_bytes(br#"{"predictions":[]}"#),
            Err(BannerError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn endpoint_is_region_scoped() {
        let generator = VertexImagenGenerator::new(
            reqwest::Client::new(),
            "token".to_string(),
            "banners".to_string(),
            "us-central1".to_string(),
            "imagen-3.0-generate-002".to_string(),
        );
        assert_eq!(
            generator.endpoint().expect("url").as_str(),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/banners/locations/us-central1/publishers/google/models/imagen-3.0-generate-002:predict"
        );
    }

    #[test]
    fn gemini_root_without_trailing_slash_keeps_the_version() {
        let model = GeminiLanguageModel::new(
            reqwest::Client::new(),
            "key".to_string(),
            "gemini-2.0-flash".to_string(),
            Url::parse("https://generativelanguage.googleapis.com/v1beta").expect("url"),
        );
        assert_eq!(
            model
                .base_url
                .join("models/gemini-2.0-flash:generateContent")
                .expect("join")
                .as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
