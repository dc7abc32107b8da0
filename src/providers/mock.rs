//! Offline stand-ins for the hosted models, used by `--dry-run` and the tests.

use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};

use super::{CompletionRequest, ImageGenerator, LanguageModel, SizeSupport};
use crate::banner::{GeneratedImage, ImageSize};
use crate::error::BannerError;

const MOCK_PROVIDER: &str = "mock";

/// What a mock call answers with.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Succeed with this text
    Text(String),
    /// Succeed with nothing usable
    Empty,
    /// Fail as if the provider errored
    Error(String),
}

impl MockReply {
    fn answer(&self) -> Result<String, BannerError> {
        match self {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Empty => Err(BannerError::EmptyResponse {
                provider: MOCK_PROVIDER,
            }),
            MockReply::Error(message) => Err(BannerError::provider(MOCK_PROVIDER, message)),
        }
    }
}

/// Answers vision requests with `layout` and text-only requests with `prompt`.
#[derive(Debug)]
pub struct MockLanguageModel {
    layout: MockReply,
    prompt: MockReply,
    vision_calls: AtomicUsize,
    text_calls: AtomicUsize,
    instructions: Mutex<Vec<String>>,
}

impl MockLanguageModel {
    /// Scripted replies for the two kinds of call.
    pub fn new(layout: MockReply, prompt: MockReply) -> Self {
        Self {
            layout,
            prompt,
            vision_calls: AtomicUsize::new(0),
            text_calls: AtomicUsize::new(0),
            instructions: Mutex::new(Vec::new()),
        }
    }

    /// Canned replies that describe a plausible banner.
    pub fn canned() -> Self {
        Self::new(
            MockReply::Text(
                "A: logo in the top left corner. B: large headline across the centre. \
                 C: call to action button bottom right."
                    .to_string(),
            ),
            MockReply::Text(
                "A clean, bright web banner with a small logo top left, a bold centred \
                 headline and a rounded call to action button bottom right."
                    .to_string(),
            ),
        )
    }

    /// Calls that carried an image.
    pub fn vision_calls(&self) -> usize {
        self.vision_calls.load(Ordering::SeqCst)
    }

    /// Calls without an image.
    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    /// Every instruction received, in order.
    pub fn instructions(&self) -> Vec<String> {
        self.instructions
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn name(&self) -> &'static str {
        MOCK_PROVIDER
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, BannerError> {
        if let Ok(mut guard) = self.instructions.lock() {
            guard.push(request.instruction.to_string());
        }
        if request.image.is_some() {
            self.vision_calls.fetch_add(1, Ordering::SeqCst);
            self.layout.answer()
        } else {
            self.text_calls.fetch_add(1, Ordering::SeqCst);
            self.prompt.answer()
        }
    }
}

/// Paints a flat canvas of the requested size, or fails on demand.
#[derive(Debug)]
pub struct MockImageGenerator {
    fail_with: Option<String>,
    size_support: SizeSupport,
    calls: AtomicUsize,
}

impl MockImageGenerator {
    /// A generator that always succeeds.
    pub fn new() -> Self {
        Self {
            fail_with: None,
            size_support: SizeSupport::Exact,
            calls: AtomicUsize::new(0),
        }
    }

    /// A generator that always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// Pretend to be a provider with different size handling.
    pub fn with_size_support(mut self, size_support: SizeSupport) -> Self {
        self.size_support = size_support;
        self
    }

    /// Number of generate calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn dimensions(size: ImageSize) -> (u32, u32) {
    match size {
        ImageSize::Square => (1024, 1024),
        ImageSize::Landscape => (1792, 1024),
        ImageSize::Portrait => (1024, 1792),
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    fn name(&self) -> &'static str {
        MOCK_PROVIDER
    }

    fn size_support(&self) -> SizeSupport {
        self.size_support
    }

    async fn generate(&self, prompt: &str, size: ImageSize) -> Result<GeneratedImage, BannerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            return Err(BannerError::provider(MOCK_PROVIDER, message));
        }
        if prompt.trim().is_empty() {
            return Err(BannerError::EmptyResponse {
                provider: MOCK_PROVIDER,
            });
        }

        let (width, height) = dimensions(size);
        let canvas = RgbImage::from_pixel(width, height, Rgb([236, 240, 244]));
        let mut buf = Cursor::new(Vec::new());
        canvas.write_to(&mut buf, ImageFormat::Png)?;
        Ok(GeneratedImage {
            bytes: buf.into_inner(),
            source_url: None,
        })
    }
}
