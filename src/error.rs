//! Error handling

use std::path::PathBuf;

use axum::response::IntoResponse;
use tracing::info;

/// Everything that can go wrong while configuring or running the banner pipeline.
#[derive(Debug)]
pub enum BannerError {
    /// Missing template or credential, fatal before the server starts
    StartupConfig(String),
    /// Transport, auth or quota failure from an external model call
    ProviderCall {
        /// Which provider call failed, eg `openai chat`
        provider: &'static str,
        /// What the provider (or the transport) said
        message: String,
    },
    /// The call worked but there was nothing usable in the response
    EmptyResponse {
        /// Which provider call came back empty
        provider: &'static str,
    },
    /// The generated prompt reads like the model declined the request
    ImplicitRefusal(String),
    /// The overlay font could not be loaded
    FontResource {
        /// Path we tried to load
        path: PathBuf,
        /// Why it failed
        message: String,
    },
    /// Instruction template could not be filled in
    Template(String),
    /// Image decode/encode failure
    Image(String),
    /// When you didn't do the right thing
    BadRequest(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl BannerError {
    /// Shorthand for provider call failures.
    pub fn provider(provider: &'static str, message: impl ToString) -> Self {
        Self::ProviderCall {
            provider,
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for BannerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StartupConfig(msg) => write!(f, "Startup configuration error: {msg}"),
            Self::ProviderCall { provider, message } => {
                write!(f, "{provider} API error: {message}")
            }
            Self::EmptyResponse { provider } => {
                write!(f, "{provider} returned no usable content")
            }
            Self::ImplicitRefusal(_) => write!(
                f,
                "The text model could not build a prompt from the inputs or declined the request"
            ),
            Self::FontResource { path, message } => write!(
                f,
                "Font file is missing or unreadable ({}): {message}",
                path.display()
            ),
            Self::Template(msg) => write!(f, "Instruction template error: {msg}"),
            Self::Image(msg) => write!(f, "Image processing error: {msg}"),
            Self::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            Self::InternalServerError(msg) => write!(f, "Internal server error: {msg}"),
        }
    }
}

impl std::error::Error for BannerError {}

impl From<image::ImageError> for BannerError {
    fn from(err: image::ImageError) -> Self {
        BannerError::Image(err.to_string())
    }
}

impl From<std::io::Error> for BannerError {
    fn from(err: std::io::Error) -> Self {
        BannerError::InternalServerError(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for BannerError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        BannerError::BadRequest(err.to_string())
    }
}

impl IntoResponse for BannerError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            BannerError::BadRequest(msg) => {
                info!("Bad request received: {msg}");
                axum::http::StatusCode::BAD_REQUEST
            }
            BannerError::ProviderCall { .. } | BannerError::EmptyResponse { .. } => {
                tracing::error!("{self}");
                axum::http::StatusCode::BAD_GATEWAY
            }
            other => {
                tracing::error!("{other}");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let mut response = axum::response::Response::new(axum::body::Body::from(self.to_string()));
        *response.status_mut() = status;
        response
    }
}
