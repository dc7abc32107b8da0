pub(crate) use crate::error::BannerError;
pub(crate) use crate::web::AppState;
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::extract::{Multipart, State};
pub(crate) use chrono::Utc;
pub(crate) use tracing::{debug, info};
