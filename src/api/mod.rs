//! REST API module.
//!
//! Contains all API routes and handlers following the dashboard frontend contract.

mod auth;
mod collaborators;
mod email;
mod health;
mod projects;

pub use auth::*;
pub use collaborators::*;
pub use email::*;
pub use health::*;
pub use projects::*;

use axum::{
    extract::{FromRequest, FromRequestParts},
    http::Uri,
};
use serde::Serialize;

use crate::errors::AppError;

/// Response type for every handler.
pub type ApiResult<T> = Result<T, AppError>;

/// JSON body extractor whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections use the API error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Acknowledgement returned by write endpoints.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            id: None,
        }
    }

    pub fn with_id(message: impl Into<String>, id: i64) -> Self {
        Self {
            message: message.into(),
            id: Some(id),
        }
    }
}

/// Reject blank required fields.
pub(crate) fn require(value: &str, message: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(())
}

/// Fallback for unknown routes.
pub async fn route_not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
