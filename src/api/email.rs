//! Email notification endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use super::{require, ApiJson, ApiResult};
use crate::errors::AppError;
use crate::mail::{MailError, OutgoingEmail};
use crate::models::SendEmailRequest;
use crate::AppState;

/// Body returned when an email was handed to the relay.
#[derive(Debug, Serialize)]
pub struct EmailResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/send-email - Send a project notification email.
pub async fn send_email(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendEmailRequest>,
) -> ApiResult<Json<EmailResponse>> {
    require(&request.to_email, "Recipient address (to_email) is required")?;
    require(&request.subject, "Subject is required")?;

    let email = OutgoingEmail::project_notification(
        &request.to_email,
        &request.subject,
        &request.project_name,
        &request.message,
    )
    .map_err(|e| AppError::Validation(e.to_string()))?;

    let mailer = state.mailer.as_ref().ok_or(MailError::NotConfigured)?;
    mailer.send(&email).await?;

    Ok(Json(EmailResponse {
        success: true,
        message: "Email sent successfully".to_string(),
    }))
}
