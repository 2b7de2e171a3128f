//! Project notification email request.

use serde::Deserialize;

/// Request body for sending a project notification.
#[derive(Debug, Clone, Deserialize)]
pub struct SendEmailRequest {
    #[serde(default)]
    pub to_email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub message: String,
}
