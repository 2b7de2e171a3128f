//! User registration, login and password change endpoints.
//!
//! Login is stateless: a successful check returns a message, never a session.

use axum::{extract::State, http::StatusCode, Json};

use super::{require, ApiJson, ApiResult, MessageResponse};
use crate::auth::{hash_password_blocking, verify_password_blocking};
use crate::errors::AppError;
use crate::models::{ChangePasswordRequest, CredentialsRequest};
use crate::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// POST /api/register - Create an account.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CredentialsRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    require(&request.username, "Username and password are required")?;
    require(&request.password, "Username and password are required")?;

    let username = request.username.trim();
    if state.repo.get_user_by_username(username).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let hash = hash_password_blocking(request.password).await?;
    let user = state.repo.create_user(username, &hash).await?;
    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "User registered successfully",
            user.id,
        )),
    ))
}

/// POST /api/login - Check a username/password pair.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CredentialsRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let username = request.username.trim();

    let verified = match state.repo.get_user_by_username(username).await? {
        Some(user) => verify_password_blocking(request.password, user.password_hash).await?,
        None => false,
    };

    if !verified {
        tracing::warn!(username = %username, "Rejected login");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    tracing::info!(username = %username, "Login succeeded");
    Ok(Json(MessageResponse::new("Login successful")))
}

/// POST /api/change-password - Replace a password after checking the current one.
pub async fn change_password(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    require(&request.new_password, "New password is required")?;

    let username = request.username.trim();
    let Some(user) = state.repo.get_user_by_username(username).await? else {
        return Err(AppError::Unauthorized(
            "Incorrect username or current password".to_string(),
        ));
    };

    let verified =
        verify_password_blocking(request.current_password, user.password_hash.clone()).await?;
    if !verified {
        tracing::warn!(username = %username, "Rejected password change");
        return Err(AppError::Unauthorized(
            "Incorrect username or current password".to_string(),
        ));
    }

    let new_hash = hash_password_blocking(request.new_password).await?;
    let replaced = state
        .repo
        .replace_password_hash(user.id, &user.password_hash, &new_hash)
        .await?;
    if !replaced {
        return Err(AppError::Conflict(
            "Password was changed by another request; try again".to_string(),
        ));
    }

    tracing::info!(user_id = user.id, "Password changed");
    Ok(Json(MessageResponse::new("Password changed successfully")))
}
