//! Project API endpoints.

use axum::{extract::State, http::StatusCode, Json};

use super::{require, ApiJson, ApiPath, ApiResult, MessageResponse};
use crate::errors::AppError;
use crate::models::{is_valid_deadline, CreateProjectRequest, Project, UpdateProjectRequest};
use crate::AppState;

/// GET /api/projects - List all projects.
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    let projects = state.repo.list_projects().await?;
    Ok(Json(projects))
}

/// GET /api/projects/:id - Get a single project.
pub async fn get_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Project>> {
    match state.repo.get_project(id).await? {
        Some(project) => Ok(Json(project)),
        None => Err(AppError::NotFound(format!("Project {} not found", id))),
    }
}

/// POST /api/projects - Create a new project.
pub async fn create_project(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    require(&request.name, "Project name is required")?;
    check_deadline(&request.deadline)?;

    let project = state.repo.create_project(&request).await?;
    tracing::info!(project_id = project.id, name = %project.name, "Project created");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "Project created successfully",
            project.id,
        )),
    ))
}

/// PUT /api/projects/:id - Update a project.
pub async fn update_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if let Some(name) = &request.name {
        require(name, "Project name cannot be empty")?;
    }
    if let Some(deadline) = &request.deadline {
        check_deadline(deadline)?;
    }

    let project = state.repo.update_project(id, &request).await?;
    tracing::info!(project_id = project.id, "Project updated");

    Ok(Json(MessageResponse::with_id(
        "Project updated successfully",
        project.id,
    )))
}

/// DELETE /api/projects/:id - Delete a project and its collaborators.
pub async fn delete_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.repo.delete_project(id).await?;
    tracing::info!(project_id = id, "Project deleted");

    Ok(Json(MessageResponse::with_id(
        "Project deleted successfully",
        id,
    )))
}

fn check_deadline(deadline: &str) -> Result<(), AppError> {
    if !is_valid_deadline(deadline) {
        return Err(AppError::Validation(format!(
            "Deadline {:?} must be a date in YYYY-MM-DD format",
            deadline
        )));
    }
    Ok(())
}
