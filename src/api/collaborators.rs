//! Collaborator API endpoints.

use axum::{extract::State, http::StatusCode, Json};

use super::{require, ApiJson, ApiPath, ApiResult, MessageResponse};
use crate::models::{
    AssignCollaboratorRequest, Collaborator, CollaboratorWithProject, CreateCollaboratorRequest,
};
use crate::AppState;

/// POST /api/projects/:id/collaborators - Add a collaborator to a project.
pub async fn add_collaborator(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<i64>,
    ApiJson(request): ApiJson<CreateCollaboratorRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    require(&request.name, "Name and role are required")?;
    require(&request.role, "Name and role are required")?;

    let collaborator = state.repo.add_collaborator(project_id, &request).await?;
    tracing::info!(
        collaborator_id = collaborator.id,
        project_id,
        "Collaborator added"
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "Collaborator added successfully",
            collaborator.id,
        )),
    ))
}

/// GET /api/projects/:id/collaborators - List a project's collaborators.
pub async fn list_collaborators(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Collaborator>>> {
    let collaborators = state.repo.list_collaborators(project_id).await?;
    Ok(Json(collaborators))
}

/// GET /api/collaborators - List all collaborators with their project names.
pub async fn list_all_collaborators(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CollaboratorWithProject>>> {
    let collaborators = state.repo.list_all_collaborators().await?;
    Ok(Json(collaborators))
}

/// POST /api/collaborators - Add a collaborator to the project with a given name.
pub async fn assign_collaborator(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AssignCollaboratorRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    require(&request.name, "Name and role are required")?;
    require(&request.role, "Name and role are required")?;
    require(&request.project_name, "Project name is required")?;

    let collaborator = state.repo.add_collaborator_by_project_name(&request).await?;
    tracing::info!(
        collaborator_id = collaborator.id,
        project_id = collaborator.project_id,
        "Collaborator added by project name"
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id(
            "Collaborator added successfully",
            collaborator.id,
        )),
    ))
}

/// DELETE /api/collaborators/:id - Delete a collaborator.
pub async fn delete_collaborator(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.repo.delete_collaborator(id).await?;
    tracing::info!(collaborator_id = id, "Collaborator deleted");

    Ok(Json(MessageResponse::with_id(
        "Collaborator deleted successfully",
        id,
    )))
}
