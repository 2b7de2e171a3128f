//! Collaborator model.

use serde::{Deserialize, Serialize};

/// A person working on a project, with a free-text role label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Collaborator joined with the current name of its project.
#[derive(Debug, Clone, Serialize)]
pub struct CollaboratorWithProject {
    #[serde(flatten)]
    pub collaborator: Collaborator,
    pub project_name: String,
}

/// Request body for adding a collaborator under a project id.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCollaboratorRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

/// Request body for adding a collaborator to the project with the given name.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignCollaboratorRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub project_name: String,
}

impl AssignCollaboratorRequest {
    pub fn collaborator(&self) -> CreateCollaboratorRequest {
        CreateCollaboratorRequest {
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}
