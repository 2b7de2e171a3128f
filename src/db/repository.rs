//! Database repository for CRUD operations.
//!
//! Uses bound parameters throughout and transactions where a write depends on a read.

use chrono::Utc;
use sqlx::any::AnyRow;
use sqlx::AnyPool;
use sqlx::Row;

use crate::errors::AppError;
use crate::models::{
    AssignCollaboratorRequest, Collaborator, CollaboratorWithProject, CreateCollaboratorRequest,
    CreateProjectRequest, Priority, Project, UpdateProjectRequest, User,
};

const PROJECT_COLUMNS: &str =
    "id, name, field, stage, abstract_text, priority, deadline, created_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: AnyPool,
}

impl Repository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    // ==================== PROJECT OPERATIONS ====================

    /// List all projects in creation order.
    pub async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM projects ORDER BY id",
            PROJECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let projects = rows
            .iter()
            .map(project_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// Get a project by ID.
    pub async fn get_project(&self, id: i64) -> Result<Option<Project>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(project_from_row).transpose()?)
    }

    /// Create a new project.
    pub async fn create_project(&self, request: &CreateProjectRequest) -> Result<Project, AppError> {
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(
            r#"INSERT INTO projects (name, field, stage, abstract_text, priority, deadline, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id"#,
        )
        .bind(request.name.trim())
        .bind(&request.field)
        .bind(&request.stage)
        .bind(&request.abstract_text)
        .bind(request.priority.as_str())
        .bind(&request.deadline)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?;

        Ok(Project {
            id: row.try_get("id")?,
            name: request.name.trim().to_string(),
            field: request.field.clone(),
            stage: request.stage.clone(),
            abstract_text: request.abstract_text.clone(),
            priority: request.priority,
            deadline: request.deadline.clone(),
            created_at: now,
        })
    }

    /// Update a project. Fields absent from the request keep their stored value.
    pub async fn update_project(
        &self,
        id: i64,
        request: &UpdateProjectRequest,
    ) -> Result<Project, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let existing = row
            .as_ref()
            .map(project_from_row)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;

        let updated = Project {
            id,
            name: request
                .name
                .as_deref()
                .map(str::trim)
                .map(str::to_string)
                .unwrap_or(existing.name),
            field: request.field.clone().unwrap_or(existing.field),
            stage: request.stage.clone().unwrap_or(existing.stage),
            abstract_text: request
                .abstract_text
                .clone()
                .unwrap_or(existing.abstract_text),
            priority: request.priority.unwrap_or(existing.priority),
            deadline: request.deadline.clone().unwrap_or(existing.deadline),
            created_at: existing.created_at,
        };

        sqlx::query(
            r#"UPDATE projects
               SET name = $1, field = $2, stage = $3, abstract_text = $4, priority = $5, deadline = $6
               WHERE id = $7"#,
        )
        .bind(&updated.name)
        .bind(&updated.field)
        .bind(&updated.stage)
        .bind(&updated.abstract_text)
        .bind(updated.priority.as_str())
        .bind(&updated.deadline)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Delete a project together with its collaborators.
    pub async fn delete_project(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Explicit so the cascade does not depend on backend foreign-key settings.
        sqlx::query("DELETE FROM collaborators WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Project {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    // ==================== COLLABORATOR OPERATIONS ====================

    /// Add a collaborator to an existing project.
    pub async fn add_collaborator(
        &self,
        project_id: i64,
        request: &CreateCollaboratorRequest,
    ) -> Result<Collaborator, AppError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query("SELECT id FROM projects WHERE id = $1")
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();

        if !exists {
            return Err(AppError::NotFound(format!(
                "Project {} not found",
                project_id
            )));
        }

        let collaborator = insert_collaborator(&mut tx, project_id, request).await?;
        tx.commit().await?;

        Ok(collaborator)
    }

    /// Add a collaborator to the single project carrying `project_name`.
    pub async fn add_collaborator_by_project_name(
        &self,
        request: &AssignCollaboratorRequest,
    ) -> Result<Collaborator, AppError> {
        let project_name = request.project_name.trim();
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query("SELECT id FROM projects WHERE name = $1 ORDER BY id")
            .bind(project_name)
            .fetch_all(&mut *tx)
            .await?;

        let project_id: i64 = match rows.as_slice() {
            [] => {
                return Err(AppError::NotFound(format!(
                    "Project {:?} not found",
                    project_name
                )))
            }
            [row] => row.try_get("id")?,
            _ => {
                return Err(AppError::Conflict(format!(
                    "{} projects are named {:?}; add the collaborator by project id",
                    rows.len(),
                    project_name
                )))
            }
        };

        let collaborator = insert_collaborator(&mut tx, project_id, &request.collaborator()).await?;
        tx.commit().await?;

        Ok(collaborator)
    }

    /// List the collaborators of one project.
    pub async fn list_collaborators(&self, project_id: i64) -> Result<Vec<Collaborator>, AppError> {
        let rows = sqlx::query(
            "SELECT id, project_id, name, email, role FROM collaborators WHERE project_id = $1 ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        let collaborators = rows
            .iter()
            .map(collaborator_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collaborators)
    }

    /// List every collaborator with its project's current name.
    pub async fn list_all_collaborators(&self) -> Result<Vec<CollaboratorWithProject>, AppError> {
        let rows = sqlx::query(
            r#"SELECT c.id, c.project_id, c.name, c.email, c.role, p.name AS project_name
               FROM collaborators c
               JOIN projects p ON p.id = c.project_id
               ORDER BY c.id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let collaborators = rows
            .iter()
            .map(|row| {
                Ok::<_, sqlx::Error>(CollaboratorWithProject {
                    collaborator: collaborator_from_row(row)?,
                    project_name: row.try_get("project_name")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collaborators)
    }

    /// Delete a collaborator.
    pub async fn delete_collaborator(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM collaborators WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Collaborator {} not found", id)));
        }

        Ok(())
    }

    // ==================== USER OPERATIONS ====================

    /// Look up a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    /// Create a user. Fails with a conflict when the username is taken.
    pub async fn create_user(&self, username: &str, password_hash: &str) -> Result<User, AppError> {
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(
            "INSERT INTO users (username, password_hash, created_at) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("User already exists".to_string())
            } else {
                AppError::from(e)
            }
        })?;

        Ok(User {
            id: row.try_get("id")?,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        })
    }

    /// Replace a password hash, but only if it still equals `expected_hash`.
    ///
    /// Returns `false` when another request changed the password in between.
    pub async fn replace_password_hash(
        &self,
        user_id: i64,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2 AND password_hash = $3")
                .bind(new_hash)
                .bind(user_id)
                .bind(expected_hash)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }
}

async fn insert_collaborator(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    project_id: i64,
    request: &CreateCollaboratorRequest,
) -> Result<Collaborator, AppError> {
    let row = sqlx::query(
        "INSERT INTO collaborators (project_id, name, email, role) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(project_id)
    .bind(request.name.trim())
    .bind(request.email.trim())
    .bind(request.role.trim())
    .fetch_one(&mut **tx)
    .await?;

    Ok(Collaborator {
        id: row.try_get("id")?,
        project_id,
        name: request.name.trim().to_string(),
        email: request.email.trim().to_string(),
        role: request.role.trim().to_string(),
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// Helper functions for row conversion

fn project_from_row(row: &AnyRow) -> Result<Project, sqlx::Error> {
    let priority: String = row.try_get("priority")?;
    let priority = priority
        .parse::<Priority>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "priority".to_string(),
            source: e.into(),
        })?;

    Ok(Project {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        field: row.try_get("field")?,
        stage: row.try_get("stage")?,
        abstract_text: row.try_get("abstract_text")?,
        priority,
        deadline: row.try_get("deadline")?,
        created_at: row.try_get("created_at")?,
    })
}

fn collaborator_from_row(row: &AnyRow) -> Result<Collaborator, sqlx::Error> {
    Ok(Collaborator {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: row.try_get("role")?,
    })
}

fn user_from_row(row: &AnyRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let database = DatabaseConfig::Sqlite {
            path: temp_dir.path().join("repo.sqlite"),
        };
        let pool = init_database(&database, 2).await.expect("Failed to init DB");
        (Repository::new(pool), temp_dir)
    }

    fn project_named(name: &str) -> CreateProjectRequest {
        serde_json::from_value(serde_json::json!({ "name": name })).unwrap()
    }

    fn collaborator(name: &str, role: &str) -> CreateCollaboratorRequest {
        CreateCollaboratorRequest {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role: role.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_project_defaults() {
        let (repo, _dir) = repo().await;

        let created = repo.create_project(&project_named("  Coral Survey ")).await.unwrap();
        let fetched = repo.get_project(created.id).await.unwrap().unwrap();

        assert_eq!(fetched.name, "Coral Survey");
        assert_eq!(fetched.field, "");
        assert_eq!(fetched.stage, "");
        assert_eq!(fetched.abstract_text, "");
        assert_eq!(fetched.priority, Priority::Unset);
        assert_eq!(fetched.deadline, "");
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_partial_update_preserves_other_fields() {
        let (repo, _dir) = repo().await;
        let request: CreateProjectRequest = serde_json::from_value(serde_json::json!({
            "name": "Soil Microbes",
            "field": "Biology",
            "stage": "Planning",
            "priority": "High",
            "deadline": "2026-01-15"
        }))
        .unwrap();
        let created = repo.create_project(&request).await.unwrap();

        let update = UpdateProjectRequest {
            stage: Some("Fieldwork".to_string()),
            ..Default::default()
        };
        let updated = repo.update_project(created.id, &update).await.unwrap();

        assert_eq!(updated.stage, "Fieldwork");
        assert_eq!(updated.name, "Soil Microbes");
        assert_eq!(updated.field, "Biology");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.deadline, "2026-01-15");

        let stored = repo.get_project(created.id).await.unwrap().unwrap();
        assert_eq!(stored.stage, "Fieldwork");
        assert_eq!(stored.field, "Biology");
    }

    #[tokio::test]
    async fn test_missing_project_is_not_found() {
        let (repo, _dir) = repo().await;

        assert!(repo.get_project(42).await.unwrap().is_none());
        assert!(matches!(
            repo.update_project(42, &UpdateProjectRequest::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete_project(42).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.add_collaborator(42, &collaborator("Ada", "PI")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_collaborators_are_scoped_to_project() {
        let (repo, _dir) = repo().await;
        let a = repo.create_project(&project_named("A")).await.unwrap();
        let b = repo.create_project(&project_named("B")).await.unwrap();

        repo.add_collaborator(a.id, &collaborator("Ada", "PI")).await.unwrap();
        repo.add_collaborator(a.id, &collaborator("Alan", "Analyst")).await.unwrap();
        repo.add_collaborator(b.id, &collaborator("Grace", "Engineer")).await.unwrap();

        let for_a = repo.list_collaborators(a.id).await.unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().all(|c| c.project_id == a.id));

        let for_b = repo.list_collaborators(b.id).await.unwrap();
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].name, "Grace");

        assert!(repo.list_collaborators(999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_project_removes_collaborators() {
        let (repo, _dir) = repo().await;
        let project = repo.create_project(&project_named("Doomed")).await.unwrap();
        let collab = repo
            .add_collaborator(project.id, &collaborator("Ada", "PI"))
            .await
            .unwrap();

        repo.delete_project(project.id).await.unwrap();

        assert!(repo.list_all_collaborators().await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_collaborator(collab.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_project_name_association_follows_renames() {
        let (repo, _dir) = repo().await;
        let project = repo.create_project(&project_named("Old Name")).await.unwrap();

        let request = AssignCollaboratorRequest {
            name: "Ada".to_string(),
            email: String::new(),
            role: "PI".to_string(),
            project_name: "Old Name".to_string(),
        };
        let collab = repo.add_collaborator_by_project_name(&request).await.unwrap();
        assert_eq!(collab.project_id, project.id);

        let rename = UpdateProjectRequest {
            name: Some("New Name".to_string()),
            ..Default::default()
        };
        repo.update_project(project.id, &rename).await.unwrap();

        let all = repo.list_all_collaborators().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].project_name, "New Name");

        // The old name no longer resolves.
        assert!(matches!(
            repo.add_collaborator_by_project_name(&request).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ambiguous_project_name_conflicts() {
        let (repo, _dir) = repo().await;
        repo.create_project(&project_named("Twin")).await.unwrap();
        repo.create_project(&project_named("Twin")).await.unwrap();

        let request = AssignCollaboratorRequest {
            name: "Ada".to_string(),
            email: String::new(),
            role: "PI".to_string(),
            project_name: "Twin".to_string(),
        };
        assert!(matches!(
            repo.add_collaborator_by_project_name(&request).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_stored_priority_is_not_overwritten() {
        let (repo, _dir) = repo().await;
        let project = repo.create_project(&project_named("Legacy")).await.unwrap();

        sqlx::query("UPDATE projects SET priority = $1 WHERE id = $2")
            .bind("Urgent")
            .bind(project.id)
            .execute(repo.pool())
            .await
            .unwrap();

        assert!(matches!(
            repo.get_project(project.id).await,
            Err(AppError::Database(_))
        ));

        let request = UpdateProjectRequest {
            stage: Some("Review".to_string()),
            ..Default::default()
        };
        assert!(repo.update_project(project.id, &request).await.is_err());

        let stored: String = sqlx::query("SELECT priority FROM projects WHERE id = $1")
            .bind(project.id)
            .fetch_one(repo.pool())
            .await
            .unwrap()
            .try_get("priority")
            .unwrap();
        assert_eq!(stored, "Urgent");
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (repo, _dir) = repo().await;
        let user = repo.create_user("ada", "$argon2id$fake").await.unwrap();
        assert_eq!(user.username, "ada");

        assert!(matches!(
            repo.create_user("ada", "$argon2id$other").await,
            Err(AppError::Conflict(_))
        ));

        let stored = repo.get_user_by_username("ada").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "$argon2id$fake");
    }

    #[tokio::test]
    async fn test_replace_password_hash_is_compare_and_swap() {
        let (repo, _dir) = repo().await;
        let user = repo.create_user("ada", "hash-1").await.unwrap();

        assert!(repo
            .replace_password_hash(user.id, "hash-1", "hash-2")
            .await
            .unwrap());
        assert!(!repo
            .replace_password_hash(user.id, "hash-1", "hash-3")
            .await
            .unwrap());

        let stored = repo.get_user_by_username("ada").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "hash-2");
    }
}
