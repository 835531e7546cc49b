use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::auth::AuthUser;
use super::db::DbHandle;
use crate::models::{
    ColumnId, CreatedProject, DeleteAck, FieldError, NewTask, Priority, ProjectEnvelope, ProjectId,
    ProjectList, ProjectSummary, TaskAck, TaskId, TaskPatch, nullable,
};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────
//
// Fields are parsed leniently and checked by `validate` so that every
// problem is reported as a field-level error instead of a decode failure.

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub column_id: Option<String>,
    pub priority: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
    pub priority: Option<String>,
    pub column_id: Option<String>,
}

const INVALID_PROJECT: &str = "Invalid project data";
const INVALID_TASK: &str = "Invalid task data";

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_field<T: FromStr<Err = String>>(
    field: &str,
    value: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    match value.map(T::from_str) {
        Some(Ok(parsed)) => Some(parsed),
        Some(Err(message)) => {
            errors.push(FieldError::new(field, message));
            None
        }
        None => None,
    }
}

fn check(message: &'static str, errors: Vec<FieldError>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation { message, errors })
    }
}

impl CreateProjectRequest {
    fn validate(self) -> Result<(String, Option<String>), ApiError> {
        let Some(name) = non_blank(self.name) else {
            return Err(ApiError::Validation {
                message: INVALID_PROJECT,
                errors: vec![FieldError::new("name", "Project name is required")],
            });
        };
        Ok((name.trim().to_string(), non_blank(self.description)))
    }
}

impl CreateTaskRequest {
    fn validate(self) -> Result<NewTask, ApiError> {
        let mut errors = Vec::new();
        let title = non_blank(self.title);
        if title.is_none() {
            errors.push(FieldError::new("title", "Task title is required"));
        }
        let column_id = match self.column_id.as_deref() {
            None => {
                errors.push(FieldError::new("columnId", "Column is required"));
                None
            }
            value => parse_field::<ColumnId>("columnId", value, &mut errors),
        };
        let priority = parse_field::<Priority>("priority", self.priority.as_deref(), &mut errors);

        match (title, column_id) {
            (Some(title), Some(column_id)) if errors.is_empty() => Ok(NewTask {
                title,
                description: non_blank(self.description),
                column_id,
                priority: priority.unwrap_or_default(),
            }),
            _ => Err(ApiError::Validation {
                message: INVALID_TASK,
                errors,
            }),
        }
    }
}

impl UpdateTaskRequest {
    fn validate(self) -> Result<TaskPatch, ApiError> {
        let mut errors = Vec::new();
        if matches!(&self.title, Some(title) if title.trim().is_empty()) {
            errors.push(FieldError::new("title", "Task title is required"));
        }
        let column_id = parse_field::<ColumnId>("columnId", self.column_id.as_deref(), &mut errors);
        let priority = parse_field::<Priority>("priority", self.priority.as_deref(), &mut errors);
        check(INVALID_TASK, errors)?;

        Ok(TaskPatch {
            title: self.title,
            description: self.description,
            completed: self.completed,
            priority,
            column_id,
        })
    }
}

/// Turn an undecodable JSON body into the same 400 shape as a field error.
fn body_error(message: &'static str, rejection: JsonRejection) -> ApiError {
    ApiError::Validation {
        message,
        errors: vec![FieldError::new("body", rejection.body_text())],
    }
}

const PROJECT_NOT_FOUND: &str = "Project not found";
const TASK_NOT_FOUND: &str = "Task not found";

/// An id segment that does not parse names nothing, so it is a 404 like any
/// other unknown id.
fn parse_id(raw: &str, not_found: &'static str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound(not_found))
}

fn project_path(path: Result<Path<String>, PathRejection>) -> Result<ProjectId, ApiError> {
    let Path(raw) = path.map_err(|_| ApiError::NotFound(PROJECT_NOT_FOUND))?;
    parse_id(&raw, PROJECT_NOT_FOUND)
}

/// The project id and the raw task segment. The task id is parsed only after
/// project ownership is checked, so a foreign project never reports on its tasks.
fn task_path(
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<(ProjectId, String), ApiError> {
    let Path((project, task)) = path.map_err(|_| ApiError::NotFound(PROJECT_NOT_FOUND))?;
    Ok((parse_id(&project, PROJECT_NOT_FOUND)?, task))
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    /// Absent and not-owned resources are reported identically.
    NotFound(&'static str),
    Validation {
        message: &'static str,
        errors: Vec<FieldError>,
    },
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"message": "Unauthorized"})),
            )
                .into_response(),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"message": message})),
            )
                .into_response(),
            ApiError::Validation { message, errors } => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"message": message, "errors": errors})),
            )
                .into_response(),
            ApiError::Internal(err) => {
                error!(error = ?err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"message": "Something went wrong"})),
                )
                    .into_response()
            }
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).delete(delete_project),
        )
        .route("/api/projects/{id}/tasks", post(create_task))
        .route(
            "/api/projects/{id}/tasks/{task_id}",
            patch(update_task).delete(delete_task),
        )
        .route("/api/dashboard/stats", get(dashboard_stats))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// The project if `user` owns it, else 404.
async fn owned_project(
    state: &SharedState,
    user: &AuthUser,
    project_id: ProjectId,
) -> Result<ProjectSummary, ApiError> {
    let user_id = user.user_id.clone();
    state
        .db
        .call(move |db| db.get_project(&user_id, project_id))
        .await?
        .ok_or(ApiError::NotFound(PROJECT_NOT_FOUND))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_projects(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let projects = state
        .db
        .call(move |db| db.list_projects(&user.user_id))
        .await?;
    Ok(Json(ProjectList { projects }))
}

async fn create_project(
    State(state): State<SharedState>,
    user: AuthUser,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| body_error(INVALID_PROJECT, e))?;
    let (name, description) = req.validate()?;
    let project = state
        .db
        .call(move |db| db.create_project(&user.user_id, &name, description.as_deref()))
        .await?;
    info!(project_id = project.id, "project created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedProject {
            message: "Project created successfully".into(),
            project,
        }),
    ))
}

async fn get_project(
    State(state): State<SharedState>,
    user: AuthUser,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = project_path(path)?;
    let board = state
        .db
        .call(move |db| db.get_board(&user.user_id, project_id))
        .await?
        .ok_or(ApiError::NotFound(PROJECT_NOT_FOUND))?;
    Ok(Json(ProjectEnvelope { project: board }))
}

async fn delete_project(
    State(state): State<SharedState>,
    user: AuthUser,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = project_path(path)?;
    let deleted = state
        .db
        .call(move |db| db.delete_project(&user.user_id, project_id))
        .await?;
    if !deleted {
        return Err(ApiError::NotFound(PROJECT_NOT_FOUND));
    }
    info!(project_id, "project deleted");
    Ok(Json(serde_json::json!({"success": true})))
}

async fn create_task(
    State(state): State<SharedState>,
    user: AuthUser,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = project_path(path)?;
    owned_project(&state, &user, project_id).await?;
    let Json(req) = body.map_err(|e| body_error(INVALID_TASK, e))?;
    let new_task = req.validate()?;

    let (task, version) = state
        .db
        .call(move |db| db.create_task(project_id, &new_task))
        .await?;
    debug!(project_id, task_id = task.id, version, "task created");
    Ok((
        StatusCode::CREATED,
        Json(TaskAck {
            message: "Task created successfully".into(),
            task,
            version,
        }),
    ))
}

async fn update_task(
    State(state): State<SharedState>,
    user: AuthUser,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (project_id, raw_task) = task_path(path)?;
    owned_project(&state, &user, project_id).await?;
    let task_id: TaskId = parse_id(&raw_task, TASK_NOT_FOUND)?;
    let exists = state
        .db
        .call(move |db| db.get_task(project_id, task_id))
        .await?
        .is_some();
    if !exists {
        return Err(ApiError::NotFound(TASK_NOT_FOUND));
    }
    let Json(req) = body.map_err(|e| body_error(INVALID_TASK, e))?;
    let patch = req.validate()?;

    let (task, version) = state
        .db
        .call(move |db| db.update_task(project_id, task_id, &patch))
        .await?
        .ok_or(ApiError::NotFound(TASK_NOT_FOUND))?;
    debug!(project_id, task_id, version, column = %task.column_id, "task updated");
    Ok(Json(TaskAck {
        message: "Task updated successfully".into(),
        task,
        version,
    }))
}

async fn delete_task(
    State(state): State<SharedState>,
    user: AuthUser,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (project_id, raw_task) = task_path(path)?;
    owned_project(&state, &user, project_id).await?;
    let task_id: TaskId = parse_id(&raw_task, TASK_NOT_FOUND)?;
    let version = state
        .db
        .call(move |db| db.delete_task(project_id, task_id))
        .await?
        .ok_or(ApiError::NotFound(TASK_NOT_FOUND))?;
    debug!(project_id, task_id, version, "task deleted");
    Ok(Json(DeleteAck {
        message: "Task deleted successfully".into(),
        version,
    }))
}

async fn dashboard_stats(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .db
        .call(move |db| db.dashboard_stats(&user.user_id))
        .await?;
    Ok(Json(stats))
}
